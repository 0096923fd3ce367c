//! PDF decoder.
//!
//! Fast path: the embedded (selectable) text of every page, no OCR and no
//! progress events. When that is empty (a scanned, image-only PDF) each page is
//! rasterized at 2x, binarized and recognized in order. Page `i` of `n` reports
//! progress inside `[100(i-1)/n, 100i/n)`; the single 100 event comes after the
//! last page.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use image::DynamicImage;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};

use crate::extraction::normalize::normalize;
use crate::extraction::ocr::{RecognitionProgress, TextRecognizer, RECOGNIZING_TEXT};
use crate::extraction::preprocess::{binarize, DEFAULT_THRESHOLD_FACTOR};
use crate::extraction::progress::ProgressTracker;
use crate::extraction::ExtractionError;

/// 2x the 72 dpi PDF user space.
pub const RENDER_DPI: u32 = 144;

/// Rasterizes single PDF pages for the OCR fallback.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Renders 1-based `page` of the PDF at `pdf_path`.
    async fn render_page(&self, pdf_path: &Path, page: u32) -> Result<DynamicImage, ExtractionError>;
}

/// Poppler `pdftoppm` renderer.
pub struct Pdftoppm {
    binary: PathBuf,
}

impl Pdftoppm {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl PageRenderer for Pdftoppm {
    async fn render_page(&self, pdf_path: &Path, page: u32) -> Result<DynamicImage, ExtractionError> {
        let dir = TempDir::new()?;
        let prefix = dir.path().join("page");
        let page_arg = page.to_string();
        let dpi = RENDER_DPI.to_string();

        let output = Command::new(&self.binary)
            .args(["-png", "-singlefile", "-r", dpi.as_str()])
            .args(["-f", page_arg.as_str(), "-l", page_arg.as_str()])
            .arg(pdf_path)
            .arg(&prefix)
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => {}
            Ok(out) => {
                return Err(ExtractionError::Render(format!(
                    "pdftoppm failed on page {page}: {}",
                    String::from_utf8_lossy(&out.stderr).trim()
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ExtractionError::Render(format!(
                    "{} not found (install poppler-utils)",
                    self.binary.display()
                )));
            }
            Err(e) => return Err(ExtractionError::Io(e)),
        }

        let png = tokio::fs::read(prefix.with_extension("png")).await?;
        Ok(image::load_from_memory(&png)?)
    }
}

/// Decodes a PDF buffer into normalized text.
pub async fn decode_pdf(
    bytes: Bytes,
    recognizer: &dyn TextRecognizer,
    renderer: &dyn PageRenderer,
    progress: &mut ProgressTracker<'_>,
) -> Result<String, ExtractionError> {
    let parse_input = bytes.clone();
    let pages = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem_by_pages(&parse_input)
            .map_err(|e| ExtractionError::Pdf(e.to_string()))
    })
    .await??;

    let selectable = join_page_runs(&pages);
    if !selectable.trim().is_empty() {
        debug!("PDF has selectable text on {} page(s)", pages.len());
        return Ok(normalize(&selectable));
    }

    if pages.is_empty() {
        return Ok(String::new());
    }
    info!("PDF has no selectable text, running OCR on {} page(s)", pages.len());
    ocr_pages(&bytes, pages.len(), recognizer, renderer, progress).await
}

/// Each page's text runs joined by single spaces; pages separated by `\n`.
fn join_page_runs(pages: &[String]) -> String {
    pages
        .iter()
        .map(|page| page.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

async fn ocr_pages(
    bytes: &[u8],
    page_count: usize,
    recognizer: &dyn TextRecognizer,
    renderer: &dyn PageRenderer,
    progress: &mut ProgressTracker<'_>,
) -> Result<String, ExtractionError> {
    let dir = TempDir::new()?;
    let pdf_path = dir.path().join("document.pdf");
    tokio::fs::write(&pdf_path, bytes).await?;

    let span = 100.0 / page_count as f64;
    let mut page_texts = Vec::with_capacity(page_count);

    for page in 1..=page_count {
        let base = (page - 1) as f64 * span;
        let label = format!("OCR page {page}/{page_count}");

        let rendered = renderer.render_page(&pdf_path, page as u32).await?;
        let prepared = tokio::task::spawn_blocking(move || {
            let mut rgba = rendered.into_rgba8();
            binarize(&mut rgba, DEFAULT_THRESHOLD_FACTOR);
            rgba
        })
        .await?;

        let mut on_progress = |event: RecognitionProgress| {
            if event.status == RECOGNIZING_TEXT {
                progress.report(base + f64::from(event.progress) * span, &label);
            }
        };
        page_texts.push(recognizer.recognize(&prepared, &mut on_progress).await?);

        progress.report(base + span, &format!("{label} done"));
    }

    progress.complete("OCR complete");
    Ok(normalize(&page_texts.join("\n")))
}
