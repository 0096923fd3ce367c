// Resume extraction core.
// Pipeline: DocumentKind::detect → DocumentDecoder::decode (pdf | docx | raster,
// optionally via preprocess + ocr) → normalize → fields::extract_fields.
// CPU-bound parsing runs inside tokio::task::spawn_blocking.

pub mod docx;
pub mod fields;
pub mod normalize;
pub mod ocr;
pub mod pdf;
pub mod preprocess;
pub mod progress;
pub mod raster;

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

pub use fields::{extract_fields, CandidateProfileFields};
pub use normalize::normalize;
pub use ocr::{OcrEngine, TextRecognizer};
pub use pdf::{PageRenderer, Pdftoppm};
pub use progress::{OcrProgress, ProgressTracker};

/// Errors raised inside the extraction core.
///
/// Only `UnsupportedFormat` ever reaches a caller; every other variant is
/// logged and turned into empty text by [`DocumentDecoder::decode`].
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Recognition failed: {0}")]
    Recognition(String),

    #[error("PDF parse error: {0}")]
    Pdf(String),

    #[error("PDF render error: {0}")]
    Render(String),

    #[error("DOCX error: {0}")]
    Docx(String),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for ExtractionError {
    fn from(e: tokio::task::JoinError) -> Self {
        ExtractionError::Task(e.to_string())
    }
}

/// Accepted upload extensions, as offered to the file picker.
pub const ACCEPTED_EXTENSIONS: &[&str] = &[".pdf", ".docx", ".jpg", ".jpeg", ".png"];

const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg"];

/// Which decoder handles a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Docx,
    Image,
}

impl DocumentKind {
    /// Picks a decoder from the file name suffix and declared MIME type.
    ///
    /// Precedence: PDF (suffix or `application/pdf`), then `.docx`, then
    /// `.png`/`.jpg`/`.jpeg`. Suffixes are matched case-insensitively.
    pub fn detect(
        filename: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<Self, ExtractionError> {
        let name = filename.unwrap_or_default().trim().to_lowercase();
        let mime = content_type
            .and_then(|m| m.split(';').next())
            .map(|m| m.trim().to_ascii_lowercase());

        if mime.as_deref() == Some("application/pdf") || name.ends_with(".pdf") {
            Ok(DocumentKind::Pdf)
        } else if name.ends_with(".docx") {
            Ok(DocumentKind::Docx)
        } else if IMAGE_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
            Ok(DocumentKind::Image)
        } else {
            let described = filename
                .filter(|f| !f.trim().is_empty())
                .or(content_type)
                .unwrap_or("unnamed file");
            Err(ExtractionError::UnsupportedFormat(format!(
                "{described} (expected one of {})",
                ACCEPTED_EXTENSIONS.join(" ")
            )))
        }
    }
}

/// An uploaded document, alive for one extraction call.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub kind: DocumentKind,
    pub bytes: Bytes,
}

impl RawDocument {
    pub fn new(kind: DocumentKind, bytes: impl Into<Bytes>) -> Self {
        Self {
            kind,
            bytes: bytes.into(),
        }
    }
}

/// Routes documents to the right decoder. Cheap to clone; every clone shares
/// the same recognizer (and therefore the same OCR engine).
#[derive(Clone)]
pub struct DocumentDecoder {
    recognizer: Arc<dyn TextRecognizer>,
    renderer: Arc<dyn PageRenderer>,
}

impl DocumentDecoder {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, renderer: Arc<dyn PageRenderer>) -> Self {
        Self {
            recognizer,
            renderer,
        }
    }

    /// Decodes a document to normalized text.
    ///
    /// Never fails: any parse, render or recognition error is logged and
    /// yields an empty string, the same value as a document with no text.
    pub async fn decode(&self, document: &RawDocument, progress: &mut ProgressTracker<'_>) -> String {
        let result = match document.kind {
            DocumentKind::Pdf => {
                pdf::decode_pdf(
                    document.bytes.clone(),
                    self.recognizer.as_ref(),
                    self.renderer.as_ref(),
                    progress,
                )
                .await
            }
            DocumentKind::Docx => docx::decode_docx(document.bytes.clone()).await,
            DocumentKind::Image => {
                raster::decode_image(document.bytes.clone(), self.recognizer.as_ref(), progress)
                    .await
            }
        };

        match result {
            Ok(text) => {
                debug!(
                    "Decoded {:?} ({} bytes) into {} chars",
                    document.kind,
                    document.bytes.len(),
                    text.len()
                );
                text
            }
            Err(e) => {
                warn!("{:?} decode failed: {e}", document.kind);
                String::new()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::Cursor;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use image::{DynamicImage, ImageFormat, RgbaImage};

    use super::ocr::{RecognitionProgress, RECOGNIZING_TEXT};
    use super::*;

    /// Recognizer returning canned text per call, with a half-way progress tick.
    pub struct ScriptedRecognizer {
        pub pages: Vec<String>,
        pub calls: AtomicUsize,
        pub fail: bool,
    }

    impl ScriptedRecognizer {
        pub fn new(pages: &[&str]) -> Self {
            Self {
                pages: pages.iter().map(|p| p.to_string()).collect(),
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(&[])
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextRecognizer for ScriptedRecognizer {
        async fn recognize(
            &self,
            image: &RgbaImage,
            on_progress: &mut (dyn FnMut(RecognitionProgress) + Send),
        ) -> Result<String, ExtractionError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ExtractionError::Recognition("scripted failure".into()));
            }
            // Preprocessed input must already be binarized
            assert!(image.pixels().all(|p| p[0] == p[1] && (p[0] == 0 || p[0] == 255)));
            for progress in [0.0, 0.5, 1.0] {
                on_progress(RecognitionProgress {
                    status: RECOGNIZING_TEXT,
                    progress,
                });
            }
            Ok(self.pages.get(call).cloned().unwrap_or_default())
        }
    }

    /// Renderer producing a small grey page without touching the filesystem.
    pub struct BlankPageRenderer {
        pub rendered: AtomicUsize,
    }

    impl BlankPageRenderer {
        pub fn new() -> Self {
            Self {
                rendered: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PageRenderer for BlankPageRenderer {
        async fn render_page(
            &self,
            _pdf_path: &Path,
            _page: u32,
        ) -> Result<DynamicImage, ExtractionError> {
            self.rendered.fetch_add(1, Ordering::SeqCst);
            Ok(DynamicImage::ImageRgba8(RgbaImage::from_fn(8, 8, |x, _| {
                if x < 4 {
                    image::Rgba([20, 20, 20, 255])
                } else {
                    image::Rgba([230, 230, 230, 255])
                }
            })))
        }
    }

    /// PNG bytes of a dark-on-light test pattern.
    pub fn png_fixture(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            if (x / 4 + y / 4) % 3 == 0 {
                image::Rgba([15, 15, 15, 255])
            } else {
                image::Rgba([240, 238, 235, 255])
            }
        });
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    pub fn decoder(recognizer: Arc<ScriptedRecognizer>) -> DocumentDecoder {
        DocumentDecoder::new(recognizer, Arc::new(BlankPageRenderer::new()))
    }
}
