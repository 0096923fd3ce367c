//! Recognition Engine Adapter.
//!
//! One [`OcrEngine`] is created at startup and shared by every decoder through
//! `Arc<dyn TextRecognizer>`. The engine itself (the Tesseract binary, checked
//! for the `eng` language pack) is initialized lazily on the first recognition
//! and memoized; concurrent first callers all await the same initialization.
//! Recognitions are serialized: only one runs at a time.
//!
//! There is no cancellation. A caller that stops waiting simply drops the
//! future; a recognition already handed to the engine runs to completion.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use image::{ImageFormat, RgbaImage};
use tempfile::TempDir;
use tokio::process::Command;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use crate::extraction::ExtractionError;

/// Language model loaded into the engine.
pub const OCR_LANGUAGE: &str = "eng";
/// Tesseract page segmentation mode 6: a single uniform block of text.
pub const PAGE_SEGMENTATION_MODE: &str = "6";
/// Status attached to progress events while text recognition runs.
pub const RECOGNIZING_TEXT: &str = "recognizing text";

/// Native engine progress signal, `progress` in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionProgress {
    pub status: &'static str,
    pub progress: f32,
}

/// Seam between the decoders and the OCR engine.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognizes the text in a (preprocessed) image.
    async fn recognize(
        &self,
        image: &RgbaImage,
        on_progress: &mut (dyn FnMut(RecognitionProgress) + Send),
    ) -> Result<String, ExtractionError>;
}

/// A ready engine: binary located and language pack verified.
#[derive(Debug)]
struct EngineHandle {
    binary: PathBuf,
}

/// Tesseract-backed recognizer.
pub struct OcrEngine {
    binary: PathBuf,
    handle: OnceCell<EngineHandle>,
    queue: Mutex<()>,
}

impl OcrEngine {
    /// Creates an adapter. Nothing is started until the first recognition.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            handle: OnceCell::new(),
            queue: Mutex::new(()),
        }
    }

    #[cfg(test)]
    pub fn is_initialized(&self) -> bool {
        self.handle.initialized()
    }

    /// Returns the engine, initializing it on first use. A failed
    /// initialization is not cached, so the next caller retries.
    async fn engine(&self) -> Result<&EngineHandle, ExtractionError> {
        self.handle
            .get_or_try_init(|| initialize(&self.binary))
            .await
    }
}

async fn initialize(binary: &Path) -> Result<EngineHandle, ExtractionError> {
    let output = run(Command::new(binary).arg("--list-langs"), binary).await?;

    // Tesseract 3 lists languages on stderr, later versions on stdout
    let listing = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    if !has_language(&listing, OCR_LANGUAGE) {
        return Err(ExtractionError::EngineUnavailable(format!(
            "language pack '{OCR_LANGUAGE}' not installed for {}",
            binary.display()
        )));
    }

    info!(
        "OCR engine initialized: {} (lang={}, psm={})",
        binary.display(),
        OCR_LANGUAGE,
        PAGE_SEGMENTATION_MODE
    );
    Ok(EngineHandle {
        binary: binary.to_path_buf(),
    })
}

fn has_language(listing: &str, language: &str) -> bool {
    listing.lines().any(|line| line.trim() == language)
}

/// Runs a command to completion, mapping a missing binary and non-zero exit status.
async fn run(command: &mut Command, binary: &Path) -> Result<Output, ExtractionError> {
    let output = command.output().await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ExtractionError::EngineUnavailable(format!("{} not found", binary.display()))
        } else {
            ExtractionError::Io(e)
        }
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExtractionError::Recognition(format!(
            "{} exited with {}: {}",
            binary.display(),
            output.status,
            stderr.trim()
        )));
    }
    Ok(output)
}

/// PNG-encodes an image off the async runtime.
async fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ExtractionError> {
    let image = image.clone();
    tokio::task::spawn_blocking(move || {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png)?;
        Ok::<_, ExtractionError>(buf.into_inner())
    })
    .await
    .map_err(|e| ExtractionError::Task(e.to_string()))?
}

#[async_trait]
impl TextRecognizer for OcrEngine {
    async fn recognize(
        &self,
        image: &RgbaImage,
        on_progress: &mut (dyn FnMut(RecognitionProgress) + Send),
    ) -> Result<String, ExtractionError> {
        let engine = self.engine().await?;
        let png = encode_png(image).await?;

        let _turn = self.queue.lock().await;
        on_progress(RecognitionProgress {
            status: RECOGNIZING_TEXT,
            progress: 0.0,
        });

        let dir = TempDir::new()?;
        let input = dir.path().join("input.png");
        tokio::fs::write(&input, &png).await?;

        debug!(
            "Recognizing {}x{} image with {}",
            image.width(),
            image.height(),
            engine.binary.display()
        );
        let output = run(
            Command::new(&engine.binary)
                .arg(&input)
                .arg("stdout")
                .args(["-l", OCR_LANGUAGE, "--psm", PAGE_SEGMENTATION_MODE]),
            &engine.binary,
        )
        .await?;

        on_progress(RecognitionProgress {
            status: RECOGNIZING_TEXT,
            progress: 1.0,
        });
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
