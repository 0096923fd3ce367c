//! Image decoder: PNG/JPEG resume scans through preprocessing and one OCR pass.

use bytes::Bytes;

use crate::extraction::normalize::normalize;
use crate::extraction::ocr::{RecognitionProgress, TextRecognizer, RECOGNIZING_TEXT};
use crate::extraction::preprocess::{binarize, fit_for_ocr, DEFAULT_THRESHOLD_FACTOR};
use crate::extraction::progress::ProgressTracker;
use crate::extraction::ExtractionError;

pub async fn decode_image(
    bytes: Bytes,
    recognizer: &dyn TextRecognizer,
    progress: &mut ProgressTracker<'_>,
) -> Result<String, ExtractionError> {
    let prepared = tokio::task::spawn_blocking(move || {
        let decoded = image::load_from_memory(&bytes)?;
        let mut rgba = fit_for_ocr(decoded);
        binarize(&mut rgba, DEFAULT_THRESHOLD_FACTOR);
        Ok::<_, ExtractionError>(rgba)
    })
    .await??;

    let mut on_progress = |event: RecognitionProgress| {
        if event.status == RECOGNIZING_TEXT {
            progress.report(f64::from(event.progress) * 100.0, "OCR image");
        }
    };
    let text = recognizer.recognize(&prepared, &mut on_progress).await?;

    progress.complete("OCR complete");
    Ok(normalize(&text))
}
