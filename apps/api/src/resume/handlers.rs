//! Axum route handlers for the Resume API.

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::extraction::{
    extract_fields, normalize, CandidateProfileFields, DocumentKind, OcrProgress, ProgressTracker,
    RawDocument,
};
use crate::state::AppState;

/// Multipart part carrying the document.
const FILE_FIELD: &str = "file";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub kind: DocumentKind,
    pub text: String,
    pub fields: CandidateProfileFields,
    /// Field names the candidate has to fill in by hand.
    pub missing_fields: Vec<&'static str>,
    pub progress: Vec<OcrProgress>,
    pub needs_manual_entry: bool,
}

#[derive(Debug, Deserialize)]
pub struct FieldsRequest {
    pub text: String,
}

struct Upload {
    filename: Option<String>,
    content_type: Option<String>,
    bytes: Bytes,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/resume/extract
///
/// Decodes an uploaded PDF, DOCX or image and pulls out name, email and phone.
/// Unsupported formats are rejected before any decoding. Unreadable documents
/// are not an error: they come back with empty text and `needs_manual_entry`.
pub async fn handle_extract(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ExtractResponse>, AppError> {
    let upload = read_upload(&mut multipart).await?;
    let kind = DocumentKind::detect(upload.filename.as_deref(), upload.content_type.as_deref())
        .map_err(|e| AppError::UnsupportedFormat(e.to_string()))?;
    let document = RawDocument::new(kind, upload.bytes);

    let mut progress = Vec::new();
    let text = {
        let mut tracker = ProgressTracker::new(|event| progress.push(event));
        let text = state.decoder.decode(&document, &mut tracker).await;
        text
    };

    let fields = extract_fields(&text);
    let missing_fields = fields.missing();
    let needs_manual_entry = text.is_empty() || !missing_fields.is_empty();

    info!(
        "Extracted {:?} upload ({} bytes): {} chars, missing {:?}",
        kind,
        document.bytes.len(),
        text.len(),
        missing_fields
    );

    Ok(Json(ExtractResponse {
        kind,
        text,
        fields,
        missing_fields,
        progress,
        needs_manual_entry,
    }))
}

/// POST /api/v1/resume/fields
///
/// Runs the field extractor over text the caller already has.
pub async fn handle_fields(Json(request): Json<FieldsRequest>) -> Json<CandidateProfileFields> {
    Json(extract_fields(&normalize(&request.text)))
}

/// Drains the form and keeps the `file` part.
async fn read_upload(multipart: &mut Multipart) -> Result<Upload, AppError> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await?;
        upload = Some(Upload {
            filename,
            content_type,
            bytes,
        });
    }

    upload.ok_or_else(|| AppError::Validation(format!("multipart part '{FILE_FIELD}' is required")))
}
