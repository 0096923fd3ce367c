pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    http::Uri,
    routing::{get, post},
    Router,
};

use crate::errors::AppError;
use crate::interview::handlers as interview;
use crate::resume::handlers as resume;
use crate::state::AppState;

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {uri}"))
}

pub fn build_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/health", get(health::health_handler))
        // Resume API
        .route(
            "/api/v1/resume/extract",
            post(resume::handle_extract).layer(upload_limit),
        )
        .route("/api/v1/resume/fields", post(resume::handle_fields))
        // Interview API
        .route(
            "/api/v1/interview/questions",
            post(interview::handle_questions),
        )
        .route("/api/v1/interview/score", post(interview::handle_score))
        .route("/api/v1/interview/summary", post(interview::handle_summary))
        .fallback(not_found)
        .with_state(state)
}
