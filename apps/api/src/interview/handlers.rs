//! Axum route handlers for the Interview API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::extraction::CandidateProfileFields;
use crate::interview::{generate_questions, AnsweredQuestion, Question, ScoredAnswer};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct QuestionsRequest {
    #[serde(default)]
    pub resume_text: Option<String>,
    /// Only used for logging.
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
    pub questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub question: Question,
    #[serde(default)]
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    #[serde(default)]
    pub profile: CandidateProfileFields,
    #[serde(default)]
    pub answers: Vec<AnsweredQuestion>,
    pub final_score: u32,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/interview/questions
pub async fn handle_questions(Json(request): Json<QuestionsRequest>) -> Json<QuestionsResponse> {
    let questions = generate_questions(request.resume_text.as_deref());
    info!(
        "Generated {} questions for {}",
        questions.len(),
        request.name.as_deref().unwrap_or("anonymous candidate")
    );
    Json(QuestionsResponse { questions })
}

/// POST /api/v1/interview/score
///
/// Never fails because of the remote model; the heuristic covers every outage.
pub async fn handle_score(
    State(state): State<AppState>,
    Json(request): Json<ScoreRequest>,
) -> Result<Json<ScoredAnswer>, AppError> {
    if request.question.text.trim().is_empty() {
        return Err(AppError::Validation("question.text cannot be empty".to_string()));
    }

    let scored = state.scorer.score(&request.question, &request.answer).await;
    Ok(Json(scored))
}

/// POST /api/v1/interview/summary
pub async fn handle_summary(
    State(state): State<AppState>,
    Json(request): Json<SummaryRequest>,
) -> Json<SummaryResponse> {
    let summary = state
        .scorer
        .summarize(&request.profile, &request.answers, request.final_score)
        .await;
    Json(SummaryResponse { summary })
}
