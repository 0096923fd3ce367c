use std::sync::Arc;

use crate::config::Config;
use crate::extraction::DocumentDecoder;
use crate::interview::AnswerScorer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Owns the single OCR engine; every request shares it.
    pub decoder: DocumentDecoder,
    /// HeuristicScorer without an API key, ModelScorer with one.
    pub scorer: Arc<dyn AnswerScorer>,
}
