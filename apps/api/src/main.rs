mod config;
mod errors;
mod extraction;
mod interview;
mod llm_client;
mod resume;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::extraction::{DocumentDecoder, OcrEngine, Pdftoppm};
use crate::interview::{AnswerScorer, HeuristicScorer, ModelScorer};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Interview API v{}", env!("CARGO_PKG_VERSION"));

    // The OCR engine starts lazily on the first scanned document
    let decoder = DocumentDecoder::new(
        Arc::new(OcrEngine::new(&config.tesseract_bin)),
        Arc::new(Pdftoppm::new(&config.pdftoppm_bin)),
    );
    info!(
        "Document decoder ready (ocr: {}, renderer: {})",
        config.tesseract_bin, config.pdftoppm_bin
    );

    let scorer: Arc<dyn AnswerScorer> = match &config.anthropic_api_key {
        Some(key) => {
            let llm = LlmClient::new(key.clone())?;
            info!("Remote scoring enabled (model: {})", llm_client::MODEL);
            Arc::new(ModelScorer::new(Arc::new(llm)))
        }
        None => {
            info!("ANTHROPIC_API_KEY not set, scoring offline");
            Arc::new(HeuristicScorer)
        }
    };

    let state = AppState {
        config: config.clone(),
        decoder,
        scorer,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
