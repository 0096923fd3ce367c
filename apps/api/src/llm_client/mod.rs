/// LLM Client: the single point of entry for remote model calls.
///
/// Only the interview scorer talks to the model, and only through the
/// [`CompletionModel`] trait, so every caller keeps a deterministic offline path.
///
/// Availability rules:
/// - 429 fails fast (no retry); the caller falls back offline.
/// - 503 trips a 10 minute cooldown during which calls fail without touching the network.
/// - Other 5xx and transport errors retry with exponential backoff.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all remote calls. Hardcoded to prevent drift.
pub const MODEL: &str = "claude-sonnet-4-5";
/// Scores and summaries are short.
const MAX_TOKENS: u32 = 256;
const TEMPERATURE: f32 = 0.2;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(12);
const MAX_RETRIES: u32 = 2;
/// How long the model is skipped after it reports 503.
pub const UNAVAILABLE_COOLDOWN: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited")]
    RateLimited,

    #[error("Model unavailable, cooling down")]
    CoolingDown,

    #[error("LLM returned empty content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Concatenates every text block.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text.as_deref())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// A text-in, text-out model. Implemented by [`LlmClient`] and by test fakes.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Returns the trimmed, non-empty reply.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Cooldown
// ────────────────────────────────────────────────────────────────────────────

/// Process-wide "skip the model until" marker, shared by every clone.
#[derive(Clone, Default)]
pub struct Cooldown {
    until: Arc<RwLock<Option<Instant>>>,
}

impl Cooldown {
    pub async fn trip(&self, duration: Duration) {
        *self.until.write().await = Some(Instant::now() + duration);
    }

    pub async fn is_active(&self) -> bool {
        matches!(*self.until.read().await, Some(until) if Instant::now() < until)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Anthropic client
// ────────────────────────────────────────────────────────────────────────────

/// Wraps the Anthropic Messages API with retry logic and the cooldown guard.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    cooldown: Cooldown,
}

impl LlmClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
            cooldown: Cooldown::default(),
        })
    }

    /// Makes a raw call to the API, returning the full response object.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmResponse, LlmError> {
        if self.cooldown.is_active().await {
            return Err(LlmError::CoolingDown);
        }

        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, ...
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 {
                warn!("LLM API rate limited (429), falling back offline");
                return Err(LlmError::RateLimited);
            }

            if status.as_u16() == 503 {
                self.cooldown.trip(UNAVAILABLE_COOLDOWN).await;
                warn!(
                    "LLM API unavailable (503), skipping remote calls for {}s",
                    UNAVAILABLE_COOLDOWN.as_secs()
                );
                return Err(LlmError::CoolingDown);
            }

            if status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let llm_response: LlmResponse = response.json().await?;

            debug!(
                "LLM call succeeded: input_tokens={}, output_tokens={}",
                llm_response.usage.input_tokens, llm_response.usage.output_tokens
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::EmptyContent))
    }
}

#[async_trait]
impl CompletionModel for LlmClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let text = self.call(prompt, system).await?.text();
        let text = text.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(text.to_string())
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_response_text_joins_text_blocks() {
        let response: LlmResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"Good "},{"type":"tool_use"},{"type":"text","text":"answer"}],
                "usage":{"input_tokens":10,"output_tokens":2}}"#,
        )
        .unwrap();
        assert_eq!(response.text(), "Good answer");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_expires() {
        let cooldown = Cooldown::default();
        assert!(!cooldown.is_active().await);

        cooldown.trip(UNAVAILABLE_COOLDOWN).await;
        let shared = cooldown.clone();
        assert!(shared.is_active().await);

        tokio::time::advance(UNAVAILABLE_COOLDOWN - Duration::from_secs(1)).await;
        assert!(cooldown.is_active().await);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!shared.is_active().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_skips_network_while_cooling_down() {
        let client = LlmClient::new("test-key".to_string()).unwrap();
        client.cooldown.trip(UNAVAILABLE_COOLDOWN).await;

        let err = client.complete("system", "prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::CoolingDown));
    }
}
