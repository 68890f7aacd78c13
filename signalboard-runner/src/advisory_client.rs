//! OpenAI-compatible chat completion client for the advisory pass.
//!
//! Blocking, single attempt, no retries. Every failure maps to an
//! [`AdvisoryError`] which the recommendation engine turns into a
//! technical-only verdict.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use signalboard_core::recommendation::{AdvisoryError, AdvisoryRequest, AdvisoryService};

use crate::config::AdvisoryConfig;

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiAdvisor {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl OpenAiAdvisor {
    /// Build a client from config, reading the key from `config.api_key_env`.
    pub fn from_config(config: &AdvisoryConfig) -> Result<Self, AdvisoryError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AdvisoryError::MissingCredential(config.api_key_env.clone()))?;
        Self::with_key(config, api_key)
    }

    pub fn with_key(config: &AdvisoryConfig, api_key: impl Into<String>) -> Result<Self, AdvisoryError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AdvisoryError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: chat_endpoint(&config.base_url),
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

fn chat_endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

impl AdvisoryService for OpenAiAdvisor {
    fn advise(&self, request: &AdvisoryRequest) -> Result<String, AdvisoryError> {
        let prompt = request.prompt();
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: AdvisoryRequest::system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(symbol = %request.symbol, endpoint = %self.endpoint, model = %self.model, "advisory request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| AdvisoryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(status_error(status.as_u16(), message));
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| AdvisoryError::Malformed(format!("unreadable completion: {e}")))?;
        extract_content(parsed)
    }
}

fn status_error(status: u16, message: String) -> AdvisoryError {
    match status {
        401 | 403 => AdvisoryError::InvalidCredential,
        429 => AdvisoryError::RateLimited,
        _ => AdvisoryError::Api {
            status,
            message: truncate(&message, 200),
        },
    }
}

fn extract_content(response: ChatResponse) -> Result<String, AdvisoryError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| AdvisoryError::Malformed("completion has no content".into()))
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
