//! HTTP client for the OpenAI-compatible chat-completion service.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Configuration ───────────────────────────────────────────────────────────

fn default_model_base() -> String { "https://openrouter.ai/api/v1".to_string() }

fn default_model_name() -> String { "deepseek/deepseek-chat-v3-0324".to_string() }

fn default_temperature() -> f32 { 0.3 }

fn default_model_timeout() -> u64 { 120 }

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
  #[serde(default = "default_model_base")]
  pub base_url:     String,
  pub api_key:      String,
  #[serde(default = "default_model_name")]
  pub model:        String,
  #[serde(default = "default_temperature")]
  pub temperature:  f32,
  /// Optional completion cap forwarded to the service.
  #[serde(default)]
  pub max_tokens:   Option<u32>,
  #[serde(default = "default_model_timeout")]
  pub timeout_secs: u64,
}

// ─── Error ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ModelError {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("model service returned {status}: {body}")]
  Status { status: u16, body: String },

  #[error("model response contained no completion")]
  EmptyResponse,
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
  model:       &'a str,
  messages:    Vec<ChatMessage<'a>>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens:  Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
  role:    &'a str,
  content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
  #[serde(default)]
  choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
  message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
  content: Option<String>,
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Async client for the completion endpoint.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ModelClient {
  client: reqwest::Client,
  config: ModelConfig,
}

impl ModelClient {
  pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, config })
  }

  pub fn model_name(&self) -> &str { &self.config.model }

  /// Run one completion and return the assistant message text.
  pub async fn complete(&self, system: &str, user: &str) -> Result<String, ModelError> {
    let url = format!(
      "{}/chat/completions",
      self.config.base_url.trim_end_matches('/')
    );

    let request = ChatRequest {
      model:       &self.config.model,
      messages:    vec![
        ChatMessage { role: "system", content: system },
        ChatMessage { role: "user", content: user },
      ],
      temperature: self.config.temperature,
      max_tokens:  self.config.max_tokens,
    };

    let resp = self
      .client
      .post(&url)
      .bearer_auth(&self.config.api_key)
      .json(&request)
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(ModelError::Status { status: status.as_u16(), body });
    }

    let parsed: ChatResponse = resp.json().await?;
    parsed
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .filter(|c| !c.trim().is_empty())
      .ok_or(ModelError::EmptyResponse)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn chat_response_tolerates_missing_choices() {
    let parsed: ChatResponse = serde_json::from_str("{}").unwrap();
    assert!(parsed.choices.is_empty());
  }

  #[test]
  fn chat_response_extracts_first_choice() {
    let parsed: ChatResponse = serde_json::from_str(
      r#"{"choices":[{"message":{"role":"assistant","content":"{}"}}]}"#,
    )
    .unwrap();
    assert_eq!(parsed.choices[0].message.content.as_deref(), Some("{}"));
  }
}
