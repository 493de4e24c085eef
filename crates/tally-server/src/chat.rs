//! HTTP client for the chat platform's message API.
//!
//! Authenticates with an app id/secret pair, then pages through the message
//! list endpoint for a container and time window. Platform-level failures
//! (non-zero response codes) are surfaced as [`ChatError::Api`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tally_core::message::{MessageKind, Mention, RawMessage};
use thiserror::Error;

// ─── Configuration ───────────────────────────────────────────────────────────

fn default_chat_base() -> String { "https://open.feishu.cn".to_string() }

fn default_page_size() -> u32 { 50 }

fn default_chat_timeout() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
  #[serde(default = "default_chat_base")]
  pub base_url:     String,
  pub app_id:       String,
  pub app_secret:   String,
  /// Default container analysed when a request names none.
  pub container_id: String,
  #[serde(default = "default_page_size")]
  pub page_size:    u32,
  #[serde(default = "default_chat_timeout")]
  pub timeout_secs: u64,
}

// ─── Error ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ChatError {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("chat api error {code}: {message}")]
  Api { code: i64, message: String },
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
  code:                i64,
  #[serde(default)]
  msg:                 String,
  #[serde(default)]
  tenant_access_token: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
  code: i64,
  #[serde(default)]
  msg:  String,
  data: Option<ListData>,
}

#[derive(Debug, Default, Deserialize)]
struct ListData {
  #[serde(default)]
  items:      Vec<WireMessage>,
  #[serde(default)]
  has_more:   bool,
  #[serde(default)]
  page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
  message_id:  String,
  msg_type:    String,
  /// Epoch milliseconds, as a decimal string.
  create_time: Option<String>,
  sender:      Option<WireSender>,
  body:        Option<WireBody>,
  #[serde(default)]
  mentions:    Vec<WireMention>,
}

#[derive(Debug, Deserialize)]
struct WireSender {
  id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireBody {
  /// Nested JSON document, e.g. `{"text":"…"}` or `{"file_name":"…"}`.
  content: String,
}

#[derive(Debug, Deserialize)]
struct WireMention {
  id:   Option<String>,
  name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireContent {
  text:      Option<String>,
  file_name: Option<String>,
}

impl WireMessage {
  fn into_raw(self) -> RawMessage {
    let kind = match self.msg_type.as_str() {
      "text" => MessageKind::Text,
      "file" => MessageKind::File,
      _ => MessageKind::Other,
    };

    let content: WireContent = self
      .body
      .as_ref()
      .and_then(|b| serde_json::from_str(&b.content).ok())
      .unwrap_or_default();

    RawMessage {
      message_id: self.message_id,
      kind,
      created_at: self.create_time.and_then(|t| t.parse().ok()),
      sender_id:  self.sender.and_then(|s| s.id),
      text:       content.text,
      file_name:  content.file_name,
      mentions:   self
        .mentions
        .into_iter()
        .map(|m| Mention { id: m.id, name: m.name })
        .collect(),
    }
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Async client for the chat message API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ChatClient {
  client: reqwest::Client,
  config: ChatConfig,
}

impl ChatClient {
  pub fn new(config: ChatConfig) -> Result<Self, ChatError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, config })
  }

  pub fn default_container(&self) -> &str { &self.config.container_id }

  fn url(&self, path: &str) -> String {
    format!("{}{path}", self.config.base_url.trim_end_matches('/'))
  }

  /// Obtain a short-lived tenant access token.
  async fn tenant_token(&self) -> Result<String, ChatError> {
    let resp: TokenResponse = self
      .client
      .post(self.url("/open-apis/auth/v3/tenant_access_token/internal"))
      .json(&serde_json::json!({
        "app_id":     self.config.app_id,
        "app_secret": self.config.app_secret,
      }))
      .send()
      .await?
      .json()
      .await?;

    if resp.code != 0 {
      return Err(ChatError::Api { code: resp.code, message: resp.msg });
    }
    Ok(resp.tenant_access_token)
  }

  /// Fetch every message in `[start, end)` for `container_id`, following
  /// pagination until the platform reports no more pages.
  pub async fn fetch_messages(
    &self,
    container_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<Vec<RawMessage>, ChatError> {
    let token = self.tenant_token().await?;
    let mut messages = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
      let mut request = self
        .client
        .get(self.url("/open-apis/im/v1/messages"))
        .bearer_auth(&token)
        .query(&[
          ("container_id_type", "chat"),
          ("container_id", container_id),
          ("sort_type", "ByCreateTimeAsc"),
        ])
        .query(&[
          ("start_time", start.timestamp().to_string()),
          ("end_time", end.timestamp().to_string()),
          ("page_size", self.config.page_size.to_string()),
        ]);
      if let Some(token) = page_token.as_deref() {
        request = request.query(&[("page_token", token)]);
      }

      let resp: ListResponse = request.send().await?.json().await?;
      if resp.code != 0 {
        return Err(ChatError::Api { code: resp.code, message: resp.msg });
      }

      let data = resp.data.unwrap_or_default();
      messages.extend(data.items.into_iter().map(WireMessage::into_raw));

      if data.has_more && data.page_token.is_some() {
        page_token = data.page_token;
      } else {
        break;
      }
    }

    tracing::debug!(container_id, count = messages.len(), "fetched messages");
    Ok(messages)
  }
}
