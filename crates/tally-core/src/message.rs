//! Raw chat messages and the resolved conversation entries built from them.

use serde::{Deserialize, Serialize};

/// Source-side message type. Only text and file messages are analysed;
/// everything else (stickers, audio, system events) is filtered out by the
/// transcript builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
  Text,
  File,
  #[serde(other)]
  Other,
}

/// A participant referenced inline in a message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mention {
  pub id:   Option<String>,
  pub name: Option<String>,
}

/// One message as fetched from the chat source, before any normalization.
///
/// `created_at` carries whatever the source sent: epoch seconds or epoch
/// milliseconds, possibly absent. The transcript builder normalizes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
  pub message_id: String,
  pub kind:       MessageKind,
  pub created_at: Option<i64>,
  pub sender_id:  Option<String>,
  #[serde(default)]
  pub text:       Option<String>,
  #[serde(default)]
  pub file_name:  Option<String>,
  #[serde(default)]
  pub mentions:   Vec<Mention>,
}

/// What a [`ConversationEntry`] body represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
  Text,
  FileReference,
}

/// One resolved, ordered event in the conversational context.
///
/// Immutable once built. `timestamp` is epoch seconds; `0` means the source
/// timestamp was missing or unusable, which sorts as earliest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
  pub message_id: String,
  pub timestamp:  i64,
  pub sender:     String,
  pub kind:       EntryKind,
  pub body:       String,
  pub mentions:   Vec<String>,
}
