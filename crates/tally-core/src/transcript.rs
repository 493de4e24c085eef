//! Transcript building: raw messages → an ordered conversational context
//! ready to embed in a single model prompt.

use chrono::DateTime;

use crate::{
  message::{ConversationEntry, EntryKind, MessageKind, RawMessage},
  roster::Roster,
};

/// Text entries shorter than this (after trimming) are noise, not tasks.
pub const MIN_TEXT_LEN: usize = 2;

/// Longest body kept per entry; the rest is elided to bound prompt size.
pub const MAX_BODY_LEN: usize = 500;

/// Source values with more than 12 digits are epoch milliseconds.
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

// ─── Build ───────────────────────────────────────────────────────────────────

/// Build the ordered conversational context for a batch of raw messages.
///
/// Unsupported message kinds are dropped silently. A malformed message
/// (no sender) is skipped with a logged reason; it never aborts the build.
/// Entries are sorted by timestamp ascending, ties broken by arrival order;
/// missing or unusable timestamps sort as earliest.
pub fn build(messages: &[RawMessage], roster: &Roster) -> Vec<ConversationEntry> {
  let mut entries = Vec::new();

  for message in messages {
    let Some(sender_id) = message.sender_id.as_deref() else {
      tracing::debug!(message_id = %message.message_id, "skipping message without sender");
      continue;
    };
    let sender = roster.resolve(sender_id);

    let (kind, body) = match message.kind {
      MessageKind::Text => {
        let Some(text) = message.text.as_deref() else { continue };
        let stripped = strip_markup(text);
        let trimmed = stripped.trim();
        if trimmed.chars().count() < MIN_TEXT_LEN {
          continue;
        }
        (EntryKind::Text, truncate_body(roster.substitute_ids(trimmed)))
      }
      MessageKind::File => {
        let name = message.file_name.as_deref().unwrap_or("unnamed");
        (EntryKind::FileReference, format!("[document] {name}"))
      }
      MessageKind::Other => continue,
    };

    let mentions = message
      .mentions
      .iter()
      .filter_map(|m| {
        m.name
          .clone()
          .or_else(|| m.id.as_deref().map(|id| roster.resolve(id)))
      })
      .collect();

    entries.push(ConversationEntry {
      message_id: message.message_id.clone(),
      timestamp: normalize_timestamp(message.created_at),
      sender,
      kind,
      body,
      mentions,
    });
  }

  // Stable sort: arrival order breaks timestamp ties.
  entries.sort_by_key(|e| e.timestamp);
  entries
}

/// Clamp a raw source timestamp to epoch seconds; anything missing or
/// non-positive becomes `0`, which sorts as earliest.
fn normalize_timestamp(raw: Option<i64>) -> i64 {
  match raw {
    Some(ts) if ts >= MILLIS_THRESHOLD => ts / 1000,
    Some(ts) if ts > 0 => ts,
    _ => 0,
  }
}

/// Drop inline rich-text markup (`<p>…</p>` and friends) and entities.
fn strip_markup(text: &str) -> String {
  let cleaned = if text.contains('<') {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
      match c {
        '<' => in_tag = true,
        '>' if in_tag => in_tag = false,
        c if !in_tag => out.push(c),
        _ => {}
      }
    }
    out
  } else {
    text.to_string()
  };
  cleaned.replace("&nbsp;", " ")
}

fn truncate_body(body: String) -> String {
  if body.chars().count() <= MAX_BODY_LEN {
    return body;
  }
  let mut truncated: String = body.chars().take(MAX_BODY_LEN).collect();
  truncated.push_str("...");
  truncated
}

// ─── Render ──────────────────────────────────────────────────────────────────

/// Serialize entries into the prompt block: one `[time] sender: body` line
/// per entry, with an indented mention line where applicable. Entries whose
/// timestamp is unusable are labelled by ordinal instead.
pub fn render(entries: &[ConversationEntry]) -> String {
  let mut out = String::new();
  for (i, entry) in entries.iter().enumerate() {
    let stamp = format_stamp(entry.timestamp, i);
    let line = match entry.kind {
      EntryKind::Text => {
        format!("[{stamp}] {}: {}\n", entry.sender, entry.body)
      }
      EntryKind::FileReference => {
        format!("[{stamp}] {} shared a document: {}\n", entry.sender, entry.body)
      }
    };
    out.push_str(&line);
    if !entry.mentions.is_empty() {
      out.push_str(&format!("    (mentions: {})\n", entry.mentions.join(", ")));
    }
  }
  out
}

fn format_stamp(timestamp: i64, index: usize) -> String {
  match DateTime::from_timestamp(timestamp, 0) {
    Some(dt) if timestamp > 0 => dt.format("%m-%d %H:%M").to_string(),
    _ => format!("msg {}", index + 1),
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;
  use crate::{message::Mention, roster::RosterConfig};

  fn roster() -> Roster {
    Roster::new(RosterConfig {
      members:        vec!["Alice".into(), "Bob".into()],
      identities:     [
        ("id_A".to_string(), "Alice".to_string()),
        ("id_B".to_string(), "Bob".to_string()),
      ]
      .into(),
      aliases:        HashMap::new(),
      buckets:        vec![],
      generic_prefix: "user-".into(),
      unknown_label:  "unknown".into(),
    })
  }

  fn text_message(id: &str, sender: &str, text: &str, ts: Option<i64>) -> RawMessage {
    RawMessage {
      message_id: id.to_string(),
      kind:       MessageKind::Text,
      created_at: ts,
      sender_id:  Some(sender.to_string()),
      text:       Some(text.to_string()),
      file_name:  None,
      mentions:   vec![],
    }
  }

  #[test]
  fn orders_by_timestamp_ascending() {
    let messages = vec![
      text_message("m2", "id_B", "fixed payment API", Some(200)),
      text_message("m1", "id_A", "will fix login bug", Some(100)),
    ];
    let entries = build(&messages, &roster());
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].sender, "Alice");
    assert_eq!(entries[1].sender, "Bob");
  }

  #[test]
  fn missing_timestamp_sorts_earliest_without_raising() {
    let messages = vec![
      text_message("m1", "id_A", "late message", Some(500)),
      text_message("m2", "id_B", "undated message", None),
    ];
    let entries = build(&messages, &roster());
    assert_eq!(entries[0].body, "undated message");
    assert_eq!(entries[0].timestamp, 0);
  }

  #[test]
  fn millisecond_timestamps_are_normalized_to_seconds() {
    let messages = vec![text_message("m1", "id_A", "hello there", Some(1_748_800_000_000))];
    let entries = build(&messages, &roster());
    assert_eq!(entries[0].timestamp, 1_748_800_000);
  }

  #[test]
  fn short_and_unsupported_messages_are_dropped() {
    let mut sticker = text_message("m3", "id_A", "some sticker", Some(3));
    sticker.kind = MessageKind::Other;
    let messages = vec![
      text_message("m1", "id_A", "k", Some(1)),
      text_message("m2", "id_A", "  ", Some(2)),
      sticker,
      text_message("m4", "id_B", "real content", Some(4)),
    ];
    let entries = build(&messages, &roster());
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].body, "real content");
  }

  #[test]
  fn message_without_sender_is_skipped() {
    let mut message = text_message("m1", "id_A", "orphaned", Some(1));
    message.sender_id = None;
    assert!(build(&[message], &roster()).is_empty());
  }

  #[test]
  fn markup_is_stripped_and_ids_substituted() {
    let messages = vec![text_message(
      "m1",
      "id_A",
      "<p>id_B&nbsp;please review</p>",
      Some(1),
    )];
    let entries = build(&messages, &roster());
    assert_eq!(entries[0].body, "Bob please review");
  }

  #[test]
  fn long_bodies_are_truncated() {
    let long = "x".repeat(600);
    let entries = build(&[text_message("m1", "id_A", &long, Some(1))], &roster());
    assert_eq!(entries[0].body.chars().count(), MAX_BODY_LEN + 3);
    assert!(entries[0].body.ends_with("..."));
  }

  #[test]
  fn file_message_gets_placeholder_body() {
    let message = RawMessage {
      message_id: "m1".into(),
      kind:       MessageKind::File,
      created_at: Some(100),
      sender_id:  Some("id_A".into()),
      text:       None,
      file_name:  Some("roadmap.pdf".into()),
      mentions:   vec![],
    };
    let entries = build(&[message], &roster());
    assert_eq!(entries[0].kind, EntryKind::FileReference);
    assert_eq!(entries[0].body, "[document] roadmap.pdf");
  }

  #[test]
  fn render_formats_lines_and_mentions() {
    let mut message = text_message("m1", "id_A", "ship it", Some(1_748_822_400));
    message.mentions = vec![Mention { id: Some("id_B".into()), name: None }];
    let rendered = render(&build(&[message], &roster()));
    assert!(rendered.contains("Alice: ship it"), "rendered: {rendered}");
    assert!(rendered.contains("(mentions: Bob)"), "rendered: {rendered}");
  }

  #[test]
  fn render_labels_undated_entries_by_ordinal() {
    let rendered = render(&build(
      &[text_message("m1", "id_A", "undated", None)],
      &roster(),
    ));
    assert!(rendered.starts_with("[msg 1]"), "rendered: {rendered}");
  }
}
