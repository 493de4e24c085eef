//! Structured meeting summaries produced from a pasted transcript.
//!
//! Unlike the ledger pipeline, meeting analysis is a one-shot round trip:
//! the model answers with a summary object, a human reviews it, and a save
//! request persists it as-is. Every field is optional on the wire — a
//! partial answer is still a summary, not a failure.

use serde::{Deserialize, Serialize};

use crate::parse;

fn default_meeting_type() -> String { "general".to_string() }

/// One open task extracted from the transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetingTodo {
  pub task:     String,
  pub assignee: String,
  pub deadline: String,
}

/// One piece of completed work reported in the meeting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetingDone {
  pub achievement: String,
  pub contributor: String,
}

/// One unresolved problem raised in the meeting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetingIssue {
  pub issue:   String,
  pub urgency: String,
}

/// The structured payload the model returns for one transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetingSummary {
  pub summary:      String,
  pub participants: Vec<String>,
  pub keywords:     Vec<String>,
  pub todos:        Vec<MeetingTodo>,
  pub dones:        Vec<MeetingDone>,
  pub major_issues: Vec<MeetingIssue>,
  #[serde(default = "default_meeting_type")]
  pub meeting_type: String,
}

impl Default for MeetingSummary {
  fn default() -> Self {
    Self {
      summary:      String::new(),
      participants: Vec::new(),
      keywords:     Vec::new(),
      todos:        Vec::new(),
      dones:        Vec::new(),
      major_issues: Vec::new(),
      meeting_type: default_meeting_type(),
    }
  }
}

impl MeetingSummary {
  /// Flatten into the plain-text form stored alongside the structured
  /// fields: the prose summary followed by numbered task, done, and issue
  /// sections (omitted when empty).
  pub fn render_text(&self) -> String {
    let mut out = self.summary.trim().to_string();

    if !self.todos.is_empty() {
      out.push_str("\n\nTo do:\n");
      for (i, todo) in self.todos.iter().enumerate() {
        out.push_str(&format!(
          "{}. {} (assignee: {}, due: {})\n",
          i + 1,
          todo.task,
          or(&todo.assignee, "unassigned"),
          or(&todo.deadline, "tbd"),
        ));
      }
    }

    if !self.dones.is_empty() {
      out.push_str("\nDone:\n");
      for (i, done) in self.dones.iter().enumerate() {
        out.push_str(&format!(
          "{}. {} (contributor: {})\n",
          i + 1,
          done.achievement,
          or(&done.contributor, "team"),
        ));
      }
    }

    if !self.major_issues.is_empty() {
      out.push_str("\nIssues:\n");
      for (i, issue) in self.major_issues.iter().enumerate() {
        out.push_str(&format!(
          "{}. {} (urgency: {})\n",
          i + 1,
          issue.issue,
          or(&issue.urgency, "unrated"),
        ));
      }
    }

    out
  }
}

fn or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
  if value.trim().is_empty() { fallback } else { value }
}

/// Parse a raw model response into a [`MeetingSummary`], using the same
/// fenced → braced → whole-text JSON extraction as the ledger parser.
/// Returns `None` when no JSON object with a compatible shape is found.
pub fn parse_summary(raw: &str) -> Option<MeetingSummary> {
  let value = parse::extract_json(raw)?;
  serde_json::from_value(value).ok()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_fenced_summary_output() {
    let raw = r#"Here you go:
```json
{"summary": "Q3 planning sync.", "participants": ["Alice", "Bob"],
 "todos": [{"task": "draft roadmap", "assignee": "Alice", "deadline": "Friday"}],
 "meeting_type": "planning"}
```"#;

    let summary = parse_summary(raw).expect("summary should parse");
    assert_eq!(summary.summary, "Q3 planning sync.");
    assert_eq!(summary.participants, vec!["Alice", "Bob"]);
    assert_eq!(summary.todos[0].task, "draft roadmap");
    assert_eq!(summary.meeting_type, "planning");
  }

  #[test]
  fn missing_fields_take_defaults() {
    let summary = parse_summary(r#"{"summary": "short sync"}"#).unwrap();
    assert!(summary.participants.is_empty());
    assert!(summary.todos.is_empty());
    assert_eq!(summary.meeting_type, "general");
  }

  #[test]
  fn non_object_output_is_rejected() {
    assert!(parse_summary("no json here at all").is_none());
    assert!(parse_summary(r#"["summary", "participants"]"#).is_none());
  }

  #[test]
  fn render_text_numbers_each_section() {
    let summary = MeetingSummary {
      summary: "Weekly sync.".into(),
      todos: vec![
        MeetingTodo {
          task:     "draft roadmap".into(),
          assignee: "Alice".into(),
          deadline: String::new(),
        },
        MeetingTodo { task: "file tickets".into(), ..Default::default() },
      ],
      dones: vec![MeetingDone {
        achievement: "shipped release".into(),
        contributor: "Bob".into(),
      }],
      ..Default::default()
    };

    let text = summary.render_text();
    assert!(text.starts_with("Weekly sync."));
    assert!(text.contains("1. draft roadmap (assignee: Alice, due: tbd)"));
    assert!(text.contains("2. file tickets (assignee: unassigned, due: tbd)"));
    assert!(text.contains("1. shipped release (contributor: Bob)"));
    assert!(!text.contains("Issues:"));
  }

  #[test]
  fn render_text_of_empty_summary_is_just_the_prose() {
    let summary =
      MeetingSummary { summary: "Nothing to report.".into(), ..Default::default() };
    assert_eq!(summary.render_text(), "Nothing to report.");
  }
}
