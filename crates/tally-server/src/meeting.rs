//! Meeting-transcript summarisation: the prompt, the request bodies for
//! `/meetings/analyze` and `/meetings/save`, and the model round trip.
//!
//! Analysis and persistence are separate steps on purpose: a human reviews
//! (and possibly edits) the generated summary before saving it.

use serde::{Deserialize, Serialize};
use tally_core::meeting::{parse_summary, MeetingSummary};
use thiserror::Error;

use crate::model::{ModelClient, ModelError};

// ─── Request / response ──────────────────────────────────────────────────────

/// Body of `POST /meetings/analyze`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeMeetingRequest {
  pub transcript: String,
}

/// Body of `POST /meetings/save`. The transcript is optional — a summary
/// pasted from elsewhere can be saved without its source text.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveMeetingRequest {
  pub summary:    MeetingSummary,
  #[serde(default)]
  pub transcript: String,
}

/// What `/meetings/analyze` returns: the structured summary plus enough
/// context to audit the run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzedMeeting {
  pub summary:          MeetingSummary,
  pub model:            String,
  pub transcript_chars: usize,
}

/// A failure during meeting summarisation.
#[derive(Debug, Error)]
pub enum MeetingError {
  #[error("model request failed: {0}")]
  Model(#[from] ModelError),

  #[error("model response was not a meeting summary")]
  Unparseable,
}

impl MeetingError {
  pub fn stage(&self) -> &'static str {
    match self {
      MeetingError::Model(_) => "model",
      MeetingError::Unparseable => "parse",
    }
  }
}

// ─── Prompt ──────────────────────────────────────────────────────────────────

const MEETING_SYSTEM_PROMPT: &str = "You are a meeting analyst. You extract \
open tasks with owners and deadlines, completed work, and unresolved \
problems from a meeting transcript. Respond with a single JSON object and \
nothing else.";

fn build_meeting_prompt(transcript: &str) -> String {
  format!(
    "Summarise the following meeting transcript. The summary field should \
     be two or three short paragraphs of prose. Use exactly this shape:\n\
     {{\"summary\": \"<prose summary>\", \
     \"participants\": [\"<name>\"], \
     \"keywords\": [\"<keyword>\"], \
     \"todos\": [{{\"task\": \"\", \"assignee\": \"\", \"deadline\": \"\"}}], \
     \"dones\": [{{\"achievement\": \"\", \"contributor\": \"\"}}], \
     \"major_issues\": [{{\"issue\": \"\", \"urgency\": \"\"}}], \
     \"meeting_type\": \"planning|status_update|decision_making|technical_discussion|general\"}}\n\n\
     Transcript:\n{transcript}"
  )
}

// ─── Round trip ──────────────────────────────────────────────────────────────

/// Summarise one transcript. Nothing is persisted here; the caller decides
/// whether the result is worth saving.
pub async fn summarize(
  model: &ModelClient,
  transcript: &str,
) -> Result<AnalyzedMeeting, MeetingError> {
  let prompt = build_meeting_prompt(transcript);
  let raw = model.complete(MEETING_SYSTEM_PROMPT, &prompt).await?;

  let summary = parse_summary(&raw).ok_or(MeetingError::Unparseable)?;
  tracing::info!(
    todos = summary.todos.len(),
    dones = summary.dones.len(),
    issues = summary.major_issues.len(),
    "meeting transcript summarised"
  );

  Ok(AnalyzedMeeting {
    summary,
    model: model.model_name().to_owned(),
    transcript_chars: transcript.chars().count(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn prompt_embeds_transcript_and_skeleton() {
    let prompt = build_meeting_prompt("Alice: let's plan Q3.");

    assert!(prompt.contains("Alice: let's plan Q3."));
    assert!(prompt.contains(r#""todos""#));
    assert!(prompt.contains(r#""dones""#));
    assert!(prompt.contains(r#""major_issues""#));
    assert!(prompt.contains(r#""meeting_type""#));
  }
}
