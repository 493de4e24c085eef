//! The analysis pipeline: fetch messages, build the transcript, query the
//! model, reconcile the result against the roster, and persist the ledger.
//!
//! Failure handling is deliberately asymmetric. A fetch or model failure
//! aborts the run and persists nothing. A malformed model response is a
//! stored outcome: an empty ledger with `error` status and the raw text kept
//! for diagnostics. A persistence failure is carried on the outcome so the
//! caller still sees the ledger that was computed.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tally_core::{
  ledger::TaskLedger,
  normalize::normalize_payload,
  parse::{parse_response, ParseOutcome},
  roster::Roster,
  store::{LedgerStore, NewLedgerRecord, RunStatus},
  transcript,
  window::AnalysisWindow,
};
use thiserror::Error;
use uuid::Uuid;

use crate::{chat::ChatClient, model::ModelClient};

// ─── Request / outcome ───────────────────────────────────────────────────────

/// Body of `POST /analyze`. All fields optional: an empty body analyses the
/// configured default container over the standard daily window.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisRequest {
  pub container_id: Option<String>,
  pub start:        Option<chrono::DateTime<Utc>>,
  pub end:          Option<chrono::DateTime<Utc>>,
}

/// Everything a caller learns about one completed run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
  pub run_id:         Uuid,
  pub status:         RunStatus,
  pub window:         AnalysisWindow,
  pub total_messages: u32,
  pub model:          String,
  pub ledger:         TaskLedger,
  pub record_id:      Option<i64>,
  pub persist_error:  Option<String>,
}

/// A failure that aborts the run before anything is persisted.
#[derive(Debug, Error)]
pub enum RunError {
  #[error("message fetch failed: {0}")]
  Fetch(#[from] crate::chat::ChatError),

  #[error("model request failed: {0}")]
  Model(#[from] crate::model::ModelError),
}

impl RunError {
  pub fn stage(&self) -> &'static str {
    match self {
      RunError::Fetch(_) => "fetch",
      RunError::Model(_) => "model",
    }
  }
}

// ─── Prompts ─────────────────────────────────────────────────────────────────

const SYSTEM_PROMPT: &str = "You are an assistant that reads a team chat \
transcript and extracts a per-person task ledger. Classify every actionable \
statement into exactly one of three categories: Pending (committed but not \
done), Completed (reported as done), or Issue (a problem or blocker someone \
raised). Assign each task to the person responsible for it, never to the \
person who merely mentioned it. Only use the assignee names you are given. \
Respond with a single JSON object and nothing else.";

/// Build the user prompt: roster, window, transcript, and the exact output
/// skeleton the parser expects.
pub fn build_prompt(
  roster: &Roster,
  window: &AnalysisWindow,
  transcript_text: &str,
) -> String {
  let members = roster.members().join(", ");
  let buckets = roster.buckets().join(", ");
  let assignees = if buckets.is_empty() {
    members
  } else {
    format!("{members}, {buckets}")
  };

  format!(
    "Team members (the only valid assignees): {assignees}\n\
     Window: {start} to {end} (ledger date {date})\n\n\
     Transcript:\n{transcript_text}\n\
     Output format, using only the assignees listed above:\n\
     {{\"Pending\": {{\"<assignee>\": [\"<task>\"]}}, \
     \"Completed\": {{\"<assignee>\": [\"<task>\"]}}, \
     \"Issue\": {{\"<assignee>\": [\"<task>\"]}}}}",
    start = window.start.to_rfc3339(),
    end = window.end.to_rfc3339(),
    date = window.analysis_date,
  )
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

/// Run one full analysis over `window` and persist the result.
pub async fn run<S: LedgerStore>(
  store: &S,
  chat: &ChatClient,
  model: &ModelClient,
  roster: &Roster,
  window: AnalysisWindow,
) -> Result<AnalysisOutcome, RunError> {
  let run_id = Uuid::new_v4();
  tracing::info!(
    %run_id,
    container_id = %window.container_id,
    date = %window.analysis_date,
    "starting analysis run"
  );

  let messages = chat
    .fetch_messages(&window.container_id, window.start, window.end)
    .await?;
  let entries = transcript::build(&messages, roster);

  // Nothing to analyse: record an empty successful run without spending a
  // model call.
  if entries.is_empty() {
    tracing::info!(%run_id, "window contains no usable messages");
    return Ok(
      persist(
        store,
        run_id,
        window,
        0,
        model.model_name().to_owned(),
        String::new(),
        RunStatus::Success,
        TaskLedger::default(),
      )
      .await,
    );
  }

  let transcript_text = transcript::render(&entries);
  let prompt = build_prompt(roster, &window, &transcript_text);
  let raw = model.complete(SYSTEM_PROMPT, &prompt).await?;

  let (status, ledger) = match parse_response(&raw) {
    ParseOutcome::Parsed(payload) => {
      (RunStatus::Success, normalize_payload(&payload, roster))
    }
    ParseOutcome::Failed { reason, .. } => {
      tracing::warn!(%run_id, %reason, "model response did not parse");
      (RunStatus::Error, TaskLedger::default())
    }
  };

  Ok(
    persist(
      store,
      run_id,
      window,
      entries.len() as u32,
      model.model_name().to_owned(),
      raw,
      status,
      ledger,
    )
    .await,
  )
}

#[allow(clippy::too_many_arguments)]
async fn persist<S: LedgerStore>(
  store: &S,
  run_id: Uuid,
  window: AnalysisWindow,
  total_messages: u32,
  model: String,
  raw_output: String,
  status: RunStatus,
  ledger: TaskLedger,
) -> AnalysisOutcome {
  let record = NewLedgerRecord {
    window:      window.clone(),
    analysis_at: Utc::now(),
    total_messages,
    model:       model.clone(),
    raw_output,
    status,
  };

  let (record_id, persist_error) = match store.upsert(record, ledger.clone()).await {
    Ok(id) => (Some(id), None),
    Err(e) => {
      tracing::error!(%run_id, error = %e, "failed to persist analysis result");
      (None, Some(e.to_string()))
    }
  };

  tracing::info!(
    %run_id,
    ?record_id,
    status = status.as_str(),
    items = ledger.item_count(),
    "analysis run finished"
  );

  AnalysisOutcome {
    run_id,
    status,
    window,
    total_messages,
    model,
    ledger,
    record_id,
    persist_error,
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use chrono::TimeZone as _;
  use tally_core::roster::RosterConfig;

  use super::*;

  fn roster() -> Roster {
    Roster::new(RosterConfig {
      members:        vec!["Michael".into(), "小钟".into()],
      identities:     HashMap::new(),
      aliases:        HashMap::new(),
      buckets:        vec!["团队".into()],
      generic_prefix: "用户".into(),
      unknown_label:  "未知用户".into(),
    })
  }

  #[test]
  fn prompt_lists_members_buckets_and_skeleton() {
    let window = AnalysisWindow::new(
      "oc_group",
      Utc.with_ymd_and_hms(2025, 6, 2, 10, 30, 0).unwrap(),
      Utc.with_ymd_and_hms(2025, 6, 3, 10, 30, 0).unwrap(),
    );
    let prompt = build_prompt(&roster(), &window, "[06-02 11:00] Michael: ship it\n");

    assert!(prompt.contains("Michael, 小钟, 团队"), "prompt: {prompt}");
    assert!(prompt.contains("ship it"));
    assert!(prompt.contains(r#""Pending""#));
    assert!(prompt.contains(r#""Completed""#));
    assert!(prompt.contains(r#""Issue""#));
    assert!(prompt.contains("2025-06-03"));
  }
}
