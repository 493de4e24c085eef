//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, dates as `YYYY-MM-DD`, and
//! enum-like fields (category, status) as their lowercase names.

use chrono::{DateTime, NaiveDate, Utc};
use tally_core::{
  ledger::Category,
  store::{LedgerItem, LedgerRecord, MeetingRecord, RunStatus},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode(format!("date {s:?}: {e}")))
}

// ─── Category ────────────────────────────────────────────────────────────────

pub fn encode_category(c: Category) -> &'static str {
  match c {
    Category::Pending => "pending",
    Category::Completed => "completed",
    Category::Issue => "issue",
  }
}

pub fn decode_category(s: &str) -> Result<Category> {
  match s {
    "pending" => Ok(Category::Pending),
    "completed" => Ok(Category::Completed),
    "issue" => Ok(Category::Issue),
    other => Err(Error::Decode(format!("unknown category: {other:?}"))),
  }
}

// ─── RunStatus ───────────────────────────────────────────────────────────────

pub fn encode_status(s: RunStatus) -> &'static str { s.as_str() }

pub fn decode_status(s: &str) -> Result<RunStatus> {
  match s {
    "success" => Ok(RunStatus::Success),
    "error" => Ok(RunStatus::Error),
    other => Err(Error::Decode(format!("unknown run status: {other:?}"))),
  }
}

// ─── Name lists ──────────────────────────────────────────────────────────────

pub fn encode_names(names: &[String]) -> Result<String> {
  serde_json::to_string(names).map_err(|e| Error::Core(e.into()))
}

pub fn decode_names(s: &str) -> Result<Vec<String>> {
  serde_json::from_str(s)
    .map_err(|e| Error::Decode(format!("name list {s:?}: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `ledger_records` row.
pub struct RawLedgerRecord {
  pub id:             i64,
  pub container_id:   String,
  pub analysis_date:  String,
  pub analysis_at:    String,
  pub window_start:   String,
  pub window_end:     String,
  pub total_messages: u32,
  pub model:          String,
  pub raw_output:     String,
  pub status:         String,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawLedgerRecord {
  pub fn into_record(self) -> Result<LedgerRecord> {
    Ok(LedgerRecord {
      id:             self.id,
      container_id:   self.container_id,
      analysis_date:  decode_date(&self.analysis_date)?,
      analysis_at:    decode_dt(&self.analysis_at)?,
      window_start:   decode_dt(&self.window_start)?,
      window_end:     decode_dt(&self.window_end)?,
      total_messages: self.total_messages,
      model:          self.model,
      raw_output:     self.raw_output,
      status:         decode_status(&self.status)?,
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `meeting_summaries` row.
pub struct RawMeetingRecord {
  pub id:           i64,
  pub recorded_at:  String,
  pub transcript:   String,
  pub summary_text: String,
  pub participants: String,
  pub meeting_type: String,
  pub model:        String,
  pub created_at:   String,
}

impl RawMeetingRecord {
  pub fn into_record(self) -> Result<MeetingRecord> {
    Ok(MeetingRecord {
      id:           self.id,
      recorded_at:  decode_dt(&self.recorded_at)?,
      transcript:   self.transcript,
      summary_text: self.summary_text,
      participants: decode_names(&self.participants)?,
      meeting_type: self.meeting_type,
      model:        self.model,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `ledger_items` row.
pub struct RawLedgerItem {
  pub id:        i64,
  pub record_id: i64,
  pub category:  String,
  pub assignee:  String,
  pub task_text: String,
  pub position:  u32,
}

impl RawLedgerItem {
  pub fn into_item(self) -> Result<LedgerItem> {
    Ok(LedgerItem {
      id:        self.id,
      record_id: self.record_id,
      category:  decode_category(&self.category)?,
      assignee:  self.assignee,
      task_text: self.task_text,
      position:  self.position,
    })
  }
}
