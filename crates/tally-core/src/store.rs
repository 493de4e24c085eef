//! The [`LedgerStore`] trait: persistence boundary for analysis results.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{ledger::TaskLedger, window::AnalysisWindow};

// ─── Records ─────────────────────────────────────────────────────────────────

/// Terminal status of one analysis run as persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
  Success,
  Error,
}

impl RunStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      RunStatus::Success => "success",
      RunStatus::Error => "error",
    }
  }
}

impl std::str::FromStr for RunStatus {
  type Err = crate::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "success" => Ok(RunStatus::Success),
      "error" => Ok(RunStatus::Error),
      other => Err(crate::Error::UnknownStatus(other.to_string())),
    }
  }
}

/// A run result ready to be written. One record per
/// `(container_id, analysis_date)`; a re-run replaces the previous one.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerRecord {
  pub window:         AnalysisWindow,
  pub analysis_at:    DateTime<Utc>,
  pub total_messages: u32,
  pub model:          String,
  pub raw_output:     String,
  pub status:         RunStatus,
}

/// A stored run result, scalar fields only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
  pub id:             i64,
  pub container_id:   String,
  pub analysis_date:  NaiveDate,
  pub analysis_at:    DateTime<Utc>,
  pub window_start:   DateTime<Utc>,
  pub window_end:     DateTime<Utc>,
  pub total_messages: u32,
  pub model:          String,
  pub raw_output:     String,
  pub status:         RunStatus,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

/// One task row belonging to a stored record. `position` is 1-based within
/// the assignee's list for the category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerItem {
  pub id:        i64,
  pub record_id: i64,
  pub category:  crate::ledger::Category,
  pub assignee:  String,
  pub task_text: String,
  pub position:  u32,
}

/// A record together with its ledger, reassembled from item rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
  pub record: LedgerRecord,
  pub ledger: TaskLedger,
}

/// Per-assignee task counts for one analysis date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadRow {
  pub analysis_date: NaiveDate,
  pub assignee:      String,
  pub pending:       u32,
  pub completed:     u32,
  pub issues:        u32,
  pub total:         u32,
}

// ─── Meeting records ─────────────────────────────────────────────────────────

/// A meeting summary ready to be written. Meetings are append-only; nothing
/// keys them to a container or date.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMeetingRecord {
  pub recorded_at:  DateTime<Utc>,
  pub transcript:   String,
  pub summary_text: String,
  pub participants: Vec<String>,
  pub meeting_type: String,
  pub model:        String,
}

/// A stored meeting summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingRecord {
  pub id:           i64,
  pub recorded_at:  DateTime<Utc>,
  pub transcript:   String,
  pub summary_text: String,
  pub participants: Vec<String>,
  pub meeting_type: String,
  pub model:        String,
  pub created_at:   DateTime<Utc>,
}

// ─── Store trait ─────────────────────────────────────────────────────────────

/// Persistence operations for ledger records.
///
/// `upsert` is transactional: scalars and items replace the previous run for
/// the same `(container_id, analysis_date)` atomically, or nothing changes.
pub trait LedgerStore: Send + Sync + 'static {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert or replace the record for the run's container and date.
  /// Returns the record id. The original `created_at` survives a replace.
  fn upsert(
    &self,
    record: NewLedgerRecord,
    ledger: TaskLedger,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  /// Most recent record by analysis date, optionally scoped to a container.
  fn latest(
    &self,
    container_id: Option<String>,
  ) -> impl Future<Output = Result<Option<LedgerSnapshot>, Self::Error>> + Send + '_;

  /// All items stored for `date`, across containers, ordered by category,
  /// assignee, and position.
  fn items_by_date(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<LedgerItem>, Self::Error>> + Send + '_;

  /// Per-assignee counts over the last `since_days` days, newest date first,
  /// heaviest assignee first within a date.
  fn workload(
    &self,
    since_days: u32,
  ) -> impl Future<Output = Result<Vec<WorkloadRow>, Self::Error>> + Send + '_;

  /// Append one meeting summary and return its id.
  fn save_meeting(
    &self,
    record: NewMeetingRecord,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  /// The most recently recorded meeting summaries, newest first.
  fn recent_meetings(
    &self,
    limit: u32,
  ) -> impl Future<Output = Result<Vec<MeetingRecord>, Self::Error>> + Send + '_;
}
