//! The time window one analysis run is computed over.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Half-open interval `[start, end)` over one source container, attributed
/// to a single `analysis_date`.
///
/// The attributed date is the *end* day of the window: the daily business
/// window runs from yesterday's cutover time to today's, and its ledger
/// belongs to today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWindow {
  pub container_id:  String,
  pub start:         DateTime<Utc>,
  pub end:           DateTime<Utc>,
  pub analysis_date: NaiveDate,
}

impl AnalysisWindow {
  /// Explicit window; the ledger is attributed to the end day.
  pub fn new(
    container_id: impl Into<String>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Self {
    Self {
      container_id: container_id.into(),
      start,
      end,
      analysis_date: end.date_naive(),
    }
  }

  /// The standard daily window: yesterday at `cutover` up to today at
  /// `cutover`, attributed to today.
  pub fn daily(
    container_id: impl Into<String>,
    now: DateTime<Utc>,
    cutover: NaiveTime,
  ) -> Self {
    let end = now.date_naive().and_time(cutover).and_utc();
    Self {
      container_id: container_id.into(),
      start: end - Duration::days(1),
      end,
      analysis_date: now.date_naive(),
    }
  }
}
