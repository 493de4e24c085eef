//! Handler for `/meetings` — recently stored meeting summaries.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;
use tally_core::store::{LedgerStore, MeetingRecord};

use crate::error::ApiError;

fn default_limit() -> u32 { 20 }

#[derive(Debug, Deserialize)]
pub struct MeetingsParams {
  #[serde(default = "default_limit")]
  pub limit: u32,
}

/// `GET /meetings[?limit=<n>]` — newest first, defaults to the last 20.
pub async fn recent<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<MeetingsParams>,
) -> Result<Json<Vec<MeetingRecord>>, ApiError>
where
  S: LedgerStore,
{
  if params.limit == 0 {
    return Err(ApiError::BadRequest("limit must be at least 1".to_string()));
  }
  let meetings = store
    .recent_meetings(params.limit)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(meetings))
}
