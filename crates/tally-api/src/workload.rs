//! Handler for `/workload` — per-assignee task counts over recent days.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;
use tally_core::store::{LedgerStore, WorkloadRow};

use crate::error::ApiError;

fn default_days() -> u32 { 7 }

#[derive(Debug, Deserialize)]
pub struct WorkloadParams {
  #[serde(default = "default_days")]
  pub days: u32,
}

/// `GET /workload[?days=<n>]` — defaults to the last 7 days.
pub async fn handler<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<WorkloadParams>,
) -> Result<Json<Vec<WorkloadRow>>, ApiError>
where
  S: LedgerStore,
{
  if params.days == 0 {
    return Err(ApiError::BadRequest("days must be at least 1".to_string()));
  }
  let rows = store
    .workload(params.days)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(rows))
}
