//! Handlers for `/ledgers` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/ledgers/latest` | Optional `?container_id=…`; 404 if no runs stored |
//! | `GET`  | `/ledgers/:date/items` | `date` is `YYYY-MM-DD` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::NaiveDate;
use serde::Deserialize;
use tally_core::store::{LedgerItem, LedgerSnapshot, LedgerStore};

use crate::error::ApiError;

// ─── Latest ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LatestParams {
  pub container_id: Option<String>,
}

/// `GET /ledgers/latest[?container_id=<id>]`
pub async fn latest<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<LatestParams>,
) -> Result<Json<LedgerSnapshot>, ApiError>
where
  S: LedgerStore,
{
  let scope = params.container_id.clone();
  let snapshot = store
    .latest(params.container_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| match scope {
      Some(c) => ApiError::NotFound(format!("no analysis stored for container {c}")),
      None => ApiError::NotFound("no analysis stored yet".to_string()),
    })?;
  Ok(Json(snapshot))
}

// ─── Items by date ───────────────────────────────────────────────────────────

/// `GET /ledgers/:date/items`
pub async fn items_by_date<S>(
  State(store): State<Arc<S>>,
  Path(date): Path<NaiveDate>,
) -> Result<Json<Vec<LedgerItem>>, ApiError>
where
  S: LedgerStore,
{
  let items = store
    .items_by_date(date)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(items))
}
