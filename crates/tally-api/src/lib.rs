//! JSON REST API for Tally.
//!
//! Exposes an axum [`Router`] backed by any [`tally_core::store::LedgerStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", tally_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod ledgers;
pub mod meetings;
pub mod workload;

use std::sync::Arc;

use axum::{Router, routing::get};
use tally_core::store::LedgerStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: LedgerStore + Clone,
{
  Router::new()
    // Ledgers
    .route("/ledgers/latest", get(ledgers::latest::<S>))
    .route("/ledgers/{date}/items", get(ledgers::items_by_date::<S>))
    // Workload
    .route("/workload", get(workload::handler::<S>))
    // Meetings
    .route("/meetings", get(meetings::recent::<S>))
    .with_state(store)
}
