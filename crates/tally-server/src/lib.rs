//! HTTP service for Tally.
//!
//! Exposes the analysis trigger, raw message inspection, meeting
//! summarisation, and a health probe, and mounts the read-only JSON API
//! from `tally-api` under `/api`, all backed by any
//! [`tally_core::store::LedgerStore`].

pub mod analyze;
pub mod chat;
pub mod meeting;
pub mod model;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Json, Router,
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::{get, post},
};
use chrono::{NaiveTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tally_core::{
  roster::{Roster, RosterConfig},
  store::{LedgerStore, NewMeetingRecord},
  transcript,
  window::AnalysisWindow,
};
use tower_http::trace::TraceLayer;

use analyze::AnalysisRequest;
use chat::{ChatClient, ChatConfig};
use meeting::{AnalyzeMeetingRequest, SaveMeetingRequest};
use model::{ModelClient, ModelConfig};

// ─── Configuration ───────────────────────────────────────────────────────────

fn default_cutover() -> String { "10:30".to_string() }

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  /// Daily window boundary, `HH:MM` UTC.
  #[serde(default = "default_cutover")]
  pub cutover:    String,
  pub chat:       ChatConfig,
  pub model:      ModelConfig,
  pub roster:     RosterConfig,
}

impl ServerConfig {
  pub fn cutover_time(&self) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(&self.cutover, "%H:%M")
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: LedgerStore> {
  pub store:   Arc<S>,
  pub chat:    ChatClient,
  pub model:   ModelClient,
  pub roster:  Arc<Roster>,
  pub cutover: NaiveTime,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full application router: health probe, analysis trigger, and
/// the `/api` read surface.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: LedgerStore + Clone,
{
  let api = tally_api::api_router(state.store.clone());

  Router::new()
    .route("/health", get(health::<S>))
    .route("/analyze", post(run_analysis::<S>))
    .route("/messages/fetch", post(fetch_raw_messages::<S>))
    .route("/meetings/analyze", post(analyze_meeting::<S>))
    .route("/meetings/save", post(save_meeting::<S>))
    .with_state(state)
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

// ─── Handlers ────────────────────────────────────────────────────────────────

async fn health<S>(State(state): State<AppState<S>>) -> Json<serde_json::Value>
where
  S: LedgerStore + Clone,
{
  let store = match state.store.latest(None).await {
    Ok(_) => "ok".to_string(),
    Err(e) => e.to_string(),
  };
  Json(json!({
    "status": "ok",
    "model":  state.model.model_name(),
    "store":  store,
  }))
}

fn bad_request(message: &str) -> Response {
  (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// Turn a request's optional container and range into a concrete window.
/// `start` and `end` must be provided together; with neither, the configured
/// default container gets the standard daily window.
fn resolve_window<S>(
  state: &AppState<S>,
  request: AnalysisRequest,
) -> Result<AnalysisWindow, Response>
where
  S: LedgerStore,
{
  let container = request
    .container_id
    .unwrap_or_else(|| state.chat.default_container().to_owned());

  match (request.start, request.end) {
    (Some(start), Some(end)) => {
      if end <= start {
        return Err(bad_request("end must be after start"));
      }
      Ok(AnalysisWindow::new(container, start, end))
    }
    (None, None) => {
      Ok(AnalysisWindow::daily(container, Utc::now(), state.cutover))
    }
    _ => Err(bad_request("start and end must be provided together")),
  }
}

/// `POST /analyze` — run one analysis now.
///
/// With no body (or an empty one) the configured default container is
/// analysed over the standard daily window.
async fn run_analysis<S>(
  State(state): State<AppState<S>>,
  body: Option<Json<AnalysisRequest>>,
) -> Response
where
  S: LedgerStore + Clone,
{
  let request = body.map(|Json(b)| b).unwrap_or_default();
  let window = match resolve_window(&state, request) {
    Ok(w) => w,
    Err(resp) => return resp,
  };

  match analyze::run(&*state.store, &state.chat, &state.model, &state.roster, window).await
  {
    Ok(outcome) => Json(outcome).into_response(),
    Err(e) => (
      StatusCode::BAD_GATEWAY,
      Json(json!({ "error": e.to_string(), "stage": e.stage() })),
    )
      .into_response(),
  }
}

/// `POST /messages/fetch` — pull one window of raw messages and show the
/// conversation entries a run over that window would analyse. Nothing is
/// sent to the model and nothing is persisted.
async fn fetch_raw_messages<S>(
  State(state): State<AppState<S>>,
  body: Option<Json<AnalysisRequest>>,
) -> Response
where
  S: LedgerStore + Clone,
{
  let request = body.map(|Json(b)| b).unwrap_or_default();
  let window = match resolve_window(&state, request) {
    Ok(w) => w,
    Err(resp) => return resp,
  };

  match state
    .chat
    .fetch_messages(&window.container_id, window.start, window.end)
    .await
  {
    Ok(messages) => {
      let entries = transcript::build(&messages, &state.roster);
      Json(json!({
        "window":  window,
        "fetched": messages.len(),
        "usable":  entries.len(),
        "entries": entries,
      }))
      .into_response()
    }
    Err(e) => (
      StatusCode::BAD_GATEWAY,
      Json(json!({ "error": e.to_string(), "stage": "fetch" })),
    )
      .into_response(),
  }
}

/// `POST /meetings/analyze` — summarise a pasted meeting transcript.
async fn analyze_meeting<S>(
  State(state): State<AppState<S>>,
  Json(request): Json<AnalyzeMeetingRequest>,
) -> Response
where
  S: LedgerStore + Clone,
{
  if request.transcript.trim().is_empty() {
    return bad_request("transcript must not be empty");
  }

  match meeting::summarize(&state.model, &request.transcript).await {
    Ok(analyzed) => Json(analyzed).into_response(),
    Err(e) => (
      StatusCode::BAD_GATEWAY,
      Json(json!({ "error": e.to_string(), "stage": e.stage() })),
    )
      .into_response(),
  }
}

/// `POST /meetings/save` — persist a reviewed summary with its transcript.
async fn save_meeting<S>(
  State(state): State<AppState<S>>,
  Json(request): Json<SaveMeetingRequest>,
) -> Response
where
  S: LedgerStore + Clone,
{
  let record = NewMeetingRecord {
    recorded_at:  Utc::now(),
    transcript:   request.transcript,
    summary_text: request.summary.render_text(),
    participants: request.summary.participants.clone(),
    meeting_type: request.summary.meeting_type.clone(),
    model:        state.model.model_name().to_owned(),
  };

  match state.store.save_meeting(record).await {
    Ok(id) => Json(json!({ "meeting_id": id })).into_response(),
    Err(e) => (
      StatusCode::INTERNAL_SERVER_ERROR,
      Json(json!({ "error": e.to_string() })),
    )
      .into_response(),
  }
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use axum::{body::Body, http::Request};
  use chrono::TimeZone as _;
  use tally_core::{
    ledger::{Category, TaskLedger},
    store::{NewLedgerRecord, RunStatus},
  };
  use tally_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  async fn make_state() -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    // Clients point at a closed local port; tests that exercise them expect
    // the resulting fetch failure.
    let chat = ChatClient::new(ChatConfig {
      base_url:     "http://127.0.0.1:9".to_string(),
      app_id:       "app".to_string(),
      app_secret:   "secret".to_string(),
      container_id: "oc_test".to_string(),
      page_size:    50,
      timeout_secs: 5,
    })
    .unwrap();
    let model = ModelClient::new(ModelConfig {
      base_url:     "http://127.0.0.1:9".to_string(),
      api_key:      "key".to_string(),
      model:        "deepseek/deepseek-chat-v3-0324".to_string(),
      temperature:  0.3,
      max_tokens:   None,
      timeout_secs: 5,
    })
    .unwrap();
    let roster = Roster::new(RosterConfig {
      members:        vec!["Alice".into(), "Bob".into()],
      identities:     HashMap::new(),
      aliases:        HashMap::new(),
      buckets:        vec![],
      generic_prefix: "user-".into(),
      unknown_label:  "unknown".into(),
    });

    AppState {
      store:   Arc::new(store),
      chat,
      model,
      roster:  Arc::new(roster),
      cutover: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
    }
  }

  async fn seed(state: &AppState<SqliteStore>) {
    let window = AnalysisWindow::new(
      "oc_test",
      Utc.with_ymd_and_hms(2025, 6, 2, 10, 30, 0).unwrap(),
      Utc.with_ymd_and_hms(2025, 6, 3, 10, 30, 0).unwrap(),
    );
    let mut ledger = TaskLedger::default();
    ledger.push(Category::Pending, "Alice", "fix login bug");
    state
      .store
      .upsert(
        NewLedgerRecord {
          window,
          analysis_at: Utc::now(),
          total_messages: 3,
          model: "deepseek/deepseek-chat-v3-0324".to_string(),
          raw_output: String::new(),
          status: RunStatus::Success,
        },
        ledger,
      )
      .await
      .unwrap();
  }

  async fn get_uri(state: AppState<SqliteStore>, uri: &str) -> (StatusCode, String) {
    let resp = router(state)
      .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
      .await
      .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
  }

  async fn post_json(
    state: AppState<SqliteStore>,
    uri: &str,
    body: &str,
  ) -> (StatusCode, String) {
    let resp = router(state)
      .oneshot(
        Request::builder()
          .method("POST")
          .uri(uri)
          .header("content-type", "application/json")
          .body(Body::from(body.to_string()))
          .unwrap(),
      )
      .await
      .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
  }

  #[tokio::test]
  async fn health_returns_ok() {
    let (status, body) = get_uri(make_state().await, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("ok"));
  }

  #[tokio::test]
  async fn latest_on_empty_store_returns_404() {
    let (status, _) = get_uri(make_state().await, "/api/ledgers/latest").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn latest_returns_seeded_snapshot() {
    let state = make_state().await;
    seed(&state).await;

    let (status, body) = get_uri(state, "/api/ledgers/latest").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("fix login bug"), "body: {body}");
    assert!(body.contains("oc_test"));
  }

  #[tokio::test]
  async fn items_by_date_returns_rows() {
    let state = make_state().await;
    seed(&state).await;

    let (status, body) = get_uri(state, "/api/ledgers/2025-06-03/items").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Alice"), "body: {body}");
  }

  #[tokio::test]
  async fn items_with_unparseable_date_returns_400() {
    let (status, _) = get_uri(make_state().await, "/api/ledgers/not-a-date/items").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn workload_rejects_zero_days() {
    let (status, _) = get_uri(make_state().await, "/api/workload?days=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn analyze_with_half_open_range_returns_400() {
    let (status, body) = post_json(
      make_state().await,
      "/analyze",
      r#"{"start":"2025-06-02T10:30:00Z"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("together"), "body: {body}");
  }

  #[tokio::test]
  async fn analyze_with_inverted_range_returns_400() {
    let (status, _) = post_json(
      make_state().await,
      "/analyze",
      r#"{"start":"2025-06-03T10:30:00Z","end":"2025-06-02T10:30:00Z"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn analyze_with_unreachable_source_returns_502() {
    let (status, body) = post_json(make_state().await, "/analyze", "{}").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("fetch"), "body: {body}");
  }

  #[tokio::test]
  async fn messages_fetch_with_unreachable_source_returns_502() {
    let (status, body) =
      post_json(make_state().await, "/messages/fetch", "{}").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("fetch"), "body: {body}");
  }

  #[tokio::test]
  async fn messages_fetch_with_half_open_range_returns_400() {
    let (status, _) = post_json(
      make_state().await,
      "/messages/fetch",
      r#"{"end":"2025-06-03T10:30:00Z"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn meeting_analyze_rejects_empty_transcript() {
    let (status, body) = post_json(
      make_state().await,
      "/meetings/analyze",
      r#"{"transcript":"   "}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("transcript"), "body: {body}");
  }

  #[tokio::test]
  async fn meeting_analyze_with_unreachable_model_returns_502() {
    let (status, body) = post_json(
      make_state().await,
      "/meetings/analyze",
      r#"{"transcript":"Alice: let's plan Q3."}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("model"), "body: {body}");
  }

  #[tokio::test]
  async fn meeting_save_persists_and_api_lists_it() {
    let state = make_state().await;

    let (status, body) = post_json(
      state.clone(),
      "/meetings/save",
      r#"{
        "summary": {
          "summary": "Q3 planning sync.",
          "participants": ["Alice"],
          "todos": [{"task": "draft roadmap", "assignee": "Alice"}],
          "meeting_type": "planning"
        },
        "transcript": "Alice: let's plan Q3."
      }"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("meeting_id"), "body: {body}");

    let (status, body) = get_uri(state, "/api/meetings").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Q3 planning sync."), "body: {body}");
    assert!(body.contains("draft roadmap"));
    assert!(body.contains("planning"));
  }

  #[tokio::test]
  async fn meetings_list_rejects_zero_limit() {
    let (status, _) = get_uri(make_state().await, "/api/meetings?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[test]
  fn cutover_parses_and_rejects_garbage() {
    let config_ok = default_cutover();
    assert!(NaiveTime::parse_from_str(&config_ok, "%H:%M").is_ok());
    assert!(NaiveTime::parse_from_str("25:99", "%H:%M").is_err());
  }
}
