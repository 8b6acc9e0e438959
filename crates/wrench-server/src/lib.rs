//! HTTP server for Wrench.
//!
//! Wraps the [`wrench_api`] router with Basic authentication, request
//! tracing and an unauthenticated liveness probe.

pub mod auth;
pub mod error;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{Json, Router, middleware, routing::get};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use wrench_core::{
  AccessPolicy,
  cache::QueryCache,
  derived::ReconcileReport,
  reminder::DueWindow,
  store::MaintenanceStore,
};

use auth::{AuthConfig, UserCredentials, require_auth};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `WRENCH_*` environment variables.
#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                    String,
  #[serde(default = "default_port")]
  pub port:                    u16,
  #[serde(default = "default_store_path")]
  pub store_path:              PathBuf,
  #[serde(default)]
  pub access_policy:           AccessPolicy,
  /// Zero disables the read cache.
  #[serde(default = "default_cache_ttl_secs")]
  pub cache_ttl_secs:          u64,
  #[serde(default = "default_horizon_days")]
  pub reminder_horizon_days:   u64,
  #[serde(default = "default_mileage_margin")]
  pub reminder_mileage_margin: i64,
  #[serde(default)]
  pub users:                   Vec<UserCredentials>,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/wrench/wrench.db") }

fn default_cache_ttl_secs() -> u64 { 30 }

fn default_horizon_days() -> u64 { DueWindow::default().horizon_days }

fn default_mileage_margin() -> i64 { DueWindow::default().mileage_margin }

impl ServerConfig {
  pub fn due_window(&self) -> DueWindow {
    DueWindow {
      horizon_days:   self.reminder_horizon_days,
      mileage_margin: self.reminder_mileage_margin,
    }
  }

  pub fn cache_ttl(&self) -> Duration { Duration::from_secs(self.cache_ttl_secs) }

  pub fn auth(&self) -> AuthConfig { AuthConfig { users: self.users.clone() } }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Everything the router needs.
pub struct AppState<S> {
  pub store: Arc<S>,
  pub cache: Arc<QueryCache>,
  pub auth:  Arc<AuthConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), cache: self.cache.clone(), auth: self.auth.clone() }
  }
}

// ─── Startup ──────────────────────────────────────────────────────────────────

/// Repair derived state left stale by an earlier run.
///
/// A failed sweep is logged and the server keeps starting; requests still
/// succeed and the next restart tries again.
pub async fn reconcile_on_startup<S: MaintenanceStore>(store: &S) -> Option<ReconcileReport> {
  match store.reconcile().await {
    Ok(report) => {
      tracing::info!(
        event_totals = report.event_totals,
        vehicle_mileages = report.vehicle_mileages,
        "startup reconcile complete"
      );
      Some(report)
    }
    Err(err) => {
      tracing::error!(error = %err, "startup reconcile failed, continuing with stale derived state");
      None
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the server's axum [`Router`]: `/health` plus the authenticated API
/// under `/api`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: MaintenanceStore + 'static,
{
  let api = wrench_api::api_router(state.store, state.cache)
    .layer(middleware::from_fn_with_state(state.auth, require_auth));

  Router::new()
    .route("/health", get(health))
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
  use tower::ServiceExt as _;
  use wrench_store_sqlite::SqliteStore;

  use super::*;
  use crate::auth::hash_password;

  async fn make_state() -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let users = ["alice", "bob"]
      .into_iter()
      .map(|name| UserCredentials {
        username:      name.to_string(),
        password_hash: hash_password("secret").unwrap(),
      })
      .collect();
    AppState {
      store: Arc::new(store),
      cache: Arc::new(QueryCache::new(Duration::from_secs(30))),
      auth:  Arc::new(AuthConfig { users }),
    }
  }

  fn auth_header(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  async fn oneshot_raw(
    state: AppState<SqliteStore>,
    method: &str,
    uri: &str,
    auth: Option<(&str, &str)>,
    body: &str,
  ) -> axum::response::Response {
    let mut builder = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json");
    if let Some((user, pass)) = auth {
      builder = builder.header(header::AUTHORIZATION, auth_header(user, pass));
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();
    router(state).oneshot(req).await.unwrap()
  }

  async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  #[tokio::test]
  async fn health_needs_no_credentials() {
    let state = make_state().await;
    let resp = oneshot_raw(state, "GET", "/health", None, "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["status"], "ok");
  }

  #[tokio::test]
  async fn api_requires_credentials() {
    let state = make_state().await;
    let resp = oneshot_raw(state.clone(), "GET", "/api/vehicles", None, "").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let challenge = resp.headers().get(header::WWW_AUTHENTICATE).unwrap();
    assert!(challenge.to_str().unwrap().starts_with("Basic"));

    let resp =
      oneshot_raw(state, "GET", "/api/vehicles", Some(("alice", "wrong")), "").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn authenticated_user_owns_what_they_create() {
    let state = make_state().await;
    let body = r#"{"make":"Toyota","model":"Camry","year":2020,"current_mileage":50000}"#;
    let resp =
      oneshot_raw(state.clone(), "POST", "/api/vehicles", Some(("alice", "secret")), body).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let vehicle = json_body(resp).await;
    assert_eq!(vehicle["owner"], "alice");
    let uri = format!("/api/vehicles/{}", vehicle["vehicle_id"].as_str().unwrap());

    let resp = oneshot_raw(state.clone(), "GET", &uri, Some(("alice", "secret")), "").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = oneshot_raw(state, "GET", &uri, Some(("bob", "secret")), "").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn startup_reconcile_failure_does_not_stop_the_server() {
    let path = std::env::temp_dir().join(format!("wrench-startup-{}.db", std::process::id()));
    let store = SqliteStore::open(&path).await.unwrap();
    assert!(reconcile_on_startup(&store).await.unwrap().is_clean());

    rusqlite::Connection::open(&path)
      .unwrap()
      .execute_batch("DROP TABLE service_items")
      .unwrap();
    assert!(store.reconcile().await.is_err());
    assert!(reconcile_on_startup(&store).await.is_none());

    drop(store);
    for suffix in ["", "-wal", "-shm"] {
      let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
  }

  #[test]
  fn config_defaults_and_overrides() {
    let toml = r#"
      port = 9000
      access_policy = "distinguish"
      reminder_horizon_days = 30

      [[users]]
      username = "alice"
      password_hash = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"
    "#;
    let cfg: ServerConfig = config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();

    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.access_policy, AccessPolicy::Distinguish);
    assert_eq!(cfg.due_window(), DueWindow { horizon_days: 30, mileage_margin: 500 });
    assert_eq!(cfg.cache_ttl(), Duration::from_secs(30));
    assert_eq!(cfg.auth().users.len(), 1);
  }
}
