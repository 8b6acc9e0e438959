//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use wrench_core::ErrorCode;

/// An error returned by an API handler.
///
/// Bodies are `{"code": ..., "message": ..., "field": ...}`, with `field`
/// present only for validation and conflict errors.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub wrench_core::Error);

impl ApiError {
  /// Lift a store error into the core taxonomy.
  pub fn from_store<E: Into<wrench_core::Error>>(err: E) -> Self { Self(err.into()) }

  pub fn status(&self) -> StatusCode {
    match self.0.code() {
      ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
      ErrorCode::NotFound => StatusCode::NOT_FOUND,
      ErrorCode::Forbidden => StatusCode::FORBIDDEN,
      ErrorCode::Conflict => StatusCode::CONFLICT,
      ErrorCode::DegradedConsistency => StatusCode::INTERNAL_SERVER_ERROR,
      ErrorCode::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
  }
}

// ─── Extractor rejections ─────────────────────────────────────────────────────

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    let message = match &rejection {
      JsonRejection::JsonDataError(e) => detail(&e.body_text()),
      JsonRejection::JsonSyntaxError(e) => detail(&e.body_text()),
      other => other.body_text(),
    };
    Self(wrench_core::Error::validation("body", message))
  }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self {
    Self(wrench_core::Error::validation("id", rejection.body_text()))
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    Self(wrench_core::Error::validation("query", detail(&rejection.body_text())))
  }
}

/// Strip axum's "Failed to ..." preamble, keeping the serde message.
fn detail(text: &str) -> String {
  text.split_once(": ").map_or(text, |(_, rest)| rest).to_owned()
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let code = self.0.code();
    let message = match &self.0 {
      wrench_core::Error::StorageUnavailable(detail) => {
        tracing::error!(detail = %detail, "storage unavailable");
        "storage is temporarily unavailable".to_owned()
      }
      wrench_core::Error::DegradedConsistency(write) => {
        tracing::error!(write = %write, "degraded consistency surfaced to a handler");
        "internal error".to_owned()
      }
      other => other.to_string(),
    };

    let mut body = json!({ "code": code.as_ref(), "message": message });
    if let Some(field) = self.0.field() {
      body["field"] = json!(field);
    }
    (status, Json(body)).into_response()
  }
}
