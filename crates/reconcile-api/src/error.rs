//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use reconcile_core::lifecycle::TransitionError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// A lifecycle guard rejected the transition; the reason is surfaced
  /// verbatim so the client can show a specific banner.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Shape a store error into the right status by walking its source chain:
  /// guard rejections become 409, a missing case becomes 404, anything else
  /// stays an opaque 500.
  pub fn from_store(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
    let mut next: Option<&(dyn std::error::Error + 'static)> = Some(err.as_ref());
    while let Some(e) = next {
      if let Some(t) = e.downcast_ref::<TransitionError>() {
        return ApiError::Conflict(t.to_string());
      }
      if let Some(reconcile_core::Error::CaseNotFound(id)) =
        e.downcast_ref::<reconcile_core::Error>()
      {
        return ApiError::NotFound(format!("case {id} not found"));
      }
      next = e.source();
    }
    ApiError::Store(err)
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
