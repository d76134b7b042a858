//! Handlers for `/cases` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/cases` | Body: [`NewCase`]; returns 201 + the draft row |
//! | `GET`  | `/cases/:id` | 404 if not found |
//! | `GET`  | `/cases/:id/chain` | Full revision chain, oldest first |
//! | `PUT`  | `/cases/:id/summary` | Body: [`CaseSummary`]; editable rows only |
//! | `POST` | `/cases/:id/mark-ready` `/release` `/revise` `/close` | 409 on guard rejection |
//! | `GET`  | `/cases/:id/resolved` | `{"snapshot": ...}` — null when nothing is released |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use reconcile_core::{
  case::{CaseRecord, NewCase},
  store::{CaseStore, ReleaseOutcome},
  summary::CaseSummary,
};
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;

fn store_err<E: std::error::Error + Send + Sync + 'static>(e: E) -> ApiError {
  ApiError::from_store(Box::new(e))
}

// ─── Create / read ───────────────────────────────────────────────────────────

/// `POST /cases` — returns 201 + the created draft row.
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewCase>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CaseStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let case = store.create_case(body).await.map_err(store_err)?;
  Ok((StatusCode::CREATED, Json(case)))
}

/// `GET /cases/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<CaseRecord>, ApiError>
where
  S: CaseStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let case = store
    .get_case(id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::NotFound(format!("case {id} not found")))?;
  Ok(Json(case))
}

/// `GET /cases/:id/chain`
pub async fn chain<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<CaseRecord>>, ApiError>
where
  S: CaseStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let records = store.chain_records(id).await.map_err(store_err)?;
  if records.is_empty() {
    return Err(ApiError::NotFound(format!("case {id} not found")));
  }
  Ok(Json(records))
}

/// `PUT /cases/:id/summary`
pub async fn update_summary<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(summary): Json<CaseSummary>,
) -> Result<Json<CaseRecord>, ApiError>
where
  S: CaseStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let case = store.update_summary(id, summary).await.map_err(store_err)?;
  Ok(Json(case))
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

/// `POST /cases/:id/mark-ready`
pub async fn mark_ready<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<CaseRecord>, ApiError>
where
  S: CaseStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let case = store.mark_ready(id).await.map_err(store_err)?;
  Ok(Json(case))
}

/// `POST /cases/:id/release` — returns both rows the release produced.
/// Clients must switch their active-case pointer to `draft.case_id`.
pub async fn release<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ReleaseOutcome>, ApiError>
where
  S: CaseStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let outcome = store.release(id).await.map_err(store_err)?;
  Ok(Json(outcome))
}

/// `POST /cases/:id/revise` — returns 201 + the new draft row.
pub async fn revise<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CaseStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let draft = store.revise(id).await.map_err(store_err)?;
  Ok((StatusCode::CREATED, Json(draft)))
}

/// `POST /cases/:id/close`
pub async fn close<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<CaseRecord>, ApiError>
where
  S: CaseStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let case = store.close(id).await.map_err(store_err)?;
  Ok(Json(case))
}

// ─── Resolution ──────────────────────────────────────────────────────────────

/// `GET /cases/:id/resolved` — the attorney-facing read.
///
/// Responds `{"snapshot": <record>}` with the latest released-or-closed
/// version of the chain, or `{"snapshot": null}` when nothing has been
/// released. Editable content is never returned, whatever the chain holds.
pub async fn resolved<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: CaseStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let snapshot = store.resolve_released(id).await.map_err(store_err)?;
  Ok(Json(json!({ "snapshot": snapshot })))
}
