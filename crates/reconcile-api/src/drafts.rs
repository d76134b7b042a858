//! Handlers for staged assessment drafts.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/cases/:id/drafts/:kind` | 404 when nothing staged |
//! | `PUT`    | `/cases/:id/drafts/:kind` | Body: the assessment payload for `kind` |
//! | `DELETE` | `/cases/:id/drafts/:kind` | Discard one staged fragment |
//! | `POST`   | `/cases/:id/drafts/commit` | Assemble fragments into the case summary |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use reconcile_core::{
  case::CaseRecord,
  draft::{self, DraftFragment, DraftKind, DraftStore},
  store::CaseStore,
};
use uuid::Uuid;

use crate::error::ApiError;

fn parse_kind(kind: &str) -> Result<DraftKind, ApiError> {
  DraftKind::parse(kind).map_err(|e| ApiError::BadRequest(e.to_string()))
}

fn store_err<E: std::error::Error + Send + Sync + 'static>(e: E) -> ApiError {
  ApiError::from_store(Box::new(e))
}

/// `GET /cases/:id/drafts/:kind`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path((id, kind)): Path<(Uuid, String)>,
) -> Result<Json<DraftFragment>, ApiError>
where
  S: DraftStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let kind = parse_kind(&kind)?;
  let fragment = store
    .get_draft(id, kind)
    .await
    .map_err(store_err)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("no staged {} draft for case {id}", kind.as_str()))
    })?;
  Ok(Json(fragment))
}

/// `PUT /cases/:id/drafts/:kind` — body is the bare assessment payload; the
/// kind comes from the path.
pub async fn put_one<S>(
  State(store): State<Arc<S>>,
  Path((id, kind)): Path<(Uuid, String)>,
  Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DraftStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let kind = parse_kind(&kind)?;
  let fragment = match kind {
    DraftKind::FourPs => DraftFragment::FourPs(
      serde_json::from_value(body).map_err(|e| ApiError::BadRequest(e.to_string()))?,
    ),
    DraftKind::TenVs => DraftFragment::TenVs(
      serde_json::from_value(body).map_err(|e| ApiError::BadRequest(e.to_string()))?,
    ),
    DraftKind::Sdoh => DraftFragment::Sdoh(
      serde_json::from_value(body).map_err(|e| ApiError::BadRequest(e.to_string()))?,
    ),
    DraftKind::Crisis => DraftFragment::Crisis(
      serde_json::from_value(body).map_err(|e| ApiError::BadRequest(e.to_string()))?,
    ),
  };

  store.put_draft(id, fragment).await.map_err(store_err)?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /cases/:id/drafts/:kind`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path((id, kind)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DraftStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let kind = parse_kind(&kind)?;
  store.clear_draft(id, kind).await.map_err(store_err)?;
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /cases/:id/drafts/commit` — fold every staged fragment into the
/// case's summary, then discard the fragments. Guarded like any summary
/// edit: committing onto a released or closed row is a 409.
pub async fn commit<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<CaseRecord>, ApiError>
where
  S: CaseStore + DraftStore,
  <S as CaseStore>::Error: std::error::Error + Send + Sync + 'static,
  <S as DraftStore>::Error: std::error::Error + Send + Sync + 'static,
{
  let summary = draft::assemble_summary(store.as_ref(), id, Utc::now())
    .await
    .map_err(store_err)?;
  let case = store.update_summary(id, summary).await.map_err(store_err)?;
  store.clear_drafts(id).await.map_err(store_err)?;
  Ok(Json(case))
}
