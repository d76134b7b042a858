//! Handlers for the export-audit log.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/exports` | Body: [`NewExportAudit`]; returns 201 + the entry |
//! | `GET`  | `/exports?case_id=<id>` | All exports for that case's chain, newest first |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use reconcile_core::store::{CaseStore, ExportAudit, ExportFormat, NewExportAudit};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

fn store_err<E: std::error::Error + Send + Sync + 'static>(e: E) -> ApiError {
  ApiError::from_store(Box::new(e))
}

/// Default artifact label when the client did not supply one.
fn default_label(case_id: Uuid, format: ExportFormat) -> String {
  let short = &case_id.simple().to_string()[..8];
  let ext = match format {
    ExportFormat::Pdf => "pdf",
    ExportFormat::Text => "txt",
  };
  format!("case-{short}.{ext}")
}

/// `POST /exports` — returns 201 + the recorded entry.
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(mut body): Json<NewExportAudit>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CaseStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if body.label.is_none() {
    body.label = Some(default_label(body.case_id, body.format));
  }
  let audit = store.log_export(body).await.map_err(store_err)?;
  Ok((StatusCode::CREATED, Json(audit)))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// Any member of the chain whose exports to list.
  pub case_id: Uuid,
}

/// `GET /exports?case_id=<id>`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<ExportAudit>>, ApiError>
where
  S: CaseStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let exports = store.list_exports(params.case_id).await.map_err(store_err)?;
  Ok(Json(exports))
}
