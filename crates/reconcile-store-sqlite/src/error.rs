//! Error type for `reconcile-store-sqlite`.

use reconcile_core::lifecycle::TransitionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] reconcile_core::Error),

  #[error("transition rejected: {0}")]
  Transition(#[from] TransitionError),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("column decode error: {0}")]
  Decode(String),
}

impl Error {
  /// The typed not-found error, shaped so callers can recover the case id
  /// from the error source chain.
  pub fn case_not_found(case_id: uuid::Uuid) -> Self {
    Self::Core(reconcile_core::Error::CaseNotFound(case_id))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
