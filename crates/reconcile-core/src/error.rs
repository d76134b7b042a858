//! Error types for `reconcile-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::lifecycle::TransitionError;

#[derive(Debug, Error)]
pub enum Error {
  #[error("case not found: {0}")]
  CaseNotFound(Uuid),

  #[error("unknown case status: {0:?}")]
  UnknownStatus(String),

  #[error("unknown draft kind: {0:?}")]
  UnknownDraftKind(String),

  #[error(transparent)]
  Transition(#[from] TransitionError),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
