//! The [`CaseStore`] abstraction.
//!
//! Everything the HTTP layer does to case rows goes through this trait, so
//! the resolver and lifecycle semantics can be tested against an in-memory
//! store and served from SQLite with the same code path. Lifecycle
//! operations are transactional: `release` either lands both of its rows or
//! neither.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  case::{CaseRecord, NewCase},
  summary::CaseSummary,
};

// ─── Release outcome ─────────────────────────────────────────────────────────

/// The two rows a successful release produces: the immutable released
/// version and the fresh working draft descending from it.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseOutcome {
  pub released: CaseRecord,
  pub draft:    CaseRecord,
}

// ─── Export audit ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportAction {
  Download,
  Print,
}

impl ExportAction {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Download => "download",
      Self::Print => "print",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
  Pdf,
  Text,
}

impl ExportFormat {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pdf => "pdf",
      Self::Text => "text",
    }
  }
}

/// Input for one export-audit entry. `case_id` is the version that was
/// actually exported; the store derives the chain root itself so audit
/// queries can group every export of a case regardless of which revision
/// was current at the time.
#[derive(Debug, Clone, Deserialize)]
pub struct NewExportAudit {
  pub case_id:     Uuid,
  pub action:      ExportAction,
  pub format:      ExportFormat,
  /// Display label or file name of the exported artifact.
  pub label:       Option<String>,
  pub exported_by: Option<String>,
}

/// One recorded export of a released case version.
#[derive(Debug, Clone, Serialize)]
pub struct ExportAudit {
  pub id:            Uuid,
  pub case_id:       Uuid,
  /// Root of the revision chain `case_id` belongs to. Falls back to
  /// `case_id` itself when the chain cannot be walked.
  pub chain_root_id: Uuid,
  pub action:        ExportAction,
  pub format:        ExportFormat,
  pub label:         Option<String>,
  pub exported_by:   Option<String>,
  pub exported_at:   DateTime<Utc>,
}

// ─── CaseStore ───────────────────────────────────────────────────────────────

/// Abstraction over case persistence and lifecycle.
///
/// Guarded transitions (`mark_ready`, `release`, `revise`, `close`,
/// `update_summary`) must check the current status atomically with the
/// write; callers racing each other get at most one winner.
pub trait CaseStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert a new draft case and return it with store-assigned identity
  /// and timestamps.
  fn create_case(
    &self,
    new_case: NewCase,
  ) -> impl Future<Output = Result<CaseRecord, Self::Error>> + Send + '_;

  fn get_case(
    &self,
    case_id: Uuid,
  ) -> impl Future<Output = Result<Option<CaseRecord>, Self::Error>> + Send + '_;

  /// Every record in the revision chain `case_id` belongs to, root first.
  fn chain_records(
    &self,
    case_id: Uuid,
  ) -> impl Future<Output = Result<Vec<CaseRecord>, Self::Error>> + Send + '_;

  /// Replace the clinical summary of an editable case.
  fn update_summary(
    &self,
    case_id: Uuid,
    summary: CaseSummary,
  ) -> impl Future<Output = Result<CaseRecord, Self::Error>> + Send + '_;

  /// Move an editable case to `ready`.
  fn mark_ready(
    &self,
    case_id: Uuid,
  ) -> impl Future<Output = Result<CaseRecord, Self::Error>> + Send + '_;

  /// Publish a `ready` case: insert the immutable released version plus a
  /// fresh working draft, atomically.
  fn release(
    &self,
    case_id: Uuid,
  ) -> impl Future<Output = Result<ReleaseOutcome, Self::Error>> + Send + '_;

  /// Open a new revision draft from a released case. Also the recovery path
  /// when a release's companion draft was lost: revising the released row
  /// again yields a fresh editable descendant.
  fn revise(
    &self,
    case_id: Uuid,
  ) -> impl Future<Output = Result<CaseRecord, Self::Error>> + Send + '_;

  /// Close a released case, freezing the chain at that version.
  fn close(
    &self,
    case_id: Uuid,
  ) -> impl Future<Output = Result<CaseRecord, Self::Error>> + Send + '_;

  /// The latest attorney-visible version of the chain `case_id` belongs to,
  /// or `None` when nothing in the chain has been released.
  fn resolve_released(
    &self,
    case_id: Uuid,
  ) -> impl Future<Output = Result<Option<CaseRecord>, Self::Error>> + Send + '_;

  /// Record an export. Best effort at the call site: a failed audit write
  /// must never block the export itself.
  fn log_export(
    &self,
    entry: NewExportAudit,
  ) -> impl Future<Output = Result<ExportAudit, Self::Error>> + Send + '_;

  /// All export-audit entries for the chain `case_id` belongs to, newest
  /// first.
  fn list_exports(
    &self,
    case_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ExportAudit>, Self::Error>> + Send + '_;
}
