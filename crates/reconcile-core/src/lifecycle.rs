//! The case lifecycle state machine.
//!
//! Editable statuses (`draft`, `working`, `revised`, `ready`) flow toward
//! `released`; a release freezes the payload into a new immutable row and
//! spawns a fresh draft descending from it. `closed` is terminal.
//!
//! The guards here are pure: they validate a transition and plan its row
//! constructions without touching storage. Storage backends call them and
//! are the only code path permitted to flip a row into `released` or
//! `closed`.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::case::{CaseRecord, CaseStatus};

// ─── Rejections ──────────────────────────────────────────────────────────────

/// A rejected lifecycle transition. The message is the user-facing reason and
/// is surfaced verbatim by the API; transitions are never retried
/// automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
  #[error("only draft, working, or revised cases can be marked ready (case is {0})")]
  NotMarkable(CaseStatus),

  #[error("release requires the case to be marked ready first (case is {0})")]
  NotReady(CaseStatus),

  #[error("only released cases can be revised (case is {0})")]
  NotRevisable(CaseStatus),

  #[error("only released cases can be closed (case is {0})")]
  NotClosable(CaseStatus),

  #[error("case is {0} and can no longer be edited")]
  Immutable(CaseStatus),

  /// A planned row came out of construction with release-identity fields
  /// still set. Detected before commit; never silently accepted.
  #[error("internal consistency error: {0}")]
  Inconsistent(String),
}

// ─── Guards ──────────────────────────────────────────────────────────────────

/// `draft`/`working`/`revised` → `ready`. The explicit human checkpoint
/// before anything becomes attorney-visible.
pub fn check_mark_ready(case: &CaseRecord) -> Result<(), TransitionError> {
  if case.status.is_markable() {
    Ok(())
  } else {
    Err(TransitionError::NotMarkable(case.status))
  }
}

/// Payload edits are legal on any editable status and nothing else.
pub fn check_update(case: &CaseRecord) -> Result<(), TransitionError> {
  if case.status.is_editable() {
    Ok(())
  } else {
    Err(TransitionError::Immutable(case.status))
  }
}

/// `released` → `closed`, the one allowed in-place mutation of an immutable
/// row. No further transitions are legal afterwards.
pub fn check_close(case: &CaseRecord) -> Result<(), TransitionError> {
  if case.status == CaseStatus::Released {
    Ok(())
  } else {
    Err(TransitionError::NotClosable(case.status))
  }
}

// ─── Release planning ────────────────────────────────────────────────────────

/// The two rows a `release` transition inserts: the frozen snapshot and the
/// fresh draft descending from it.
#[derive(Debug, Clone)]
pub struct ReleasePlan {
  pub released: CaseRecord,
  pub draft:    CaseRecord,
}

/// Plan a `release` of `case`: a new immutable row referencing `case` as its
/// parent, plus a new editable draft referencing the released row.
///
/// Only legal from `ready`. Every release-identity field on the draft is
/// explicitly reset rather than copied from the parent, and the plan is
/// re-validated after construction — a draft that somehow carries a released
/// status or timestamp aborts the transition as an internal-consistency
/// error instead of leaking into storage.
pub fn plan_release(
  case: &CaseRecord,
  now: DateTime<Utc>,
) -> Result<ReleasePlan, TransitionError> {
  if case.status != CaseStatus::Ready {
    return Err(TransitionError::NotReady(case.status));
  }

  let released = CaseRecord {
    case_id:        Uuid::new_v4(),
    revision_of_id: Some(case.case_id),
    status:         CaseStatus::Released,
    released_at:    Some(now),
    closed_at:      None,
    updated_at:     Some(now),
    created_at:     Some(now),
    case_type:      case.case_type.clone(),
    jurisdiction:   case.jurisdiction.clone(),
    date_of_injury: case.date_of_injury,
    client_id:      case.client_id,
    attorney_id:    case.attorney_id,
    summary:        case.summary.clone(),
  };

  let draft = CaseRecord {
    case_id:        Uuid::new_v4(),
    revision_of_id: Some(released.case_id),
    status:         CaseStatus::Draft,
    // Reset, not copied: a draft must never carry release identity.
    released_at:    None,
    closed_at:      None,
    updated_at:     Some(now),
    created_at:     Some(now),
    case_type:      case.case_type.clone(),
    jurisdiction:   case.jurisdiction.clone(),
    date_of_injury: case.date_of_injury,
    client_id:      case.client_id,
    attorney_id:    case.attorney_id,
    summary:        case.summary.clone(),
  };

  let plan = ReleasePlan { released, draft };
  verify_release_plan(&plan)?;
  Ok(plan)
}

/// Construct-then-validate check on a [`ReleasePlan`] before it is committed.
pub fn verify_release_plan(plan: &ReleasePlan) -> Result<(), TransitionError> {
  if plan.released.status != CaseStatus::Released {
    return Err(TransitionError::Inconsistent(format!(
      "planned release row has status {}", plan.released.status
    )));
  }
  if plan.released.released_at.is_none() {
    return Err(TransitionError::Inconsistent(
      "planned release row is missing released_at".to_string(),
    ));
  }
  if plan.draft.status != CaseStatus::Draft {
    return Err(TransitionError::Inconsistent(format!(
      "planned draft row has status {}", plan.draft.status
    )));
  }
  if plan.draft.released_at.is_some() || plan.draft.closed_at.is_some() {
    return Err(TransitionError::Inconsistent(
      "planned draft row carries release identity".to_string(),
    ));
  }
  if plan.draft.revision_of_id != Some(plan.released.case_id) {
    return Err(TransitionError::Inconsistent(
      "planned draft row does not descend from the released row".to_string(),
    ));
  }
  Ok(())
}

/// Plan a `revise` of a released `case`: one new draft row referencing it,
/// with the clinical payload copied forward. Also the recovery path when a
/// release lost its companion draft: revising the released row re-establishes
/// an editable draft.
pub fn plan_revision(
  case: &CaseRecord,
  now: DateTime<Utc>,
) -> Result<CaseRecord, TransitionError> {
  if case.status != CaseStatus::Released {
    return Err(TransitionError::NotRevisable(case.status));
  }

  Ok(CaseRecord {
    case_id:        Uuid::new_v4(),
    revision_of_id: Some(case.case_id),
    status:         CaseStatus::Draft,
    released_at:    None,
    closed_at:      None,
    updated_at:     Some(now),
    created_at:     Some(now),
    case_type:      case.case_type.clone(),
    jurisdiction:   case.jurisdiction.clone(),
    date_of_injury: case.date_of_injury,
    client_id:      case.client_id,
    attorney_id:    case.attorney_id,
    summary:        case.summary.clone(),
  })
}
