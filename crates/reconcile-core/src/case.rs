//! Case records — one row per version of a case.
//!
//! A case is never edited in place once released. New versions are new rows
//! linked to their predecessor through `revision_of_id`, forming a revision
//! chain rooted at the record whose `revision_of_id` is `None`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, summary::CaseSummary};

// ─── Status ──────────────────────────────────────────────────────────────────

/// The lifecycle status of a case version.
///
/// `Draft`, `Working`, and `Revised` are editable and not yet eligible for
/// release. `Ready` is editable but release-eligible. `Released` and `Closed`
/// are immutable; `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
  Draft,
  Working,
  Revised,
  Ready,
  Released,
  Closed,
}

impl CaseStatus {
  /// True for statuses an RN may still edit.
  pub fn is_editable(self) -> bool { !self.is_immutable() }

  /// True for statuses that may be marked ready.
  pub fn is_markable(self) -> bool {
    matches!(self, Self::Draft | Self::Working | Self::Revised)
  }

  /// True once the row may never change again (except `close` on `released`).
  pub fn is_immutable(self) -> bool {
    matches!(self, Self::Released | Self::Closed)
  }

  /// True for the statuses an attorney-facing read may ever be satisfied by.
  pub fn is_attorney_visible(self) -> bool {
    matches!(self, Self::Released | Self::Closed)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Draft => "draft",
      Self::Working => "working",
      Self::Revised => "revised",
      Self::Ready => "ready",
      Self::Released => "released",
      Self::Closed => "closed",
    }
  }

  /// Case-insensitive parser; stored rows sometimes carry mixed-case strings.
  pub fn parse(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "draft" => Ok(Self::Draft),
      "working" => Ok(Self::Working),
      "revised" => Ok(Self::Revised),
      "ready" => Ok(Self::Ready),
      "released" => Ok(Self::Released),
      "closed" => Ok(Self::Closed),
      other => Err(Error::UnknownStatus(other.to_string())),
    }
  }
}

impl std::fmt::Display for CaseStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── CaseRecord ──────────────────────────────────────────────────────────────

/// A single version of a case.
///
/// All four timestamps are optional so the resolver can operate over
/// arbitrary record sets, including malformed imports; the store always
/// populates `created_at` and `updated_at` on rows it writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseRecord {
  pub case_id:        Uuid,
  /// Parent pointer; `None` marks a chain root.
  pub revision_of_id: Option<Uuid>,
  pub status:         CaseStatus,
  pub released_at:    Option<DateTime<Utc>>,
  pub closed_at:      Option<DateTime<Utc>>,
  pub updated_at:     Option<DateTime<Utc>>,
  pub created_at:     Option<DateTime<Utc>>,
  pub case_type:      Option<String>,
  pub jurisdiction:   Option<String>,
  pub date_of_injury: Option<NaiveDate>,
  pub client_id:      Option<Uuid>,
  pub attorney_id:    Option<Uuid>,
  /// Clinical payload (4Ps / 10-Vs / SDOH / Crisis snapshot). Carried along
  /// but never interpreted by the resolver.
  pub summary:        CaseSummary,
}

impl CaseRecord {
  /// The single ordering value the resolver compares records by.
  ///
  /// Strict precedence: `closed_at`, then `released_at`, then `updated_at`,
  /// then `created_at`, else the Unix epoch. A closed case's `closed_at` must
  /// outrank a later `updated_at` touched by unrelated bookkeeping.
  pub fn effective_timestamp(&self) -> DateTime<Utc> {
    self
      .closed_at
      .or(self.released_at)
      .or(self.updated_at)
      .or(self.created_at)
      .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
  }
}

// ─── NewCase ─────────────────────────────────────────────────────────────────

/// Input to [`crate::store::CaseStore::create_case`]. The id, status, and
/// timestamps are always set by the store; they are not accepted from callers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCase {
  pub case_type:      Option<String>,
  pub jurisdiction:   Option<String>,
  pub date_of_injury: Option<NaiveDate>,
  pub client_id:      Option<Uuid>,
  pub attorney_id:    Option<Uuid>,
  #[serde(default)]
  pub summary:        CaseSummary,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_parse_is_case_insensitive() {
    assert_eq!(CaseStatus::parse("Released").unwrap(), CaseStatus::Released);
    assert_eq!(CaseStatus::parse(" CLOSED ").unwrap(), CaseStatus::Closed);
    assert_eq!(CaseStatus::parse("draft").unwrap(), CaseStatus::Draft);
    assert!(CaseStatus::parse("published").is_err());
  }

  #[test]
  fn timestamp_precedence_closed_outranks_updated() {
    let record = CaseRecord {
      case_id:        Uuid::new_v4(),
      revision_of_id: None,
      status:         CaseStatus::Closed,
      released_at:    None,
      closed_at:      Some("2024-01-01T00:00:00Z".parse().unwrap()),
      updated_at:     Some("2024-06-01T00:00:00Z".parse().unwrap()),
      created_at:     Some("2023-01-01T00:00:00Z".parse().unwrap()),
      case_type:      None,
      jurisdiction:   None,
      date_of_injury: None,
      client_id:      None,
      attorney_id:    None,
      summary:        CaseSummary::default(),
    };
    assert_eq!(
      record.effective_timestamp(),
      "2024-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap()
    );
  }

  #[test]
  fn timestamp_falls_back_to_epoch() {
    let record = CaseRecord {
      case_id:        Uuid::new_v4(),
      revision_of_id: None,
      status:         CaseStatus::Draft,
      released_at:    None,
      closed_at:      None,
      updated_at:     None,
      created_at:     None,
      case_type:      None,
      jurisdiction:   None,
      date_of_injury: None,
      client_id:      None,
      attorney_id:    None,
      summary:        CaseSummary::default(),
    };
    assert_eq!(record.effective_timestamp(), DateTime::<Utc>::UNIX_EPOCH);
  }
}
