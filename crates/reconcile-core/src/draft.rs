//! Staged assessment drafts.
//!
//! RN edits accumulate as per-assessment fragments keyed by case id and
//! kind, then get assembled into a single [`CaseSummary`] snapshot just
//! before release. The store behind the fragments is an injected interface
//! so browser-local staging can be swapped for server-side storage without
//! touching the resolver or lifecycle core.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  summary::{CaseSummary, CrisisSummary, FourPsSummary, SdohSummary, TenVsSummary},
};

// ─── Kinds and fragments ─────────────────────────────────────────────────────

/// The four assessment fragments a case draft is staged as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftKind {
  FourPs,
  TenVs,
  Sdoh,
  Crisis,
}

impl DraftKind {
  pub const ALL: [Self; 4] = [Self::FourPs, Self::TenVs, Self::Sdoh, Self::Crisis];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::FourPs => "four_ps",
      Self::TenVs => "ten_vs",
      Self::Sdoh => "sdoh",
      Self::Crisis => "crisis",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "four_ps" => Ok(Self::FourPs),
      "ten_vs" => Ok(Self::TenVs),
      "sdoh" => Ok(Self::Sdoh),
      "crisis" => Ok(Self::Crisis),
      other => Err(Error::UnknownDraftKind(other.to_string())),
    }
  }
}

/// A staged assessment fragment. The variant tag doubles as the storage
/// discriminant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum DraftFragment {
  FourPs(FourPsSummary),
  TenVs(TenVsSummary),
  Sdoh(SdohSummary),
  Crisis(CrisisSummary),
}

impl DraftFragment {
  pub fn kind(&self) -> DraftKind {
    match self {
      Self::FourPs(_) => DraftKind::FourPs,
      Self::TenVs(_) => DraftKind::TenVs,
      Self::Sdoh(_) => DraftKind::Sdoh,
      Self::Crisis(_) => DraftKind::Crisis,
    }
  }
}

// ─── DraftStore ──────────────────────────────────────────────────────────────

/// Abstraction over staged-draft persistence, keyed by case id and fragment
/// kind. A fragment put replaces any previous fragment of the same kind.
pub trait DraftStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn get_draft(
    &self,
    case_id: Uuid,
    kind: DraftKind,
  ) -> impl Future<Output = Result<Option<DraftFragment>, Self::Error>> + Send + '_;

  fn put_draft(
    &self,
    case_id: Uuid,
    fragment: DraftFragment,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn clear_draft(
    &self,
    case_id: Uuid,
    kind: DraftKind,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Clear every staged fragment for a case, e.g. after its summary has been
  /// committed to the case row.
  fn clear_drafts(
    &self,
    case_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Assembly ────────────────────────────────────────────────────────────────

/// Gather all staged fragments for `case_id` into one snapshot. Missing
/// fragments stay `None`; the publish surface renders those as "not yet
/// scored" rather than failing.
pub async fn assemble_summary<D: DraftStore>(
  drafts: &D,
  case_id: Uuid,
  now: DateTime<Utc>,
) -> Result<CaseSummary, D::Error> {
  let mut summary = CaseSummary { updated_at: Some(now), ..CaseSummary::default() };

  for kind in DraftKind::ALL {
    match drafts.get_draft(case_id, kind).await? {
      Some(DraftFragment::FourPs(s)) => summary.four_ps = Some(s),
      Some(DraftFragment::TenVs(s)) => summary.ten_vs = Some(s),
      Some(DraftFragment::Sdoh(s)) => summary.sdoh = Some(s),
      Some(DraftFragment::Crisis(s)) => summary.crisis = Some(s),
      None => {}
    }
  }

  Ok(summary)
}

// ─── In-memory implementation ────────────────────────────────────────────────

/// A process-local [`DraftStore`] — useful for tests and single-session
/// tools. Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct MemoryDraftStore {
  inner: Arc<Mutex<HashMap<(Uuid, DraftKind), DraftFragment>>>,
}

impl MemoryDraftStore {
  pub fn new() -> Self { Self::default() }

  fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(Uuid, DraftKind), DraftFragment>> {
    // A poisoned lock means a panic mid-insert; the map itself is still
    // structurally sound.
    self.inner.lock().unwrap_or_else(|e| e.into_inner())
  }
}

impl DraftStore for MemoryDraftStore {
  type Error = std::convert::Infallible;

  async fn get_draft(
    &self,
    case_id: Uuid,
    kind: DraftKind,
  ) -> Result<Option<DraftFragment>, Self::Error> {
    Ok(self.lock().get(&(case_id, kind)).cloned())
  }

  async fn put_draft(
    &self,
    case_id: Uuid,
    fragment: DraftFragment,
  ) -> Result<(), Self::Error> {
    self.lock().insert((case_id, fragment.kind()), fragment);
    Ok(())
  }

  async fn clear_draft(&self, case_id: Uuid, kind: DraftKind) -> Result<(), Self::Error> {
    self.lock().remove(&(case_id, kind));
    Ok(())
  }

  async fn clear_drafts(&self, case_id: Uuid) -> Result<(), Self::Error> {
    self.lock().retain(|(id, _), _| *id != case_id);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::summary::{DimensionScore, SeverityScore, four_ps_overall};

  fn four_ps_fragment() -> DraftFragment {
    let dimensions = vec![
      DimensionScore { id: "physical".into(), score: SeverityScore::new(2), note: None },
      DimensionScore { id: "psychological".into(), score: SeverityScore::new(4), note: None },
    ];
    let overall = four_ps_overall(&dimensions);
    DraftFragment::FourPs(FourPsSummary { dimensions, overall, narrative: None })
  }

  #[tokio::test]
  async fn put_replaces_fragment_of_same_kind() {
    let store = MemoryDraftStore::new();
    let case_id = Uuid::new_v4();

    store.put_draft(case_id, four_ps_fragment()).await.unwrap();
    store
      .put_draft(
        case_id,
        DraftFragment::FourPs(FourPsSummary { narrative: Some("worse".into()), ..Default::default() }),
      )
      .await
      .unwrap();

    let got = store.get_draft(case_id, DraftKind::FourPs).await.unwrap().unwrap();
    assert!(matches!(
      got,
      DraftFragment::FourPs(FourPsSummary { narrative: Some(n), .. }) if n == "worse"
    ));
  }

  #[tokio::test]
  async fn assemble_collects_staged_fragments_only() {
    let store = MemoryDraftStore::new();
    let case_id = Uuid::new_v4();
    let now = Utc::now();

    store.put_draft(case_id, four_ps_fragment()).await.unwrap();
    store
      .put_draft(case_id, DraftFragment::Crisis(CrisisSummary::default()))
      .await
      .unwrap();

    let summary = assemble_summary(&store, case_id, now).await.unwrap();
    assert!(summary.four_ps.is_some());
    assert!(summary.crisis.is_some());
    assert!(summary.ten_vs.is_none());
    assert!(summary.sdoh.is_none());
    assert_eq!(summary.updated_at, Some(now));
  }

  #[tokio::test]
  async fn clear_drafts_scopes_to_one_case() {
    let store = MemoryDraftStore::new();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    store.put_draft(a, four_ps_fragment()).await.unwrap();
    store.put_draft(b, four_ps_fragment()).await.unwrap();
    store.clear_drafts(a).await.unwrap();

    assert!(store.get_draft(a, DraftKind::FourPs).await.unwrap().is_none());
    assert!(store.get_draft(b, DraftKind::FourPs).await.unwrap().is_some());
  }
}
