//! Revision-chain resolution.
//!
//! Pure, synchronous functions over an in-memory set of [`CaseRecord`]s.
//! The resolver enforces the central confidentiality guarantee of the
//! system: an attorney-facing read is never satisfied by an editable record.
//! Malformed data (cycles, dangling parents, self-references) is contained
//! here with visited-set bounding and resolved to a best-effort answer
//! rather than an error or an unbounded walk.

use std::collections::{HashMap, HashSet, VecDeque};

use uuid::Uuid;

use crate::case::CaseRecord;

/// Walk `revision_of_id` upward from `start_id` to the chain root.
///
/// Returns `None` only when the start record is absent from `records`.
/// A parent id that is not present is treated as if the current node were
/// the root; a cycle terminates at the last node before re-entry. A
/// self-referencing record is its own root.
pub fn find_chain_root(records: &[CaseRecord], start_id: Uuid) -> Option<Uuid> {
  let by_id: HashMap<Uuid, &CaseRecord> =
    records.iter().map(|r| (r.case_id, r)).collect();

  let mut current = *by_id.get(&start_id)?;
  let mut visited = HashSet::from([current.case_id]);

  while let Some(parent_id) = current.revision_of_id {
    if visited.contains(&parent_id) {
      tracing::warn!(case_id = %current.case_id, parent_id = %parent_id,
        "revision chain cycle detected; treating current node as root");
      break;
    }
    match by_id.get(&parent_id) {
      Some(parent) => {
        visited.insert(parent_id);
        current = parent;
      }
      // Dangling parent reference: the current node is the effective root.
      None => break,
    }
  }

  Some(current.case_id)
}

/// The immutable root identity of a chain, independent of release state.
/// Used by export-audit logging, which must attribute every export to a
/// chain rather than to one of its versions.
pub fn chain_root_id(records: &[CaseRecord], start_id: Uuid) -> Option<Uuid> {
  find_chain_root(records, start_id)
}

/// Breadth-first collection of every record reachable downward from `root_id`.
/// The visited set guarantees termination even with duplicate or cyclic
/// parent edges.
pub fn collect_chain(records: &[CaseRecord], root_id: Uuid) -> Vec<&CaseRecord> {
  let mut children: HashMap<Uuid, Vec<&CaseRecord>> = HashMap::new();
  for record in records {
    if let Some(parent) = record.revision_of_id {
      children.entry(parent).or_default().push(record);
    }
  }

  let by_id: HashMap<Uuid, &CaseRecord> =
    records.iter().map(|r| (r.case_id, r)).collect();

  let mut chain = Vec::new();
  let mut visited = HashSet::new();
  let mut queue = VecDeque::new();

  if let Some(root) = by_id.get(&root_id) {
    visited.insert(root_id);
    queue.push_back(*root);
  }

  while let Some(record) = queue.pop_front() {
    chain.push(record);
    if let Some(kids) = children.get(&record.case_id) {
      for kid in kids {
        if visited.insert(kid.case_id) {
          queue.push_back(kid);
        }
      }
    }
  }

  chain
}

/// Resolve the single record in `start_id`'s chain that an attorney is
/// permitted to see: the released-or-closed record with the greatest
/// [`CaseRecord::effective_timestamp`]. Ties break by `case_id` so the
/// result is deterministic regardless of input order.
///
/// Returns `None` when the start record is absent or nothing in the chain
/// has ever been released — a valid, expected outcome the caller must render
/// as an explicit empty state, never as a fallback to draft content.
pub fn resolve_latest_released(
  records: &[CaseRecord],
  start_id: Uuid,
) -> Option<&CaseRecord> {
  let root_id = find_chain_root(records, start_id)?;
  collect_chain(records, root_id)
    .into_iter()
    .filter(|r| r.status.is_attorney_visible())
    .max_by(|a, b| {
      a.effective_timestamp()
        .cmp(&b.effective_timestamp())
        .then_with(|| a.case_id.cmp(&b.case_id))
    })
}

#[cfg(test)]
mod tests {
  use chrono::{DateTime, Utc};

  use super::*;
  use crate::{case::CaseStatus, summary::CaseSummary};

  fn uuid(n: u128) -> Uuid { Uuid::from_u128(n) }

  fn record(id: u128, parent: Option<u128>, status: CaseStatus) -> CaseRecord {
    CaseRecord {
      case_id:        uuid(id),
      revision_of_id: parent.map(uuid),
      status,
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
    }
  }

  fn ts(s: &str) -> Option<DateTime<Utc>> { Some(s.parse().unwrap()) }

  // ── Root finding ──────────────────────────────────────────────────────────

  #[test]
  fn root_of_single_record_is_itself() {
    let records = vec![record(1, None, CaseStatus::Draft)];
    assert_eq!(find_chain_root(&records, uuid(1)), Some(uuid(1)));
  }

  #[test]
  fn root_found_from_any_node_in_chain() {
    let records = vec![
      record(1, None, CaseStatus::Released),
      record(2, Some(1), CaseStatus::Released),
      record(3, Some(2), CaseStatus::Draft),
    ];
    // Every node in the chain reports the same root.
    for id in [1, 2, 3] {
      assert_eq!(find_chain_root(&records, uuid(id)), Some(uuid(1)));
    }
  }

  #[test]
  fn missing_start_record_returns_none() {
    let records = vec![record(1, None, CaseStatus::Draft)];
    assert_eq!(find_chain_root(&records, uuid(99)), None);
    assert_eq!(find_chain_root(&[], uuid(1)), None);
  }

  #[test]
  fn dangling_parent_treats_node_as_root() {
    let records = vec![record(2, Some(1), CaseStatus::Draft)];
    assert_eq!(find_chain_root(&records, uuid(2)), Some(uuid(2)));
  }

  #[test]
  fn self_reference_terminates_at_node() {
    let records = vec![record(1, Some(1), CaseStatus::Draft)];
    assert_eq!(find_chain_root(&records, uuid(1)), Some(uuid(1)));
  }

  #[test]
  fn cycle_terminates_at_last_node_before_reentry() {
    // A points at B points at A; the walk must terminate with a defined
    // result.
    let records = vec![
      record(1, Some(2), CaseStatus::Draft),
      record(2, Some(1), CaseStatus::Draft),
    ];
    assert_eq!(find_chain_root(&records, uuid(1)), Some(uuid(2)));
    assert_eq!(find_chain_root(&records, uuid(2)), Some(uuid(1)));
  }

  // ── Resolution ────────────────────────────────────────────────────────────

  #[test]
  fn never_resolves_editable_records() {
    // A chain with no released version resolves to nothing, even when
    // every editable status is present.
    let records = vec![
      record(1, None, CaseStatus::Draft),
      record(2, Some(1), CaseStatus::Working),
      record(3, Some(2), CaseStatus::Revised),
      record(4, Some(3), CaseStatus::Ready),
    ];
    assert!(resolve_latest_released(&records, uuid(4)).is_none());
  }

  #[test]
  fn resolves_from_a_draft_start_node() {
    let mut released = record(2, Some(1), CaseStatus::Released);
    released.released_at = ts("2024-05-01T00:00:00Z");
    let records = vec![
      record(1, None, CaseStatus::Working),
      released,
      record(3, Some(2), CaseStatus::Draft),
    ];
    let resolved = resolve_latest_released(&records, uuid(3)).unwrap();
    assert_eq!(resolved.case_id, uuid(2));
  }

  #[test]
  fn resolution_is_idempotent() {
    // Same input, same answer.
    let mut a = record(1, None, CaseStatus::Released);
    a.released_at = ts("2024-01-01T00:00:00Z");
    let mut b = record(2, Some(1), CaseStatus::Released);
    b.released_at = ts("2024-02-01T00:00:00Z");
    let records = vec![a, b, record(3, Some(2), CaseStatus::Draft)];

    let first = resolve_latest_released(&records, uuid(3)).unwrap().case_id;
    let second = resolve_latest_released(&records, uuid(3)).unwrap().case_id;
    assert_eq!(first, second);
    assert_eq!(first, uuid(2));
  }

  #[test]
  fn closed_at_outranks_updated_at_within_a_record() {
    // X closed 2024-01-01 (updated 2023) vs Y merely updated 2024-06-01.
    let mut x = record(1, None, CaseStatus::Closed);
    x.closed_at = ts("2024-01-01T00:00:00Z");
    x.updated_at = ts("2023-01-01T00:00:00Z");
    let mut y = record(2, Some(1), CaseStatus::Released);
    y.updated_at = ts("2024-06-01T00:00:00Z");
    // Y has no released_at/closed_at, so its effective timestamp is its
    // updated_at, which is later than X's closed_at. Y wins the cross-record
    // comparison; the precedence is per-record, not cross-record.
    let records = vec![x.clone(), y];
    assert_eq!(resolve_latest_released(&records, uuid(1)).unwrap().case_id, uuid(2));

    // But when Y's only timestamp is older than X's closed_at, X wins even
    // though X's updated_at is the oldest value in the set.
    let mut y_old = record(3, Some(1), CaseStatus::Released);
    y_old.updated_at = ts("2023-06-01T00:00:00Z");
    let records = vec![x, y_old];
    assert_eq!(resolve_latest_released(&records, uuid(1)).unwrap().case_id, uuid(1));
  }

  #[test]
  fn later_release_beats_earlier_closed_ancestor() {
    // A closed 2024-03-01 ← B released 2024-05-01 ← C draft: resolves to B.
    let mut a = record(1, None, CaseStatus::Closed);
    a.closed_at = ts("2024-03-01T00:00:00Z");
    let mut b = record(2, Some(1), CaseStatus::Released);
    b.released_at = ts("2024-05-01T00:00:00Z");
    let records = vec![a, b, record(3, Some(2), CaseStatus::Draft)];
    assert_eq!(resolve_latest_released(&records, uuid(3)).unwrap().case_id, uuid(2));
  }

  #[test]
  fn ties_break_deterministically_by_id() {
    // Two released records with no timestamps at all: both fall back to the
    // epoch, and the higher case_id wins regardless of input order.
    let a = record(1, None, CaseStatus::Released);
    let b = record(2, Some(1), CaseStatus::Released);
    let forward = vec![a.clone(), b.clone()];
    let backward = vec![b, a];
    assert_eq!(resolve_latest_released(&forward, uuid(1)).unwrap().case_id, uuid(2));
    assert_eq!(resolve_latest_released(&backward, uuid(1)).unwrap().case_id, uuid(2));
  }

  #[test]
  fn resolves_across_branches_of_the_chain() {
    // Collection expands outward to all descendants, not just the start
    // node's own ancestry.
    let mut left = record(2, Some(1), CaseStatus::Released);
    left.released_at = ts("2024-04-01T00:00:00Z");
    let records = vec![
      record(1, None, CaseStatus::Working),
      left,
      record(3, Some(1), CaseStatus::Draft),
    ];
    let resolved = resolve_latest_released(&records, uuid(3)).unwrap();
    assert_eq!(resolved.case_id, uuid(2));
  }

  #[test]
  fn cycle_in_chain_still_resolves() {
    // The same cycle, through the full resolver this time.
    let mut a = record(1, Some(2), CaseStatus::Released);
    a.released_at = ts("2024-01-01T00:00:00Z");
    let b = record(2, Some(1), CaseStatus::Draft);
    let records = vec![a, b];
    let resolved = resolve_latest_released(&records, uuid(1)).unwrap();
    assert_eq!(resolved.case_id, uuid(1));
  }

  #[test]
  fn chain_root_id_matches_find_chain_root() {
    let records = vec![
      record(1, None, CaseStatus::Released),
      record(2, Some(1), CaseStatus::Draft),
    ];
    assert_eq!(chain_root_id(&records, uuid(2)), find_chain_root(&records, uuid(2)));
  }
}
