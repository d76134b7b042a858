//! [`SqliteStore`] — the SQLite implementation of [`CaseStore`] and
//! [`DraftStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use reconcile_core::{
  case::{CaseRecord, CaseStatus, NewCase},
  chain,
  draft::{DraftFragment, DraftKind, DraftStore},
  lifecycle::{self, TransitionError},
  store::{CaseStore, ExportAudit, NewExportAudit, ReleaseOutcome},
  summary::CaseSummary,
};

use crate::{
  encode::{EncodedCase, RawCase, RawExport, encode_case, encode_dt, encode_uuid},
  schema::SCHEMA,
  Error, Result,
};

// ─── SQL fragments ───────────────────────────────────────────────────────────

const CASE_COLUMNS: &str = "case_id, revision_of_id, status, released_at, \
   closed_at, updated_at, created_at, case_type, jurisdiction, \
   date_of_injury, client_id, attorney_id, summary_json";

/// Both directions of a revision chain: walk `revision_of_id` upward from the
/// start row, then expand downward to every descendant. `UNION` (not `UNION
/// ALL`) deduplicates, so cycles and repeated edges terminate.
const CHAIN_SQL: &str = "
  WITH RECURSIVE up(id) AS (
    SELECT case_id FROM cases WHERE case_id = ?1
    UNION
    SELECT c.revision_of_id FROM cases c
      JOIN up ON c.case_id = up.id
      WHERE c.revision_of_id IS NOT NULL
  ),
  chain(id) AS (
    SELECT id FROM up
    UNION
    SELECT c.case_id FROM cases c JOIN chain ON c.revision_of_id = chain.id
  )
  SELECT case_id, revision_of_id, status, released_at, closed_at, updated_at,
         created_at, case_type, jurisdiction, date_of_injury, client_id,
         attorney_id, summary_json
    FROM cases JOIN chain ON cases.case_id = chain.id
    ORDER BY created_at, case_id";

fn raw_case_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawCase> {
  Ok(RawCase {
    case_id:        row.get(0)?,
    revision_of_id: row.get(1)?,
    status:         row.get(2)?,
    released_at:    row.get(3)?,
    closed_at:      row.get(4)?,
    updated_at:     row.get(5)?,
    created_at:     row.get(6)?,
    case_type:      row.get(7)?,
    jurisdiction:   row.get(8)?,
    date_of_injury: row.get(9)?,
    client_id:      row.get(10)?,
    attorney_id:    row.get(11)?,
    summary_json:   row.get(12)?,
  })
}

fn insert_case(conn: &rusqlite::Connection, row: &EncodedCase) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO cases (
       case_id, revision_of_id, status, released_at, closed_at,
       updated_at, created_at, case_type, jurisdiction, date_of_injury,
       client_id, attorney_id, summary_json
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
    rusqlite::params![
      row.case_id,
      row.revision_of_id,
      row.status,
      row.released_at,
      row.closed_at,
      row.updated_at,
      row.created_at,
      row.case_type,
      row.jurisdiction,
      row.date_of_injury,
      row.client_id,
      row.attorney_id,
      row.summary_json,
    ],
  )?;
  Ok(())
}

/// Result of a status-guarded write, reported from inside the connection
/// closure so rollback happens before the error is shaped.
enum GuardedWrite {
  Applied(RawCase),
  Missing,
  /// The guard did not match; carries the row's current status.
  Rejected(String),
}

enum ReleaseTx {
  Committed,
  Missing,
  Rejected(String),
  Inconsistent(String),
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A case store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Fetch one case row, decoded, or a typed not-found error.
  async fn require_case(&self, case_id: Uuid) -> Result<CaseRecord> {
    self
      .get_case(case_id)
      .await?
      .ok_or_else(|| Error::case_not_found(case_id))
  }

  /// Run a status-guarded UPDATE followed by a re-read, inside one
  /// connection closure. `guard_sql` must be a full UPDATE statement whose
  /// `?1` is the case id and whose WHERE clause names the statuses the
  /// transition is legal from.
  async fn guarded_update(
    &self,
    case_id: Uuid,
    guard_sql: &'static str,
    extra: Vec<Option<String>>,
  ) -> Result<GuardedWrite> {
    let id_str = encode_uuid(case_id);

    let outcome = self
      .conn
      .call(move |conn| {
        let mut params: Vec<Option<String>> = vec![Some(id_str.clone())];
        params.extend(extra);

        let n = conn.execute(guard_sql, rusqlite::params_from_iter(params.iter()))?;

        if n == 1 {
          let raw = conn.query_row(
            &format!("SELECT {CASE_COLUMNS} FROM cases WHERE case_id = ?1"),
            rusqlite::params![id_str],
            raw_case_from_row,
          )?;
          return Ok(GuardedWrite::Applied(raw));
        }

        let status: Option<String> = conn
          .query_row(
            "SELECT status FROM cases WHERE case_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;

        Ok(match status {
          Some(s) => GuardedWrite::Rejected(s),
          None => GuardedWrite::Missing,
        })
      })
      .await?;

    Ok(outcome)
  }

  /// Map a guard rejection back into the typed transition error the guard
  /// was protecting.
  fn rejected(status: &str, shape: fn(CaseStatus) -> TransitionError) -> Error {
    match CaseStatus::parse(status) {
      Ok(st) => Error::Transition(shape(st)),
      Err(e) => Error::Core(e),
    }
  }
}

// ─── CaseStore impl ──────────────────────────────────────────────────────────

impl CaseStore for SqliteStore {
  type Error = Error;

  async fn create_case(&self, new_case: NewCase) -> Result<CaseRecord> {
    let now = Utc::now();
    let record = CaseRecord {
      case_id:        Uuid::new_v4(),
      revision_of_id: None,
      status:         CaseStatus::Draft,
      released_at:    None,
      closed_at:      None,
      updated_at:     Some(now),
      created_at:     Some(now),
      case_type:      new_case.case_type,
      jurisdiction:   new_case.jurisdiction,
      date_of_injury: new_case.date_of_injury,
      client_id:      new_case.client_id,
      attorney_id:    new_case.attorney_id,
      summary:        new_case.summary,
    };

    let encoded = encode_case(&record, now)?;
    self
      .conn
      .call(move |conn| {
        insert_case(conn, &encoded)?;
        Ok(())
      })
      .await?;

    Ok(record)
  }

  async fn get_case(&self, case_id: Uuid) -> Result<Option<CaseRecord>> {
    let id_str = encode_uuid(case_id);

    let raw: Option<RawCase> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {CASE_COLUMNS} FROM cases WHERE case_id = ?1"),
              rusqlite::params![id_str],
              raw_case_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCase::into_record).transpose()
  }

  async fn chain_records(&self, case_id: Uuid) -> Result<Vec<CaseRecord>> {
    let id_str = encode_uuid(case_id);

    let raws: Vec<RawCase> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(CHAIN_SQL)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], raw_case_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCase::into_record).collect()
  }

  async fn update_summary(&self, case_id: Uuid, summary: CaseSummary) -> Result<CaseRecord> {
    let summary_json = serde_json::to_string(&summary)?;
    let now_str = encode_dt(Utc::now());

    let outcome = self
      .guarded_update(
        case_id,
        "UPDATE cases SET summary_json = ?2, updated_at = ?3
           WHERE case_id = ?1 AND status IN ('draft', 'working', 'revised', 'ready')",
        vec![Some(summary_json), Some(now_str)],
      )
      .await?;

    match outcome {
      GuardedWrite::Applied(raw) => raw.into_record(),
      GuardedWrite::Missing => Err(Error::case_not_found(case_id)),
      GuardedWrite::Rejected(st) => Err(Self::rejected(&st, TransitionError::Immutable)),
    }
  }

  async fn mark_ready(&self, case_id: Uuid) -> Result<CaseRecord> {
    let now_str = encode_dt(Utc::now());

    let outcome = self
      .guarded_update(
        case_id,
        "UPDATE cases SET status = 'ready', updated_at = ?2
           WHERE case_id = ?1 AND status IN ('draft', 'working', 'revised')",
        vec![Some(now_str)],
      )
      .await?;

    match outcome {
      GuardedWrite::Applied(raw) => raw.into_record(),
      GuardedWrite::Missing => Err(Error::case_not_found(case_id)),
      GuardedWrite::Rejected(st) => Err(Self::rejected(&st, TransitionError::NotMarkable)),
    }
  }

  async fn release(&self, case_id: Uuid) -> Result<ReleaseOutcome> {
    let case = self.require_case(case_id).await?;
    let now = Utc::now();

    // Pure planning and construct-then-validate happen in core; the
    // transaction below only commits what the verified plan describes.
    let plan = lifecycle::plan_release(&case, now)?;

    let source_id = encode_uuid(case_id);
    let now_str = encode_dt(now);
    let released_row = encode_case(&plan.released, now)?;
    let draft_row = encode_case(&plan.draft, now)?;
    let draft_id = draft_row.case_id.clone();

    let tx_result = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // Claim the source row: flipping ready -> revised retires it from
        // release eligibility and doubles as the double-release guard.
        let n = tx.execute(
          "UPDATE cases SET status = 'revised', updated_at = ?2
             WHERE case_id = ?1 AND status = 'ready'",
          rusqlite::params![source_id, now_str],
        )?;
        if n != 1 {
          let status: Option<String> = tx
            .query_row(
              "SELECT status FROM cases WHERE case_id = ?1",
              rusqlite::params![source_id],
              |r| r.get(0),
            )
            .optional()?;
          return Ok(match status {
            Some(s) => ReleaseTx::Rejected(s),
            None => ReleaseTx::Missing,
          });
        }

        insert_case(&tx, &released_row)?;
        insert_case(&tx, &draft_row)?;

        // Re-read the draft row before committing: it must have landed as
        // an editable draft with no release identity.
        let (status, released_at): (String, Option<String>) = tx.query_row(
          "SELECT status, released_at FROM cases WHERE case_id = ?1",
          rusqlite::params![draft_id],
          |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        if status != "draft" || released_at.is_some() {
          return Ok(ReleaseTx::Inconsistent(format!(
            "draft row landed with status {status:?}"
          )));
        }

        tx.commit()?;
        Ok(ReleaseTx::Committed)
      })
      .await?;

    match tx_result {
      ReleaseTx::Committed => Ok(ReleaseOutcome { released: plan.released, draft: plan.draft }),
      ReleaseTx::Missing => Err(Error::case_not_found(case_id)),
      ReleaseTx::Rejected(st) => Err(Self::rejected(&st, TransitionError::NotReady)),
      ReleaseTx::Inconsistent(msg) => {
        Err(Error::Transition(TransitionError::Inconsistent(msg)))
      }
    }
  }

  async fn revise(&self, case_id: Uuid) -> Result<CaseRecord> {
    let case = self.require_case(case_id).await?;
    let now = Utc::now();

    let draft = lifecycle::plan_revision(&case, now)?;
    let source_id = encode_uuid(case_id);
    let draft_row = encode_case(&draft, now)?;

    let tx_result = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // The planning read above ran outside the transaction; re-check the
        // source row is still released before inserting its child.
        let status: Option<String> = tx
          .query_row(
            "SELECT status FROM cases WHERE case_id = ?1",
            rusqlite::params![source_id],
            |r| r.get(0),
          )
          .optional()?;
        match status.as_deref() {
          Some("released") => {}
          Some(other) => return Ok(GuardedWrite::Rejected(other.to_owned())),
          None => return Ok(GuardedWrite::Missing),
        }

        insert_case(&tx, &draft_row)?;
        tx.commit()?;
        Ok(GuardedWrite::Applied(RawCase {
          case_id:        draft_row.case_id,
          revision_of_id: draft_row.revision_of_id,
          status:         draft_row.status,
          released_at:    draft_row.released_at,
          closed_at:      draft_row.closed_at,
          updated_at:     draft_row.updated_at,
          created_at:     draft_row.created_at,
          case_type:      draft_row.case_type,
          jurisdiction:   draft_row.jurisdiction,
          date_of_injury: draft_row.date_of_injury,
          client_id:      draft_row.client_id,
          attorney_id:    draft_row.attorney_id,
          summary_json:   draft_row.summary_json,
        }))
      })
      .await?;

    match tx_result {
      GuardedWrite::Applied(_) => Ok(draft),
      GuardedWrite::Missing => Err(Error::case_not_found(case_id)),
      GuardedWrite::Rejected(st) => Err(Self::rejected(&st, TransitionError::NotRevisable)),
    }
  }

  async fn close(&self, case_id: Uuid) -> Result<CaseRecord> {
    let now_str = encode_dt(Utc::now());

    let outcome = self
      .guarded_update(
        case_id,
        "UPDATE cases SET status = 'closed', closed_at = ?2, updated_at = ?2
           WHERE case_id = ?1 AND status = 'released'",
        vec![Some(now_str)],
      )
      .await?;

    match outcome {
      GuardedWrite::Applied(raw) => raw.into_record(),
      GuardedWrite::Missing => Err(Error::case_not_found(case_id)),
      GuardedWrite::Rejected(st) => Err(Self::rejected(&st, TransitionError::NotClosable)),
    }
  }

  async fn resolve_released(&self, case_id: Uuid) -> Result<Option<CaseRecord>> {
    let records = self.chain_records(case_id).await?;
    Ok(chain::resolve_latest_released(&records, case_id).cloned())
  }

  async fn log_export(&self, entry: NewExportAudit) -> Result<ExportAudit> {
    let records = self.chain_records(entry.case_id).await?;
    let chain_root_id =
      chain::chain_root_id(&records, entry.case_id).unwrap_or(entry.case_id);

    let audit = ExportAudit {
      id: Uuid::new_v4(),
      case_id: entry.case_id,
      chain_root_id,
      action: entry.action,
      format: entry.format,
      label: entry.label,
      exported_by: entry.exported_by,
      exported_at: Utc::now(),
    };

    let id_str = encode_uuid(audit.id);
    let case_str = encode_uuid(audit.case_id);
    let root_str = encode_uuid(audit.chain_root_id);
    let action = audit.action.as_str();
    let format = audit.format.as_str();
    let label = audit.label.clone();
    let by = audit.exported_by.clone();
    let at_str = encode_dt(audit.exported_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO export_audit (
             export_id, case_id, chain_root_id, action, format,
             label, exported_by, exported_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![id_str, case_str, root_str, action, format, label, by, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(audit)
  }

  async fn list_exports(&self, case_id: Uuid) -> Result<Vec<ExportAudit>> {
    let records = self.chain_records(case_id).await?;
    let root = chain::chain_root_id(&records, case_id).unwrap_or(case_id);
    let root_str = encode_uuid(root);

    let raws: Vec<RawExport> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT export_id, case_id, chain_root_id, action, format,
                  label, exported_by, exported_at
             FROM export_audit
             WHERE chain_root_id = ?1
             ORDER BY exported_at DESC, export_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![root_str], |row| {
            Ok(RawExport {
              export_id:     row.get(0)?,
              case_id:       row.get(1)?,
              chain_root_id: row.get(2)?,
              action:        row.get(3)?,
              format:        row.get(4)?,
              label:         row.get(5)?,
              exported_by:   row.get(6)?,
              exported_at:   row.get(7)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawExport::into_audit).collect()
  }
}

// ─── DraftStore impl ─────────────────────────────────────────────────────────

fn fragment_json(fragment: &DraftFragment) -> Result<String> {
  Ok(match fragment {
    DraftFragment::FourPs(s) => serde_json::to_string(s)?,
    DraftFragment::TenVs(s) => serde_json::to_string(s)?,
    DraftFragment::Sdoh(s) => serde_json::to_string(s)?,
    DraftFragment::Crisis(s) => serde_json::to_string(s)?,
  })
}

fn fragment_from(kind: DraftKind, json: &str) -> Result<DraftFragment> {
  Ok(match kind {
    DraftKind::FourPs => DraftFragment::FourPs(serde_json::from_str(json)?),
    DraftKind::TenVs => DraftFragment::TenVs(serde_json::from_str(json)?),
    DraftKind::Sdoh => DraftFragment::Sdoh(serde_json::from_str(json)?),
    DraftKind::Crisis => DraftFragment::Crisis(serde_json::from_str(json)?),
  })
}

impl DraftStore for SqliteStore {
  type Error = Error;

  async fn get_draft(&self, case_id: Uuid, kind: DraftKind) -> Result<Option<DraftFragment>> {
    let id_str = encode_uuid(case_id);
    let kind_str = kind.as_str();

    let json: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT data_json FROM drafts WHERE case_id = ?1 AND kind = ?2",
              rusqlite::params![id_str, kind_str],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    json.as_deref().map(|j| fragment_from(kind, j)).transpose()
  }

  async fn put_draft(&self, case_id: Uuid, fragment: DraftFragment) -> Result<()> {
    let id_str = encode_uuid(case_id);
    let kind_str = fragment.kind().as_str();
    let data = fragment_json(&fragment)?;
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO drafts (case_id, kind, data_json, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (case_id, kind) DO UPDATE
               SET data_json = excluded.data_json, updated_at = excluded.updated_at",
          rusqlite::params![id_str, kind_str, data, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn clear_draft(&self, case_id: Uuid, kind: DraftKind) -> Result<()> {
    let id_str = encode_uuid(case_id);
    let kind_str = kind.as_str();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM drafts WHERE case_id = ?1 AND kind = ?2",
          rusqlite::params![id_str, kind_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn clear_drafts(&self, case_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(case_id);

    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM drafts WHERE case_id = ?1", rusqlite::params![id_str])?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
