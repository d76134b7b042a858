//! SQL schema for the case SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per case version. released/closed rows are immutable except for
-- the released -> closed flip; all status changes go through guarded
-- updates that name the statuses they are legal from.
CREATE TABLE IF NOT EXISTS cases (
    case_id        TEXT PRIMARY KEY,
    revision_of_id TEXT REFERENCES cases(case_id),
    status         TEXT NOT NULL,   -- draft|working|revised|ready|released|closed
    released_at    TEXT,            -- ISO 8601 UTC
    closed_at      TEXT,
    updated_at     TEXT NOT NULL,
    created_at     TEXT NOT NULL,
    case_type      TEXT,
    jurisdiction   TEXT,
    date_of_injury TEXT,            -- ISO 8601 date
    client_id      TEXT,
    attorney_id    TEXT,
    summary_json   TEXT NOT NULL DEFAULT '{}'
);

-- Staged assessment fragments, one per case and assessment kind.
CREATE TABLE IF NOT EXISTS drafts (
    case_id    TEXT NOT NULL,
    kind       TEXT NOT NULL,       -- four_ps|ten_vs|sdoh|crisis
    data_json  TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (case_id, kind)
);

-- Append-only log of attorney exports, grouped by chain root.
CREATE TABLE IF NOT EXISTS export_audit (
    export_id     TEXT PRIMARY KEY,
    case_id       TEXT NOT NULL,
    chain_root_id TEXT NOT NULL,
    action        TEXT NOT NULL,    -- download|print
    format        TEXT NOT NULL,    -- pdf|text
    label         TEXT,
    exported_by   TEXT,
    exported_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS cases_revision_of_idx ON cases(revision_of_id);
CREATE INDEX IF NOT EXISTS cases_status_idx      ON cases(status);
CREATE INDEX IF NOT EXISTS export_audit_root_idx ON export_audit(chain_root_id);

PRAGMA user_version = 1;
";
