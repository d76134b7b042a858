//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings, dates as ISO 8601 dates,
//! summaries as compact JSON. UUIDs are stored as hyphenated lowercase
//! strings.

use chrono::{DateTime, NaiveDate, Utc};
use reconcile_core::{
  case::{CaseRecord, CaseStatus},
  store::{ExportAction, ExportAudit, ExportFormat},
  summary::CaseSummary,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::Decode(e.to_string()))
}

// ─── ExportAction / ExportFormat ─────────────────────────────────────────────

pub fn decode_export_action(s: &str) -> Result<ExportAction> {
  match s {
    "download" => Ok(ExportAction::Download),
    "print" => Ok(ExportAction::Print),
    other => Err(Error::Decode(format!("unknown export action: {other:?}"))),
  }
}

pub fn decode_export_format(s: &str) -> Result<ExportFormat> {
  match s {
    "pdf" => Ok(ExportFormat::Pdf),
    "text" => Ok(ExportFormat::Text),
    other => Err(Error::Decode(format!("unknown export format: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `cases` row.
pub struct RawCase {
  pub case_id:        String,
  pub revision_of_id: Option<String>,
  pub status:         String,
  pub released_at:    Option<String>,
  pub closed_at:      Option<String>,
  pub updated_at:     String,
  pub created_at:     String,
  pub case_type:      Option<String>,
  pub jurisdiction:   Option<String>,
  pub date_of_injury: Option<String>,
  pub client_id:      Option<String>,
  pub attorney_id:    Option<String>,
  pub summary_json:   String,
}

impl RawCase {
  pub fn into_record(self) -> Result<CaseRecord> {
    let summary: CaseSummary = serde_json::from_str(&self.summary_json)?;

    Ok(CaseRecord {
      case_id:        decode_uuid(&self.case_id)?,
      revision_of_id: self.revision_of_id.as_deref().map(decode_uuid).transpose()?,
      status:         CaseStatus::parse(&self.status).map_err(Error::Core)?,
      released_at:    self.released_at.as_deref().map(decode_dt).transpose()?,
      closed_at:      self.closed_at.as_deref().map(decode_dt).transpose()?,
      updated_at:     Some(decode_dt(&self.updated_at)?),
      created_at:     Some(decode_dt(&self.created_at)?),
      case_type:      self.case_type,
      jurisdiction:   self.jurisdiction,
      date_of_injury: self.date_of_injury.as_deref().map(decode_date).transpose()?,
      client_id:      self.client_id.as_deref().map(decode_uuid).transpose()?,
      attorney_id:    self.attorney_id.as_deref().map(decode_uuid).transpose()?,
      summary,
    })
  }
}

/// Column strings ready to bind into a `cases` INSERT.
pub struct EncodedCase {
  pub case_id:        String,
  pub revision_of_id: Option<String>,
  pub status:         String,
  pub released_at:    Option<String>,
  pub closed_at:      Option<String>,
  pub updated_at:     String,
  pub created_at:     String,
  pub case_type:      Option<String>,
  pub jurisdiction:   Option<String>,
  pub date_of_injury: Option<String>,
  pub client_id:      Option<String>,
  pub attorney_id:    Option<String>,
  pub summary_json:   String,
}

pub fn encode_case(record: &CaseRecord, now: DateTime<Utc>) -> Result<EncodedCase> {
  Ok(EncodedCase {
    case_id:        encode_uuid(record.case_id),
    revision_of_id: record.revision_of_id.map(encode_uuid),
    status:         record.status.as_str().to_owned(),
    released_at:    record.released_at.map(encode_dt),
    closed_at:      record.closed_at.map(encode_dt),
    updated_at:     encode_dt(record.updated_at.unwrap_or(now)),
    created_at:     encode_dt(record.created_at.unwrap_or(now)),
    case_type:      record.case_type.clone(),
    jurisdiction:   record.jurisdiction.clone(),
    date_of_injury: record.date_of_injury.map(encode_date),
    client_id:      record.client_id.map(encode_uuid),
    attorney_id:    record.attorney_id.map(encode_uuid),
    summary_json:   serde_json::to_string(&record.summary)?,
  })
}

/// Raw strings read directly from an `export_audit` row.
pub struct RawExport {
  pub export_id:     String,
  pub case_id:       String,
  pub chain_root_id: String,
  pub action:        String,
  pub format:        String,
  pub label:         Option<String>,
  pub exported_by:   Option<String>,
  pub exported_at:   String,
}

impl RawExport {
  pub fn into_audit(self) -> Result<ExportAudit> {
    Ok(ExportAudit {
      id:            decode_uuid(&self.export_id)?,
      case_id:       decode_uuid(&self.case_id)?,
      chain_root_id: decode_uuid(&self.chain_root_id)?,
      action:        decode_export_action(&self.action)?,
      format:        decode_export_format(&self.format)?,
      label:         self.label,
      exported_by:   self.exported_by,
      exported_at:   decode_dt(&self.exported_at)?,
    })
  }
}
