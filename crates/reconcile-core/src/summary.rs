//! Assessment summaries and scoring.
//!
//! Each assessment domain uses one documented aggregation policy:
//!
//! - 4Ps overall follows the worst (lowest) dimension score — Maslow logic,
//!   a single critical dimension dominates the clinical picture.
//! - 10-Vs overall is the rounded mean of the dimension scores.
//! - SDOH scores each domain as the mean of its answered questions and takes
//!   the overall from the worst domain mean.
//! - Crisis severity follows the worst (lowest) flagged indicator, the same
//!   worst-of policy as the clinical scores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── SeverityScore ───────────────────────────────────────────────────────────

/// A 1–5 severity scale shared by every assessment. 1 is critical / very
/// poor; 5 is stable / strong.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SeverityScore(u8);

impl SeverityScore {
  pub const MIN: Self = Self(1);
  pub const MAX: Self = Self(5);

  /// Accepts only 1..=5.
  pub fn new(raw: u8) -> Option<Self> { (1..=5).contains(&raw).then_some(Self(raw)) }

  /// Round and clamp an aggregate value into the valid range.
  pub fn from_mean(mean: f64) -> Self {
    let rounded = mean.round() as i64;
    Self(rounded.clamp(1, 5) as u8)
  }

  pub fn get(self) -> u8 { self.0 }

  pub fn label(self) -> &'static str {
    match self.0 {
      1 => "Critical",
      2 => "High Risk",
      3 => "Moderate",
      4 => "Mild / Mostly Stable",
      _ => "Stable / Strong",
    }
  }
}

impl std::fmt::Display for SeverityScore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}/5 – {}", self.0, self.label())
  }
}

// ─── Dimension scores ────────────────────────────────────────────────────────

/// One scored dimension of a 4Ps or 10-Vs assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionScore {
  /// Stable dimension identifier, e.g. `"physical"` or `"velocity"`.
  pub id:    String,
  pub score: Option<SeverityScore>,
  pub note:  Option<String>,
}

/// One SDOH domain with its individual question scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdohDomainScores {
  /// Stable domain identifier, e.g. `"economic"` or `"healthcare"`.
  pub id:     String,
  pub scores: Vec<SeverityScore>,
  pub note:   Option<String>,
}

// ─── Per-assessment summaries ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FourPsSummary {
  #[serde(default)]
  pub dimensions: Vec<DimensionScore>,
  pub overall:    Option<SeverityScore>,
  pub narrative:  Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenVsSummary {
  #[serde(default)]
  pub dimensions: Vec<DimensionScore>,
  pub overall:    Option<SeverityScore>,
  pub narrative:  Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SdohSummary {
  #[serde(default)]
  pub domains:   Vec<SdohDomainScores>,
  pub overall:   Option<SeverityScore>,
  pub narrative: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrisisSummary {
  /// Severity per flagged indicator; overall severity follows the worst.
  #[serde(default)]
  pub indicators: Vec<DimensionScore>,
  pub severity:   Option<SeverityScore>,
  pub narrative:  Option<String>,
}

// ─── CaseSummary ─────────────────────────────────────────────────────────────

/// The clinical payload frozen into a case version on release. The resolver
/// carries this along without interpreting it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseSummary {
  pub four_ps:    Option<FourPsSummary>,
  pub ten_vs:     Option<TenVsSummary>,
  pub sdoh:       Option<SdohSummary>,
  pub crisis:     Option<CrisisSummary>,
  pub updated_at: Option<DateTime<Utc>>,
}

// ─── Aggregation ─────────────────────────────────────────────────────────────

fn scored(dimensions: &[DimensionScore]) -> Vec<SeverityScore> {
  dimensions.iter().filter_map(|d| d.score).collect()
}

/// 4Ps overall: the worst (lowest) scored dimension.
pub fn four_ps_overall(dimensions: &[DimensionScore]) -> Option<SeverityScore> {
  scored(dimensions).into_iter().min()
}

/// 10-Vs overall: rounded mean of the scored dimensions, clamped to 1..=5.
pub fn ten_vs_overall(dimensions: &[DimensionScore]) -> Option<SeverityScore> {
  let scores = scored(dimensions);
  if scores.is_empty() {
    return None;
  }
  let sum: u32 = scores.iter().map(|s| u32::from(s.get())).sum();
  Some(SeverityScore::from_mean(f64::from(sum) / scores.len() as f64))
}

/// Mean of a domain's answered questions, to one decimal place.
pub fn sdoh_domain_mean(domain: &SdohDomainScores) -> Option<f64> {
  if domain.scores.is_empty() {
    return None;
  }
  let sum: u32 = domain.scores.iter().map(|s| u32::from(s.get())).sum();
  let mean = f64::from(sum) / domain.scores.len() as f64;
  Some((mean * 10.0).round() / 10.0)
}

/// SDOH overall: the worst (lowest) domain mean, rounded into the scale.
pub fn sdoh_overall(domains: &[SdohDomainScores]) -> Option<SeverityScore> {
  domains
    .iter()
    .filter_map(sdoh_domain_mean)
    .min_by(|a, b| a.total_cmp(b))
    .map(SeverityScore::from_mean)
}

/// Crisis severity: the worst (lowest) flagged indicator.
pub fn crisis_severity(indicators: &[DimensionScore]) -> Option<SeverityScore> {
  scored(indicators).into_iter().min()
}
