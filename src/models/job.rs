//! Canonical job record produced by the normalizer.

use serde::{Deserialize, Serialize};

/// Placeholder shown for any field the scraper did not provide.
pub const UNKNOWN: &str = "—";

/// A job posting after normalization.
///
/// Records are ephemeral per search session; they are persisted only as
/// denormalized snapshots inside a user's favorites, last results, or a
/// digest send, and are replaced wholesale by the next search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRecord {
    /// Job title
    pub title: String,

    /// Company name
    pub company: String,

    /// Location as reported by the source
    pub location: String,

    /// Source site the posting came from
    pub site: String,

    /// Posting date in display form (`DD.MM.YYYY`), or the raw string when
    /// it did not parse, or the unknown placeholder
    pub date_posted: String,

    /// Job type (full_time, contract, ...)
    pub job_type: String,

    /// Remote tri-state: Some(true)/Some(false)/unknown
    #[serde(default)]
    pub remote: Option<bool>,

    /// Rendered salary descriptor
    pub salary: String,

    /// Lower salary bound, when the source provided one
    #[serde(default)]
    pub min_amount: Option<i64>,

    /// Upper salary bound, when the source provided one
    #[serde(default)]
    pub max_amount: Option<i64>,

    /// Salary currency code, empty when unknown
    #[serde(default)]
    pub currency: String,

    /// Salary interval (yearly, hourly, ...), empty when unknown
    #[serde(default)]
    pub interval: String,

    /// Canonical URL: scheme + lower-cased host (no leading www) + path.
    /// The dedup key when non-empty.
    pub url: String,

    /// Original URL for outbound linking
    pub url_raw: String,

    /// Truncated description
    #[serde(default)]
    pub description: String,
}

impl JobRecord {
    /// Fixed display label for the remote tri-state.
    pub fn remote_label(&self) -> &'static str {
        match self.remote {
            Some(true) => "Remote",
            Some(false) => "On-site",
            None => UNKNOWN,
        }
    }

    /// Fallback dedup key for records without a canonical URL.
    pub fn identity_key(&self) -> (&str, &str, &str) {
        (&self.title, &self.company, &self.location)
    }
}
