//! Search filter set passed to the scraper collaborator.

use serde::{Deserialize, Serialize};

/// Filters for a job search. Every field is optional; an absent field
/// places no constraint on the search.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FilterSet {
    /// Free-text search terms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,

    /// Location string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Job type (full_time, part_time, contract, internship)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,

    /// Remote tri-state: Some(true) remote only, Some(false) on-site only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<bool>,

    /// Lookback window in hours
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_old: Option<u32>,

    /// Search radius in miles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<u32>,

    /// Subset of scraper sources to query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,

    /// Country code override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl FilterSet {
    /// Copy with a lookback window applied only when none is set yet.
    /// Used by the digest scheduler to size the window to the cadence.
    pub fn with_default_lookback(mut self, hours: u32) -> Self {
        self.hours_old.get_or_insert(hours);
        self
    }
}
