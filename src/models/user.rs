//! Per-user record persisted in the document store.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::filters::FilterSet;
use super::job::JobRecord;

/// Digest cadence for a saved search subscription.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Off,
    #[default]
    Daily,
    #[serde(rename = "every_3_days")]
    Every3Days,
    Weekly,
}

impl Frequency {
    /// Period between digest sends, or None when the subscription is off.
    pub fn period_secs(self) -> Option<i64> {
        match self {
            Frequency::Off => None,
            Frequency::Daily => Some(24 * 3600),
            Frequency::Every3Days => Some(3 * 24 * 3600),
            Frequency::Weekly => Some(7 * 24 * 3600),
        }
    }
}

/// Subscription state attached to a saved search.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    #[serde(default)]
    pub frequency: Frequency,

    #[serde(default)]
    pub paused: bool,

    /// Epoch seconds of the last digest send (0 = never sent)
    #[serde(default)]
    pub last_sent_ts: i64,
}

/// A named, persisted filter set with an attached subscription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedSearch {
    pub name: String,

    pub filters: FilterSet,

    #[serde(default)]
    pub subscription: Subscription,
}

/// Everything the system knows about one user.
///
/// Every field carries a serde default so a record written by an older
/// schema version always loads fully populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Interface language code
    #[serde(default = "defaults::lang")]
    pub lang: String,

    /// User role (jobseeker or recruiter)
    #[serde(default = "defaults::role")]
    pub role: String,

    /// Enabled scraper sources
    #[serde(default = "defaults::sources")]
    pub sources: Vec<String>,

    /// Region code passed to region-scoped scrapers
    #[serde(default = "defaults::country")]
    pub country: String,

    /// Whether outbound links render previews
    #[serde(default)]
    pub previews: bool,

    /// Whether the user receives digest notifications
    #[serde(default = "defaults::notifications")]
    pub notifications: bool,

    /// Currency salary summaries are compared against
    #[serde(default = "defaults::base_currency")]
    pub base_currency: String,

    /// Cached exchange rates against the base currency
    #[serde(default)]
    pub fx_rates: HashMap<String, f64>,

    /// Epoch seconds of the last successful rate fetch
    #[serde(default)]
    pub fx_ts: i64,

    /// Reason the last rate refresh failed, if it did
    #[serde(default)]
    pub fx_error: Option<String>,

    /// Companies hidden from results
    #[serde(default)]
    pub muted_companies: Vec<String>,

    /// Bookmarked jobs, deduped by canonical URL
    #[serde(default)]
    pub favorites: Vec<JobRecord>,

    /// Named filter sets with subscriptions
    #[serde(default)]
    pub saved_searches: Vec<SavedSearch>,

    /// Snapshot of the most recent feed, for export and digest fallback
    #[serde(default)]
    pub last_results: Vec<JobRecord>,
}

impl Default for UserRecord {
    fn default() -> Self {
        Self {
            lang: defaults::lang(),
            role: defaults::role(),
            sources: defaults::sources(),
            country: defaults::country(),
            previews: false,
            notifications: defaults::notifications(),
            base_currency: defaults::base_currency(),
            fx_rates: HashMap::new(),
            fx_ts: 0,
            fx_error: None,
            muted_companies: Vec::new(),
            favorites: Vec::new(),
            saved_searches: Vec::new(),
            last_results: Vec::new(),
        }
    }
}

impl UserRecord {
    /// Append a favorite unless one with the same canonical URL exists.
    /// Returns false on duplicate.
    pub fn add_favorite(&mut self, job: JobRecord) -> bool {
        if self.favorites.iter().any(|j| j.url == job.url) {
            return false;
        }
        self.favorites.push(job);
        true
    }

    /// Hide a company from results. Insertion order kept, no duplicates.
    pub fn mute_company(&mut self, company: &str) {
        if !self.muted_companies.iter().any(|c| c == company) {
            self.muted_companies.push(company.to_string());
        }
    }

    /// Remove a company from the muted list.
    pub fn unmute_company(&mut self, company: &str) {
        self.muted_companies.retain(|c| c != company);
    }

    /// Save a filter set under a name. An existing search with the same
    /// name is replaced in place with its subscription preserved.
    pub fn upsert_saved_search(&mut self, name: &str, filters: FilterSet) {
        let subscription = self
            .saved_searches
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.subscription)
            .unwrap_or_default();
        self.saved_searches.retain(|s| s.name != name);
        self.saved_searches.push(SavedSearch {
            name: name.to_string(),
            filters,
            subscription,
        });
    }
}

mod defaults {
    pub fn lang() -> String {
        "en".into()
    }
    pub fn role() -> String {
        "jobseeker".into()
    }
    pub fn sources() -> Vec<String> {
        vec![
            "indeed".into(),
            "linkedin".into(),
            "google".into(),
            "zip_recruiter".into(),
            "glassdoor".into(),
        ]
    }
    pub fn country() -> String {
        "usa".into()
    }
    pub fn notifications() -> bool {
        true
    }
    pub fn base_currency() -> String {
        "USD".into()
    }
}
