//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// User store location and locking behavior
    #[serde(default)]
    pub store: StoreConfig,

    /// Job scraper service settings
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Exchange rate service settings
    #[serde(default)]
    pub fx: FxConfig,

    /// Result presentation settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Digest sweep settings
    #[serde(default)]
    pub digest: DigestConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.store.path.trim().is_empty() {
            return Err(AppError::config("store.path is empty"));
        }
        if self.scraper.endpoint.trim().is_empty() {
            return Err(AppError::config("scraper.endpoint is empty"));
        }
        if self.scraper.timeout_secs == 0 {
            return Err(AppError::config("scraper.timeout_secs must be > 0"));
        }
        if self.scraper.results_wanted == 0 {
            return Err(AppError::config("scraper.results_wanted must be > 0"));
        }
        if self.fx.endpoint.trim().is_empty() {
            return Err(AppError::config("fx.endpoint is empty"));
        }
        if self.search.page_size == 0 {
            return Err(AppError::config("search.page_size must be > 0"));
        }
        if self.digest.interval_mins == 0 {
            return Err(AppError::config("digest.interval_mins must be > 0"));
        }
        Ok(())
    }
}

/// User store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the primary store file. Sidecars `.bak` and `.lock` are
    /// derived from it.
    #[serde(default = "defaults::store_path")]
    pub path: String,

    /// Bounded wait for the advisory file lock, in seconds
    #[serde(default = "defaults::lock_timeout")]
    pub lock_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: defaults::store_path(),
            lock_timeout_secs: defaults::lock_timeout(),
        }
    }
}

/// Job scraper service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Search endpoint of the scraper service
    #[serde(default = "defaults::scraper_endpoint")]
    pub endpoint: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::scraper_timeout")]
    pub timeout_secs: u64,

    /// Result count requested for an interactive search
    #[serde(default = "defaults::results_wanted")]
    pub results_wanted: u32,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::scraper_endpoint(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::scraper_timeout(),
            results_wanted: defaults::results_wanted(),
        }
    }
}

/// Exchange rate service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FxConfig {
    /// Rate table endpoint; queried with a `base` parameter
    #[serde(default = "defaults::fx_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::fx_timeout")]
    pub timeout_secs: u64,

    /// Seconds a cached rate snapshot stays fresh
    #[serde(default = "defaults::fx_ttl")]
    pub ttl_secs: i64,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::fx_endpoint(),
            timeout_secs: defaults::fx_timeout(),
            ttl_secs: defaults::fx_ttl(),
        }
    }
}

/// Result presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Jobs shown per page
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,

    /// Upper bound on fetch-more cycles per page request
    #[serde(default = "defaults::fetch_more_attempts")]
    pub fetch_more_attempts: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: defaults::page_size(),
            fetch_more_attempts: defaults::fetch_more_attempts(),
        }
    }
}

/// Digest sweep settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    /// Minutes between due-ness sweeps
    #[serde(default = "defaults::digest_interval")]
    pub interval_mins: u64,

    /// Result count requested per saved search
    #[serde(default = "defaults::digest_results")]
    pub results_wanted: u32,

    /// Rows sent per saved search
    #[serde(default = "defaults::digest_rows")]
    pub max_rows_per_search: usize,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            interval_mins: defaults::digest_interval(),
            results_wanted: defaults::digest_results(),
            max_rows_per_search: defaults::digest_rows(),
        }
    }
}

mod defaults {
    // Store defaults
    pub fn store_path() -> String {
        "data/users.json".into()
    }
    pub fn lock_timeout() -> u64 {
        5
    }

    // Scraper defaults
    pub fn scraper_endpoint() -> String {
        "http://127.0.0.1:8800/api/search".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; jobfeed/1.0)".into()
    }
    pub fn scraper_timeout() -> u64 {
        30
    }
    pub fn results_wanted() -> u32 {
        25
    }

    // FX defaults
    pub fn fx_endpoint() -> String {
        "https://api.exchangerate.host/latest".into()
    }
    pub fn fx_timeout() -> u64 {
        10
    }
    pub fn fx_ttl() -> i64 {
        24 * 3600
    }

    // Search defaults
    pub fn page_size() -> usize {
        5
    }
    pub fn fetch_more_attempts() -> u32 {
        3
    }

    // Digest defaults
    pub fn digest_interval() -> u64 {
        30
    }
    pub fn digest_results() -> u32 {
        15
    }
    pub fn digest_rows() -> usize {
        5
    }
}
