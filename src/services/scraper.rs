// src/services/scraper.rs

//! Client for the job scraper service.
//!
//! The service aggregates several job boards behind one search endpoint and
//! returns loosely-typed rows; everything downstream works on `RawJobRow`,
//! the strongly typed boundary form, so untyped data never leaks past this
//! module.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::models::{FilterSet, ScraperConfig};

/// One row as emitted by the scraper service, before normalization.
///
/// Every field is optional and loosely typed; sources disagree on which
/// fields they fill and whether numbers arrive as numbers or strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJobRow {
    #[serde(default)]
    pub title: Option<Value>,
    #[serde(default)]
    pub company: Option<Value>,
    #[serde(default)]
    pub location: Option<Value>,
    #[serde(default)]
    pub site: Option<Value>,
    #[serde(default)]
    pub job_url: Option<Value>,
    #[serde(default)]
    pub job_url_direct: Option<Value>,
    #[serde(default)]
    pub date_posted: Option<Value>,
    #[serde(default)]
    pub job_type: Option<Value>,
    #[serde(default)]
    pub is_remote: Option<Value>,
    #[serde(default)]
    pub min_amount: Option<Value>,
    #[serde(default)]
    pub max_amount: Option<Value>,
    #[serde(default)]
    pub currency: Option<Value>,
    #[serde(default)]
    pub interval: Option<Value>,
    #[serde(default)]
    pub description: Option<Value>,
}

/// Search interface over the scraper collaborator.
///
/// Implemented by the HTTP client in production and by stubs in tests and
/// the pipeline's fetch-more cycle.
#[async_trait]
pub trait JobSearchClient: Send + Sync {
    /// Run one search. `offset` skips rows already fetched this session.
    /// Raises on total failure; callers convert that to an empty result
    /// plus a surfaced reason.
    async fn search(
        &self,
        filters: &FilterSet,
        sources: &[String],
        country: &str,
        results_wanted: u32,
        offset: u32,
    ) -> Result<Vec<RawJobRow>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    jobs: Vec<RawJobRow>,
}

/// HTTP-backed scraper client.
pub struct HttpJobSearch {
    client: Client,
    endpoint: String,
}

impl HttpJobSearch {
    /// Create a client with the configured user agent and timeout.
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    fn build_query(
        filters: &FilterSet,
        sources: &[String],
        country: &str,
        results_wanted: u32,
        offset: u32,
    ) -> Vec<(&'static str, String)> {
        // A per-search source subset overrides the user's enabled set.
        let effective_sources = filters
            .sources
            .as_deref()
            .unwrap_or(sources)
            .join(",");
        let effective_country = filters.country.as_deref().unwrap_or(country);

        let mut query = vec![
            ("sources", effective_sources),
            ("country", effective_country.to_string()),
            ("results_wanted", results_wanted.to_string()),
            ("offset", offset.to_string()),
        ];
        if let Some(keywords) = &filters.keywords {
            query.push(("search_term", keywords.clone()));
        }
        if let Some(location) = &filters.location {
            query.push(("location", location.clone()));
        }
        if let Some(job_type) = &filters.job_type {
            query.push(("job_type", job_type.clone()));
        }
        if let Some(remote) = filters.remote {
            query.push(("is_remote", remote.to_string()));
        }
        if let Some(hours_old) = filters.hours_old {
            query.push(("hours_old", hours_old.to_string()));
        }
        if let Some(distance) = filters.distance {
            query.push(("distance", distance.to_string()));
        }
        query
    }
}

#[async_trait]
impl JobSearchClient for HttpJobSearch {
    async fn search(
        &self,
        filters: &FilterSet,
        sources: &[String],
        country: &str,
        results_wanted: u32,
        offset: u32,
    ) -> Result<Vec<RawJobRow>> {
        let query = Self::build_query(filters, sources, country, results_wanted, offset);
        let response: SearchResponse = self
            .client
            .get(&self.endpoint)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.jobs)
    }
}
