// src/pipeline/session.rs

//! A search session: the growable working result set behind pagination.
//!
//! Rows accumulate across fetch-more cycles and are never re-fetched; the
//! session tracks how far into the upstream result stream it has read with
//! a monotonically increasing offset, independent of how many rows dedup
//! kept.

use std::collections::HashSet;

use crate::error::Result;
use crate::models::{FilterSet, JobRecord, SearchConfig};
use crate::pipeline::filter::{apply_filters, sort_rows, PostFilters, SortOrder};
use crate::pipeline::normalize::normalize;
use crate::services::JobSearchClient;

/// Result of a page request.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// Nothing to show: either the session is empty or the active filters
    /// rejected every row. Callers distinguish the two for messaging.
    NoResults,
    /// A window into the filtered set.
    Window {
        jobs: Vec<JobRecord>,
        page: usize,
        total: usize,
        has_more: bool,
    },
}

/// One user's interactive search: fetched rows plus the active post-filters
/// and pagination state.
pub struct SearchSession {
    filters: FilterSet,
    post: PostFilters,
    rows: Vec<JobRecord>,
    fetched_offset: u32,
    page_size: usize,
    fetch_more_attempts: u32,
}

impl SearchSession {
    /// Start a session by running the initial search.
    ///
    /// Scraper failure propagates here (and only here); the caller turns it
    /// into a "no results, try again" outcome with the reason attached.
    pub async fn open(
        client: &dyn JobSearchClient,
        filters: FilterSet,
        sources: &[String],
        country: &str,
        results_wanted: u32,
        search: &SearchConfig,
    ) -> Result<Self> {
        let mut session = Self {
            filters,
            post: PostFilters::default(),
            rows: Vec::new(),
            fetched_offset: 0,
            page_size: search.page_size.max(1),
            fetch_more_attempts: search.fetch_more_attempts,
        };
        session.fetch_batch(client, sources, country, results_wanted).await?;
        Ok(session)
    }

    /// All rows fetched so far, in working order.
    pub fn rows(&self) -> &[JobRecord] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The upstream search filters this session was opened with.
    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn post_filters(&self) -> &PostFilters {
        &self.post
    }

    /// Replace the post-filters. Takes effect from the next page request.
    pub fn set_post_filters(&mut self, post: PostFilters) {
        self.post = post;
    }

    /// Reorder the working set. Affects all subsequent pagination.
    pub fn sort(&mut self, order: SortOrder) {
        sort_rows(&mut self.rows, order);
    }

    /// The filtered view of the working set.
    pub fn filtered(&self, muted: &[String]) -> Vec<&JobRecord> {
        apply_filters(&self.rows, muted, &self.post)
    }

    /// Compute the window for `page` (1-based), growing the working set on
    /// demand when the filtered view is too short to fill it.
    ///
    /// Growth is bounded: after the configured number of fetch-more
    /// attempts the window truncates to what exists. Fetch failures are
    /// logged and count against the budget; they never fail the page.
    pub async fn page(
        &mut self,
        client: &dyn JobSearchClient,
        sources: &[String],
        country: &str,
        muted: &[String],
        page: usize,
    ) -> PageOutcome {
        let page = page.max(1);
        let start = (page - 1) * self.page_size;
        let end = start + self.page_size;

        if self.filtered(muted).is_empty() {
            return PageOutcome::NoResults;
        }

        let mut attempts = 0;
        while self.filtered(muted).len() < end && attempts < self.fetch_more_attempts {
            let needed = (end - self.filtered(muted).len()) as u32;
            let wanted = needed.max(self.page_size as u32 * 2);
            if let Err(e) = self.fetch_batch(client, sources, country, wanted).await {
                log::warn!("search: fetch-more failed: {}", e);
            }
            attempts += 1;
        }

        let filtered = self.filtered(muted);
        let total = filtered.len();
        if total == 0 {
            return PageOutcome::NoResults;
        }
        let end = end.min(total);
        let start = start.min(end);
        let jobs = filtered[start..end].iter().map(|job| (*job).clone()).collect();

        PageOutcome::Window {
            jobs,
            page,
            total,
            has_more: end < total,
        }
    }

    /// Pull one more batch from upstream and fold it into the working set,
    /// dropping rows whose canonical URL the session already holds.
    async fn fetch_batch(
        &mut self,
        client: &dyn JobSearchClient,
        sources: &[String],
        country: &str,
        wanted: u32,
    ) -> Result<usize> {
        let raw = client
            .search(&self.filters, sources, country, wanted, self.fetched_offset)
            .await?;
        self.fetched_offset += raw.len() as u32;

        let mut seen: HashSet<String> = self
            .rows
            .iter()
            .filter(|job| !job.url.is_empty())
            .map(|job| job.url.clone())
            .collect();

        let mut added = 0;
        for job in normalize(raw) {
            if job.url.is_empty() || seen.insert(job.url.clone()) {
                self.rows.push(job);
                added += 1;
            }
        }
        Ok(added)
    }
}
