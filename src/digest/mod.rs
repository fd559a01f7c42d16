// src/digest/mod.rs

//! Periodic digest sweep over saved-search subscriptions.
//!
//! Every sweep walks all known users, checks each saved search's
//! subscription for due-ness, and pushes fresh matches through the
//! [`Notifier`] collaborator. Failures are isolated: one broken search or
//! user never stops the sweep for the rest.
//!
//! The sweep runs on the shared runtime; store mutations happen after all
//! network calls for a search so the store lock is never held across I/O.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::Result;
use crate::models::{DigestConfig, FilterSet, JobRecord, UserRecord};
use crate::pipeline::normalize;
use crate::services::JobSearchClient;
use crate::store::UserStore;

/// Outbound message sink. The chat transport behind it is opaque to the
/// core; tests and the CLI plug in their own.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sent once per user per sweep, before the first non-empty search.
    async fn notify_header(&self, user_id: u64) -> Result<()>;

    /// Sent once per non-empty saved search.
    async fn notify_search(&self, user_id: u64, name: &str) -> Result<()>;

    /// Sent per delivered job row.
    async fn notify_job(&self, user_id: u64, job: &JobRecord) -> Result<()>;
}

/// Notifier that writes digests to the log. Used by the CLI `watch` mode.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_header(&self, user_id: u64) -> Result<()> {
        log::info!("digest for user {}", user_id);
        Ok(())
    }

    async fn notify_search(&self, user_id: u64, name: &str) -> Result<()> {
        log::info!("user {}: saved search '{}'", user_id, name);
        Ok(())
    }

    async fn notify_job(&self, user_id: u64, job: &JobRecord) -> Result<()> {
        log::info!(
            "user {}: {} — {} • {}\n{}",
            user_id,
            job.title,
            job.company,
            job.location,
            if job.url_raw.is_empty() { &job.url } else { &job.url_raw }
        );
        Ok(())
    }
}

/// Counters from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub users_seen: usize,
    pub searches_due: usize,
    pub jobs_sent: usize,
    pub failures: usize,
}

/// The periodic digest task.
pub struct DigestScheduler<S, N> {
    store: UserStore,
    search: S,
    notifier: N,
    config: DigestConfig,
}

impl<S: JobSearchClient, N: Notifier> DigestScheduler<S, N> {
    pub fn new(store: UserStore, search: S, notifier: N, config: DigestConfig) -> Self {
        Self {
            store,
            search,
            notifier,
            config,
        }
    }

    /// Run sweeps forever at the configured interval. The first sweep runs
    /// immediately.
    pub async fn run(&self) {
        let period = Duration::from_secs(self.config.interval_mins * 60);
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let stats = self.sweep().await;
            log::info!(
                "digest: sweep done: {} users, {} due, {} jobs sent, {} failures",
                stats.users_seen,
                stats.searches_due,
                stats.jobs_sent,
                stats.failures
            );
        }
    }

    /// One pass over all users.
    pub async fn sweep(&self) -> SweepStats {
        self.sweep_at(Utc::now().timestamp()).await
    }

    /// `sweep` with an injected clock.
    pub async fn sweep_at(&self, now: i64) -> SweepStats {
        let mut stats = SweepStats::default();

        let ids = match self.store.list_ids() {
            Ok(ids) => ids,
            Err(e) => {
                log::error!("digest: could not list users: {}", e);
                stats.failures += 1;
                return stats;
            }
        };

        for id in ids {
            stats.users_seen += 1;
            if let Err(e) = self.sweep_user(id, now, &mut stats).await {
                log::warn!("digest: sweep failed for user {}: {}", id, e);
                stats.failures += 1;
            }
        }
        stats
    }

    async fn sweep_user(&self, id: u64, now: i64, stats: &mut SweepStats) -> Result<()> {
        // list_ids was a stale snapshot; get() is authoritative.
        let user = self.store.get(id)?;
        if user.saved_searches.is_empty() {
            return Ok(());
        }

        let mut sent_header = false;
        for (idx, search) in user.saved_searches.iter().enumerate() {
            let subscription = search.subscription;
            let Some(period) = subscription.frequency.period_secs() else {
                // Subscription is off.
                continue;
            };
            if subscription.paused || now - subscription.last_sent_ts < period {
                continue;
            }
            stats.searches_due += 1;

            // Size the lookback window to the cadence so a weekly digest
            // sees the whole week.
            let hours = (period / 3600).max(1) as u32;
            let filters = search.filters.clone().with_default_lookback(hours);
            let rows = self.run_search(&user, filters).await.unwrap_or_else(|e| {
                log::warn!("digest: search '{}' failed for user {}: {}", search.name, id, e);
                stats.failures += 1;
                Vec::new()
            });

            if !rows.is_empty() {
                if !sent_header {
                    self.notifier.notify_header(id).await?;
                    sent_header = true;
                }
                self.notifier.notify_search(id, &search.name).await?;
                for job in rows.iter().take(self.config.max_rows_per_search) {
                    self.notifier.notify_job(id, job).await?;
                    stats.jobs_sent += 1;
                }
            }

            // Advance even on an empty run so the search is not re-polled
            // every sweep. Paused and frequency stay as they are.
            self.store
                .update_saved_search(id, idx, |s| s.subscription.last_sent_ts = now)?;
        }
        Ok(())
    }

    async fn run_search(&self, user: &UserRecord, filters: FilterSet) -> Result<Vec<JobRecord>> {
        let raw = self
            .search
            .search(
                &filters,
                &user.sources,
                &user.country,
                self.config.results_wanted,
                0,
            )
            .await?;
        Ok(normalize(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{FilterSet, Frequency, SavedSearch, Subscription};
    use crate::services::RawJobRow;
    use serde_json::json;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const NOW: i64 = 1_700_000_000;

    fn raw_job(n: usize) -> serde_json::Value {
        json!({
            "title": format!("Job {n}"),
            "company": "Acme",
            "location": "Berlin",
            "job_url": format!("https://acme.com/job/{n}"),
        })
    }

    /// Returns a fixed number of rows per call and records the filters it
    /// was asked for.
    struct FixedSearch {
        rows_per_call: usize,
        seen_filters: Mutex<Vec<FilterSet>>,
        fail: bool,
    }

    impl FixedSearch {
        fn returning(rows_per_call: usize) -> Self {
            Self {
                rows_per_call,
                seen_filters: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                rows_per_call: 0,
                seen_filters: Mutex::new(Vec::new()),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl JobSearchClient for FixedSearch {
        async fn search(
            &self,
            filters: &FilterSet,
            _sources: &[String],
            _country: &str,
            _results_wanted: u32,
            _offset: u32,
        ) -> Result<Vec<RawJobRow>> {
            self.seen_filters.lock().unwrap().push(filters.clone());
            if self.fail {
                return Err(AppError::search("stub", "upstream down"));
            }
            Ok((0..self.rows_per_call)
                .map(|n| serde_json::from_value(raw_job(n)).unwrap())
                .collect())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        events: Mutex<Vec<String>>,
    }

    impl RecordingNotifier {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify_header(&self, user_id: u64) -> Result<()> {
            self.events.lock().unwrap().push(format!("header:{user_id}"));
            Ok(())
        }

        async fn notify_search(&self, user_id: u64, name: &str) -> Result<()> {
            self.events.lock().unwrap().push(format!("search:{user_id}:{name}"));
            Ok(())
        }

        async fn notify_job(&self, user_id: u64, job: &JobRecord) -> Result<()> {
            self.events
                .lock()
                .unwrap()
                .push(format!("job:{user_id}:{}", job.title));
            Ok(())
        }
    }

    fn saved(name: &str, frequency: Frequency, paused: bool, last_sent_ts: i64) -> SavedSearch {
        SavedSearch {
            name: name.to_string(),
            filters: FilterSet::default(),
            subscription: Subscription {
                frequency,
                paused,
                last_sent_ts,
            },
        }
    }

    fn store_with_user(tmp: &TempDir, id: u64, searches: Vec<SavedSearch>) -> UserStore {
        let store = UserStore::new(tmp.path().join("users.json"));
        store.mutate(id, |u| u.saved_searches = searches).unwrap();
        store
    }

    fn scheduler<S: JobSearchClient, N: Notifier>(
        store: UserStore,
        search: S,
        notifier: N,
    ) -> DigestScheduler<S, N> {
        DigestScheduler::new(store, search, notifier, DigestConfig::default())
    }

    #[tokio::test]
    async fn test_due_search_sends_header_and_capped_rows() {
        let tmp = TempDir::new().unwrap();
        let store = store_with_user(
            &tmp,
            1,
            vec![saved("rust", Frequency::Daily, false, NOW - 90_000)],
        );
        let sched = scheduler(store.clone(), FixedSearch::returning(8), RecordingNotifier::default());

        let stats = sched.sweep_at(NOW).await;
        assert_eq!(stats.searches_due, 1);
        // Capped at 5 rows per search.
        assert_eq!(stats.jobs_sent, 5);
        assert_eq!(stats.failures, 0);

        let events = sched.notifier.events();
        assert_eq!(events[0], "header:1");
        assert_eq!(events[1], "search:1:rust");
        assert_eq!(events.len(), 7);

        let searches = store.list_saved_searches(1).unwrap();
        assert_eq!(searches[0].subscription.last_sent_ts, NOW);
        assert!(!searches[0].subscription.paused);
    }

    #[tokio::test]
    async fn test_header_sent_once_for_multiple_searches() {
        let tmp = TempDir::new().unwrap();
        let store = store_with_user(
            &tmp,
            1,
            vec![
                saved("rust", Frequency::Daily, false, 0),
                saved("go", Frequency::Daily, false, 0),
            ],
        );
        let sched = scheduler(store, FixedSearch::returning(1), RecordingNotifier::default());

        sched.sweep_at(NOW).await;
        let headers = sched
            .notifier
            .events()
            .iter()
            .filter(|e| e.starts_with("header:"))
            .count();
        assert_eq!(headers, 1);
    }

    #[tokio::test]
    async fn test_paused_and_off_and_recent_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let store = store_with_user(
            &tmp,
            1,
            vec![
                saved("paused", Frequency::Daily, true, 0),
                saved("off", Frequency::Off, false, 0),
                saved("recent", Frequency::Daily, false, NOW - 3600),
            ],
        );
        let sched = scheduler(store.clone(), FixedSearch::returning(3), RecordingNotifier::default());

        let stats = sched.sweep_at(NOW).await;
        assert_eq!(stats.searches_due, 0);
        assert_eq!(stats.jobs_sent, 0);
        assert!(sched.notifier.events().is_empty());

        // Skipped searches keep their send timestamps untouched.
        let searches = store.list_saved_searches(1).unwrap();
        assert_eq!(searches[0].subscription.last_sent_ts, 0);
        assert_eq!(searches[2].subscription.last_sent_ts, NOW - 3600);
    }

    #[tokio::test]
    async fn test_due_boundary_is_inclusive() {
        let tmp = TempDir::new().unwrap();
        let store = store_with_user(
            &tmp,
            1,
            vec![saved("exact", Frequency::Daily, false, NOW - 86_400)],
        );
        let sched = scheduler(store, FixedSearch::returning(1), RecordingNotifier::default());

        let stats = sched.sweep_at(NOW).await;
        assert_eq!(stats.searches_due, 1);
    }

    #[tokio::test]
    async fn test_empty_result_advances_without_sending() {
        let tmp = TempDir::new().unwrap();
        let store = store_with_user(
            &tmp,
            1,
            vec![saved("quiet", Frequency::Weekly, false, 0)],
        );
        let sched = scheduler(store.clone(), FixedSearch::returning(0), RecordingNotifier::default());

        let stats = sched.sweep_at(NOW).await;
        assert_eq!(stats.jobs_sent, 0);
        assert!(sched.notifier.events().is_empty());

        let searches = store.list_saved_searches(1).unwrap();
        assert_eq!(searches[0].subscription.last_sent_ts, NOW);
    }

    #[tokio::test]
    async fn test_lookback_window_matches_cadence() {
        let tmp = TempDir::new().unwrap();
        let store = store_with_user(
            &tmp,
            1,
            vec![
                saved("daily", Frequency::Daily, false, 0),
                saved("weekly", Frequency::Weekly, false, 0),
            ],
        );
        let sched = scheduler(store, FixedSearch::returning(0), RecordingNotifier::default());

        sched.sweep_at(NOW).await;
        let seen = sched.search.seen_filters.lock().unwrap().clone();
        assert_eq!(seen[0].hours_old, Some(24));
        assert_eq!(seen[1].hours_old, Some(168));
    }

    #[tokio::test]
    async fn test_scraper_failure_advances_and_isolates() {
        let tmp = TempDir::new().unwrap();
        let store = store_with_user(
            &tmp,
            1,
            vec![saved("broken", Frequency::Daily, false, 0)],
        );
        store
            .mutate(2, |u| {
                u.saved_searches = vec![saved("fine", Frequency::Daily, false, 0)]
            })
            .unwrap();

        // The scraper fails for everyone here; both users still complete
        // and both searches advance.
        let sched = scheduler(store.clone(), FixedSearch::failing(), RecordingNotifier::default());
        let stats = sched.sweep_at(NOW).await;

        assert_eq!(stats.users_seen, 2);
        assert_eq!(stats.failures, 2);
        assert!(sched.notifier.events().is_empty());
        assert_eq!(
            store.list_saved_searches(1).unwrap()[0].subscription.last_sent_ts,
            NOW
        );
        assert_eq!(
            store.list_saved_searches(2).unwrap()[0].subscription.last_sent_ts,
            NOW
        );
    }

    #[tokio::test]
    async fn test_user_without_searches_is_untouched() {
        let tmp = TempDir::new().unwrap();
        let store = UserStore::new(tmp.path().join("users.json"));
        store.get(7).unwrap();

        let sched = scheduler(store, FixedSearch::returning(3), RecordingNotifier::default());
        let stats = sched.sweep_at(NOW).await;
        assert_eq!(stats.users_seen, 1);
        assert_eq!(stats.searches_due, 0);
        assert!(sched.notifier.events().is_empty());
    }
}
