//! File-backed document store for user records.
//!
//! Single source of truth for all per-user state, safe under concurrent
//! writers from multiple cooperating processes and resilient to abrupt
//! termination mid-write.
//!
//! ## Storage Layout
//!
//! ```text
//! data/
//! ├── users.json        # Primary: one object keyed by stringified user id
//! ├── users.json.bak    # Last known-good snapshot (one write behind)
//! └── users.json.lock   # Advisory lock handle (content irrelevant)
//! ```
//!
//! Every write serializes the full map to a temp file in the same
//! directory, fsyncs it, copies the current primary to the `.bak` sidecar,
//! then atomically renames the temp file over the primary. A load that
//! fails to parse the primary falls back to the backup, then to an empty
//! map; which source was used is reported on the snapshot rather than kept
//! in ambient state.
//!
//! Critical sections hold the advisory lock and do file I/O only. Network
//! calls stay outside so lock hold time stays bounded.

pub mod lock;

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::models::{FilterSet, JobRecord, SavedSearch, StoreConfig, UserRecord};

pub use lock::ScopedLock;

/// Which on-disk source a load was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Primary file parsed cleanly
    Primary,
    /// Primary was corrupt; the backup sidecar was used
    Backup,
    /// Neither file was usable (or the store is new)
    Empty,
}

/// A point-in-time view of the whole store.
#[derive(Debug)]
pub struct Snapshot {
    /// All records, keyed by stringified user id
    pub records: BTreeMap<String, UserRecord>,
    /// Where the data came from
    pub source: LoadSource,
}

/// The user record store.
#[derive(Debug, Clone)]
pub struct UserStore {
    path: PathBuf,
    backup_path: PathBuf,
    lock_path: PathBuf,
    lock_timeout: Duration,
}

/// Build a sidecar path by appending `suffix` to the primary file name.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

impl UserStore {
    /// Create a store rooted at the given primary path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_lock_timeout(path, Duration::from_secs(5))
    }

    /// Create a store with a custom lock acquisition bound.
    pub fn with_lock_timeout(path: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        let path = path.into();
        let backup_path = sibling(&path, ".bak");
        let lock_path = sibling(&path, ".lock");
        Self {
            path,
            backup_path,
            lock_path,
            lock_timeout,
        }
    }

    /// Create a store from configuration.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::with_lock_timeout(&config.path, Duration::from_secs(config.lock_timeout_secs))
    }

    /// Path of the primary store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the store without taking the lock.
    ///
    /// Best-effort: a concurrent writer may make the result slightly stale.
    /// Used for id listing and diagnostics; mutations always re-read under
    /// the lock.
    pub fn load(&self) -> Result<Snapshot> {
        self.read_unlocked()
    }

    /// Return the record for `id`, materializing and persisting defaults
    /// when it does not exist yet.
    pub fn get(&self, id: u64) -> Result<UserRecord> {
        let _lock = ScopedLock::acquire(&self.lock_path, self.lock_timeout)?;
        let mut snapshot = self.read_unlocked()?;
        let key = id.to_string();
        match snapshot.records.get(&key) {
            Some(record) => Ok(record.clone()),
            None => {
                let record = UserRecord::default();
                snapshot.records.insert(key, record.clone());
                self.write_unlocked(&snapshot.records)?;
                Ok(record)
            }
        }
    }

    /// Load the record for `id` (or defaults), apply `apply`, persist the
    /// result. The whole cycle runs inside one lock-held critical section,
    /// so concurrent mutations cannot interleave.
    ///
    /// The closure must not block on network I/O; fetch first, mutate after.
    pub fn mutate<T>(&self, id: u64, apply: impl FnOnce(&mut UserRecord) -> T) -> Result<T> {
        let _lock = ScopedLock::acquire(&self.lock_path, self.lock_timeout)?;
        let mut snapshot = self.read_unlocked()?;
        let record = snapshot.records.entry(id.to_string()).or_default();
        let out = apply(record);
        self.write_unlocked(&snapshot.records)?;
        Ok(out)
    }

    /// Remove the record for `id` entirely. Idempotent.
    pub fn delete(&self, id: u64) -> Result<()> {
        let _lock = ScopedLock::acquire(&self.lock_path, self.lock_timeout)?;
        let mut snapshot = self.read_unlocked()?;
        if snapshot.records.remove(&id.to_string()).is_some() {
            self.write_unlocked(&snapshot.records)?;
        }
        Ok(())
    }

    /// List all known user ids without taking the write lock.
    ///
    /// Keys that do not parse as ids are skipped. Digest callers re-validate
    /// each id with its own `get`.
    pub fn list_ids(&self) -> Result<Vec<u64>> {
        let snapshot = self.read_unlocked()?;
        Ok(snapshot
            .records
            .keys()
            .filter_map(|k| k.parse().ok())
            .collect())
    }

    // --- Convenience operations over single records ---

    /// Bookmark a job. Returns false when a favorite with the same
    /// canonical URL already exists.
    pub fn save_favorite(&self, id: u64, job: JobRecord) -> Result<bool> {
        self.mutate(id, |user| user.add_favorite(job))
    }

    pub fn list_favorites(&self, id: u64) -> Result<Vec<JobRecord>> {
        Ok(self.get(id)?.favorites)
    }

    pub fn clear_favorites(&self, id: u64) -> Result<()> {
        self.mutate(id, |user| user.favorites.clear())
    }

    /// Save a filter set under a name, overwriting in place and preserving
    /// any existing subscription.
    pub fn save_search(&self, id: u64, name: &str, filters: FilterSet) -> Result<()> {
        self.mutate(id, |user| user.upsert_saved_search(name, filters))
    }

    pub fn list_saved_searches(&self, id: u64) -> Result<Vec<SavedSearch>> {
        Ok(self.get(id)?.saved_searches)
    }

    /// Patch the saved search at `idx`. An out-of-range index is a no-op.
    pub fn update_saved_search(
        &self,
        id: u64,
        idx: usize,
        apply: impl FnOnce(&mut SavedSearch),
    ) -> Result<()> {
        self.mutate(id, |user| {
            if let Some(search) = user.saved_searches.get_mut(idx) {
                apply(search);
            }
        })
    }

    /// Replace the stored feed snapshot.
    pub fn save_last_results(&self, id: u64, jobs: Vec<JobRecord>) -> Result<()> {
        self.mutate(id, |user| user.last_results = jobs)
    }

    pub fn get_last_results(&self, id: u64) -> Result<Vec<JobRecord>> {
        Ok(self.get(id)?.last_results)
    }

    /// Full record for data export.
    pub fn export(&self, id: u64) -> Result<UserRecord> {
        self.get(id)
    }

    // --- Disk protocol ---

    fn read_unlocked(&self) -> Result<Snapshot> {
        if !self.path.exists() {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&self.path, b"{}")?;
            return Ok(Snapshot {
                records: BTreeMap::new(),
                source: LoadSource::Empty,
            });
        }

        let bytes = fs::read(&self.path)?;
        match serde_json::from_slice(&bytes) {
            Ok(records) => Ok(Snapshot {
                records,
                source: LoadSource::Primary,
            }),
            Err(e) => {
                log::warn!("store: primary file corrupted, trying backup: {}", e);
                self.read_backup()
            }
        }
    }

    fn read_backup(&self) -> Result<Snapshot> {
        match fs::read(&self.backup_path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(records) => {
                    log::warn!(
                        "store: recovered from backup snapshot {}",
                        self.backup_path.display()
                    );
                    Ok(Snapshot {
                        records,
                        source: LoadSource::Backup,
                    })
                }
                Err(e) => {
                    log::error!("store: backup also corrupted, starting empty: {}", e);
                    Ok(Snapshot {
                        records: BTreeMap::new(),
                        source: LoadSource::Empty,
                    })
                }
            },
            Err(_) => {
                log::error!("store: no usable backup, starting empty");
                Ok(Snapshot {
                    records: BTreeMap::new(),
                    source: LoadSource::Empty,
                })
            }
        }
    }

    fn write_unlocked(&self, records: &BTreeMap<String, UserRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_vec_pretty(records)?;

        let tmp = sibling(&self.path, ".tmp");
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&serialized)?;
        file.sync_all()?;
        drop(file);

        // Keep the outgoing primary as the known-good fallback. Best-effort:
        // a failed backup never blocks the primary write.
        if self.path.exists() {
            if let Err(e) = fs::copy(&self.path, &self.backup_path) {
                log::warn!(
                    "store: could not refresh backup {}: {}",
                    self.backup_path.display(),
                    e
                );
            }
        }

        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
