//! Cross-process advisory locking for the user store.
//!
//! The store file is shared with other cooperating processes (a second
//! service instance, the digest task run out-of-process), so an in-memory
//! mutex is not enough. A `ScopedLock` holds an exclusive advisory lock on
//! the store's `.lock` sidecar and releases it on every exit path.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{AppError, Result};

/// How often a blocked acquisition re-attempts the lock.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Exclusive advisory file lock, released when dropped.
///
/// Acquisition is bounded: a holder that never releases turns into a
/// `LockTimeout` error for its peers instead of an indefinite hang.
#[derive(Debug)]
pub struct ScopedLock {
    file: File,
    path: PathBuf,
}

impl ScopedLock {
    /// Acquire the lock at `path`, waiting at most `timeout`.
    ///
    /// The lock file's content is irrelevant; only the lock matters.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;

        let start = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Err(_) if start.elapsed() < timeout => std::thread::sleep(POLL_INTERVAL),
                Err(_) => {
                    return Err(AppError::LockTimeout {
                        path: path.display().to_string(),
                        waited: start.elapsed(),
                    });
                }
            }
        }
    }
}

impl Drop for ScopedLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            log::warn!("store: failed to release lock {}: {}", self.path.display(), e);
        }
    }
}
