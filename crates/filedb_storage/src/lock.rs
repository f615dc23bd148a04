//! Per-key advisory locks.
//!
//! Locks are `fs2` exclusive locks on a dedicated lock file next to the
//! entry. They exclude other holders in this process and in other processes,
//! since every acquisition opens its own file handle. They are advisory:
//! a writer that bypasses the protocol is not stopped.
//!
//! Lock files are never deleted. Unlinking a lock file while another
//! process is blocked on it would let that process lock an orphaned inode
//! while a third process locks a fresh file at the same path.

use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// Delay between attempts when acquiring with a timeout.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// An exclusive lock on one key, released on drop.
#[derive(Debug)]
pub struct KeyLock {
    file: File,
    path: PathBuf,
}

impl KeyLock {
    /// Acquires the lock at `path`, creating the lock file if needed.
    ///
    /// With `timeout` of `None` this blocks until the lock is free, with no
    /// upper bound. With `Some(limit)` it polls and gives up after `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::LockTimeout`] if the limit elapses, or
    /// [`StorageError::Io`] if the lock file cannot be opened or locked.
    pub fn acquire(path: &Path, timeout: Option<Duration>) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(StorageError::io("lock", parent))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(StorageError::io("lock", path))?;

        match timeout {
            None => file.lock_exclusive().map_err(StorageError::io("lock", path))?,
            Some(limit) => Self::poll(&file, path, limit)?,
        }

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    fn poll(file: &File, path: &Path, limit: Duration) -> StorageResult<()> {
        let contended = fs2::lock_contended_error().kind();
        let start = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == contended => {
                    let waited = start.elapsed();
                    if waited >= limit {
                        return Err(StorageError::LockTimeout {
                            path: path.to_path_buf(),
                            waited,
                        });
                    }
                    thread::sleep(POLL_INTERVAL.min(limit - waited));
                }
                Err(e) => return Err(StorageError::io("lock", path)(e)),
            }
        }
    }

    /// Returns the lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for KeyLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release key lock");
        }
    }
}
