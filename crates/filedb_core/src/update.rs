//! Optimistic read-modify-write.

use crate::entry::Entry;
use crate::error::{ApplyError, CoreError, CoreResult};
use crate::retry::Retries;
use crate::store::Store;
use filedb_codec::Codec;
use filedb_storage::Key;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::thread;

/// Outcome of one update attempt.
enum Attempt<T> {
    /// The attempt committed (or deleted); carries the resulting document.
    Done(Option<T>),
    /// The version changed before the commit; nothing was written.
    Conflict { found: u64 },
}

impl<T, C> Store<T, C>
where
    T: Serialize + DeserializeOwned,
    C: Codec,
{
    /// Atomically transforms the document stored under `key`.
    ///
    /// `apply` receives the current document (`None` if the key does not
    /// exist) and returns:
    /// - `Ok(Some(doc))` to store `doc` as the next version
    /// - `Ok(None)` to delete the key
    /// - `Err(e)` to abort; `e` is returned as [`CoreError::Apply`]
    ///
    /// If another writer commits the key while `apply` runs, the attempt is
    /// discarded and repeated with the newer document, up to `retries`
    /// times, pausing per [`Config::backoff`](crate::Config::backoff)
    /// between attempts. `apply` may therefore run more than once and should
    /// have no side effects beyond its return value.
    ///
    /// Returns the document now stored, or `None` after a deletion.
    ///
    /// # Errors
    ///
    /// - [`CoreError::ConcurrentModification`] once retries are exhausted
    /// - [`CoreError::Apply`], [`CoreError::Codec`] and
    ///   [`CoreError::Storage`] immediately, without retrying
    ///
    /// Whatever the outcome, staging files and the key lock are released.
    pub fn update<F>(&self, key: &str, mut apply: F, retries: Retries) -> CoreResult<Option<T>>
    where
        F: FnMut(Option<T>) -> Result<Option<T>, ApplyError>,
    {
        let key = Key::parse(key)?;
        let mut conflicts: u32 = 0;

        loop {
            match self.attempt(&key, &mut apply)? {
                Attempt::Done(doc) => return Ok(doc),
                Attempt::Conflict { found } => {
                    conflicts = conflicts.saturating_add(1);
                    if !retries.permits(conflicts) {
                        tracing::warn!(
                            key = %key,
                            conflicts,
                            found,
                            "giving up after concurrent modifications"
                        );
                        return Err(CoreError::concurrent_modification(key.as_str()));
                    }

                    let delay = self.config.backoff.delay();
                    tracing::debug!(
                        key = %key,
                        conflicts,
                        found,
                        delay_ms = delay.as_millis() as u64,
                        "concurrent modification, retrying"
                    );
                    thread::sleep(delay);
                }
            }
        }
    }

    /// One pass of read, apply, stage, lock, verify and commit.
    ///
    /// Only the verify-and-commit step holds the key lock.
    fn attempt<F>(&self, key: &Key, apply: &mut F) -> CoreResult<Attempt<T>>
    where
        F: FnMut(Option<T>) -> Result<Option<T>, ApplyError>,
    {
        let (base, current) = match self.entries.read::<T>(key)? {
            Some(entry) => (entry.version, Some(entry.doc)),
            None => (0, None),
        };

        let next = apply(current).map_err(|source| CoreError::Apply {
            key: key.to_string(),
            source,
        })?;

        let Some(doc) = next else {
            // A writer racing with the removal fails its own version check
            let removed = self.entries.remove(key)?;
            tracing::debug!(key = %key, removed, "deleted entry");
            return Ok(Attempt::Done(None));
        };

        let version = base + 1;
        let staged = self.entries.stage(key, &Entry { version, doc: &doc })?;
        let _lock = self.entries.lock(key, self.config.lock_timeout)?;

        let found = self.entries.read_version(key)?;
        if found != base {
            tracing::debug!(key = %key, expected = base, found, "version changed since read");
            return Ok(Attempt::Conflict { found });
        }

        self.entries.commit(staged)?;
        tracing::debug!(key = %key, version, "committed entry");
        Ok(Attempt::Done(Some(doc)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Backoff, Config};
    use filedb_storage::{KeyLock, StorageError};
    use std::cell::Cell;
    use std::fmt;
    use std::panic::{self, AssertUnwindSafe};
    use std::path::Path;
    use std::time::Duration;
    use tempfile::tempdir;

    #[derive(Debug)]
    struct Refused(&'static str);

    impl fmt::Display for Refused {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "refused: {}", self.0)
        }
    }

    impl std::error::Error for Refused {}

    fn open<T: Serialize + DeserializeOwned>(dir: &Path) -> Store<T> {
        let config = Config::default()
            .sync_on_commit(false)
            .backoff(Backoff::none());
        Store::open_with_config(dir, config).unwrap()
    }

    /// Names of all files under `dir` that are staging artifacts.
    fn staging_files(dir: &Path) -> Vec<String> {
        let mut found = Vec::new();
        let mut pending = vec![dir.to_path_buf()];
        while let Some(current) = pending.pop() {
            for entry in std::fs::read_dir(&current).unwrap() {
                let entry = entry.unwrap();
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                } else {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    if name.contains(filedb_storage::STAGING_INFIX) {
                        found.push(name);
                    }
                }
            }
        }
        found
    }

    #[test]
    fn example_scenario() {
        let dir = tempdir().unwrap();
        let store: Store<String> = open(dir.path());
        assert!(dir.path().join(".filedb").is_dir());

        store.set("a/b", "v1".into()).unwrap();
        assert_eq!(store.version("a/b").unwrap(), 1);
        assert_eq!(store.get("a/b").unwrap().as_deref(), Some("v1"));

        let result = store
            .update(
                "a/b",
                |old| Ok(Some(old.unwrap_or_default() + "x")),
                Retries::NONE,
            )
            .unwrap();
        assert_eq!(result.as_deref(), Some("v1x"));
        assert_eq!(store.version("a/b").unwrap(), 2);

        store.delete("a/b").unwrap();
        assert!(!dir.path().join("a").join("b").exists());
        assert_eq!(store.get("a/b").unwrap(), None);
    }

    #[test]
    fn update_sees_absent_document_first() {
        let dir = tempdir().unwrap();
        let store: Store<u64> = open(dir.path());

        let seen = Cell::new(None);
        store
            .update(
                "counter",
                |old| {
                    seen.set(Some(old));
                    Ok(Some(old.unwrap_or(0) + 1))
                },
                Retries::NONE,
            )
            .unwrap();

        assert_eq!(seen.get(), Some(None));
        assert_eq!(store.get_entry("counter").unwrap().unwrap().version, 1);
    }

    #[test]
    fn returning_none_deletes() {
        let dir = tempdir().unwrap();
        let store: Store<u64> = open(dir.path());
        store.set("k", 9).unwrap();

        let result = store.update("k", |_| Ok(None), Retries::NONE).unwrap();

        assert_eq!(result, None);
        assert_eq!(store.version("k").unwrap(), 0);
    }

    #[test]
    fn apply_error_is_returned_without_retry() {
        let dir = tempdir().unwrap();
        let store: Store<u64> = open(dir.path());
        store.set("k", 1).unwrap();

        let calls = Cell::new(0);
        let result = store.update(
            "k",
            |_| {
                calls.set(calls.get() + 1);
                Err(Box::new(Refused("odd")) as ApplyError)
            },
            Retries::Infinite,
        );

        match result {
            Err(CoreError::Apply { key, source }) => {
                assert_eq!(key, "k");
                assert_eq!(source.downcast_ref::<Refused>().unwrap().0, "odd");
            }
            other => panic!("expected apply error, got {other:?}"),
        }
        assert_eq!(calls.get(), 1);
        assert_eq!(store.get_entry("k").unwrap().unwrap().version, 1);
        assert!(staging_files(dir.path()).is_empty());
    }

    #[test]
    fn conflict_without_retries_changes_nothing() {
        let dir = tempdir().unwrap();
        let store: Store<String> = open(dir.path());
        store.set("k", "base".into()).unwrap();

        // A second writer commits between this update's read and its commit
        let result = store.update(
            "k",
            |_| {
                store.set("k", "rival".into()).unwrap();
                Ok(Some("mine".into()))
            },
            Retries::NONE,
        );

        assert!(matches!(
            result,
            Err(CoreError::ConcurrentModification { ref key }) if key == "k"
        ));
        assert_eq!(store.get("k").unwrap().as_deref(), Some("rival"));
        assert_eq!(store.version("k").unwrap(), 2);
        assert!(staging_files(dir.path()).is_empty());
    }

    #[test]
    fn conflict_is_retried_with_fresh_document() {
        let dir = tempdir().unwrap();
        let store: Store<String> = open(dir.path());
        store.set("k", "base".into()).unwrap();

        let calls = Cell::new(0);
        let result = store
            .update(
                "k",
                |old| {
                    calls.set(calls.get() + 1);
                    if calls.get() == 1 {
                        store.set("k", "rival".into()).unwrap();
                    }
                    Ok(Some(format!("{}+mine", old.unwrap_or_default())))
                },
                Retries::Finite(1),
            )
            .unwrap();

        assert_eq!(calls.get(), 2);
        assert_eq!(result.as_deref(), Some("rival+mine"));
        assert_eq!(store.version("k").unwrap(), 3);
    }

    #[test]
    fn finite_retries_are_exhausted() {
        let dir = tempdir().unwrap();
        let store: Store<u32> = open(dir.path());

        let calls = Cell::new(0);
        let result = store.update(
            "k",
            |_| {
                calls.set(calls.get() + 1);
                store.set("k", calls.get()).unwrap();
                Ok(Some(0))
            },
            Retries::Finite(2),
        );

        assert!(result.unwrap_err().is_concurrent_modification());
        assert_eq!(calls.get(), 3);
        assert_eq!(store.version("k").unwrap(), 3);
        assert!(staging_files(dir.path()).is_empty());
    }

    #[test]
    fn delete_during_update_is_a_conflict() {
        let dir = tempdir().unwrap();
        let store: Store<u32> = open(dir.path());
        store.set("k", 1).unwrap();
        store.set("k", 2).unwrap();

        let result = store.update(
            "k",
            |old| {
                store.delete("k").unwrap();
                Ok(old.map(|n| n + 1))
            },
            Retries::NONE,
        );

        assert!(result.unwrap_err().is_concurrent_modification());
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn panicking_apply_leaves_no_artifacts() {
        let dir = tempdir().unwrap();
        let store: Store<u32> = open(dir.path());
        store.set("k", 1).unwrap();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            store.update("k", |_| panic!("boom"), Retries::NONE)
        }));

        assert!(result.is_err());
        assert!(staging_files(dir.path()).is_empty());
        // The lock is free for the next writer
        store.set("k", 2).unwrap();
        assert_eq!(store.version("k").unwrap(), 2);
    }

    #[test]
    fn lock_timeout_aborts_and_cleans_up() {
        let dir = tempdir().unwrap();
        let config = Config::default()
            .sync_on_commit(false)
            .lock_timeout(Some(Duration::from_millis(30)));
        let store: Store<u32> = Store::open_with_config(dir.path(), config).unwrap();
        store.set("k", 1).unwrap();

        let _held = KeyLock::acquire(&dir.path().join("k...lock"), None).unwrap();
        let result = store.set("k", 2);

        assert!(matches!(
            result,
            Err(CoreError::Storage(StorageError::LockTimeout { .. }))
        ));
        assert!(staging_files(dir.path()).is_empty());
        assert_eq!(store.get("k").unwrap(), Some(1));
    }

    #[test]
    fn unencodable_document_is_codec_error() {
        use std::collections::BTreeMap;

        let dir = tempdir().unwrap();
        let store: Store<BTreeMap<(u8, u8), u8>> = open(dir.path());
        let mut doc = BTreeMap::new();
        doc.insert((1, 2), 3);

        let result = store.set("k", doc);

        assert!(matches!(result, Err(CoreError::Codec { .. })));
        assert_eq!(store.version("k").unwrap(), 0);
        assert!(staging_files(dir.path()).is_empty());
    }
}
