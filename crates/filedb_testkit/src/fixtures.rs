//! Test fixtures and store helpers.
//!
//! Provides stores backed by temporary directories and helpers for
//! inspecting what the update protocol leaves on disk.

use filedb_core::{Backoff, Config, Store};
use filedb_storage::{LOCK_SUFFIX, STAGING_INFIX};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Configuration suited to tests: no fsync and a short backoff.
pub fn test_config() -> Config {
    Config::default()
        .sync_on_commit(false)
        .backoff(Backoff::new(Duration::from_millis(1), Duration::from_millis(5)))
}

/// A store in a temporary directory, removed on drop.
pub struct TestStore<T> {
    /// The store instance.
    pub store: Store<T>,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: TempDir,
}

impl<T> TestStore<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Creates a store in a fresh temporary directory.
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Creates a store in a fresh temporary directory with `config`.
    pub fn with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Store::open_with_config(temp_dir.path(), config)
            .expect("Failed to open test store");
        Self { store, temp_dir }
    }

    /// Returns the store root.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Opens an independent handle on the same root.
    ///
    /// Handles share nothing in memory, like stores in separate processes.
    pub fn reopen(&self) -> Store<T> {
        Store::open_with_config(self.path(), self.store.config().clone())
            .expect("Failed to reopen test store")
    }
}

impl<T> Default for TestStore<T>
where
    T: Serialize + DeserializeOwned,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::ops::Deref for TestStore<T> {
    type Target = Store<T>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary store.
///
/// # Example
///
/// ```rust,ignore
/// use filedb_testkit::with_temp_store;
///
/// #[test]
/// fn my_test() {
///     with_temp_store::<String, _, _>(|store| {
///         store.set("k", "v".into()).unwrap();
///     });
/// }
/// ```
pub fn with_temp_store<T, F, R>(f: F) -> R
where
    T: Serialize + DeserializeOwned,
    F: FnOnce(&Store<T>) -> R,
{
    let test_store = TestStore::<T>::new();
    f(&test_store.store)
}

/// Collects every staging and lock artifact under `root`, recursively.
pub fn artifacts(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.contains(STAGING_INFIX) || name.ends_with(LOCK_SUFFIX) {
                found.push(path);
            }
        }
    }

    found.sort();
    found
}

/// Collects only the staging files under `root`.
pub fn staging_files(root: &Path) -> Vec<PathBuf> {
    artifacts(root)
        .into_iter()
        .filter(|path| {
            path.file_name()
                .is_some_and(|name| name.to_string_lossy().contains(STAGING_INFIX))
        })
        .collect()
}

/// Writes a leftover staging file for `key`, as an interrupted writer would.
pub fn plant_staging_file(root: &Path, key: &str, contents: &[u8]) -> PathBuf {
    let entry = key_path(root, key);
    let name = format!(
        "{}{STAGING_INFIX}crashed",
        entry.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
    );
    let path = entry.with_file_name(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(&path, contents).expect("Failed to write staging file");
    path
}

/// Returns the entry path for `key` under `root`.
pub fn key_path(root: &Path, key: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    path.extend(key.split('/'));
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_store_is_initialized() {
        let store = TestStore::<String>::new();
        assert!(store.path().join(".filedb").is_dir());
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn reopened_handle_sees_writes() {
        let store = TestStore::<u32>::new();
        store.set("k", 5).unwrap();

        let other = store.reopen();
        assert_eq!(other.get("k").unwrap(), Some(5));
    }

    #[test]
    fn artifacts_are_found() {
        let store = TestStore::<u32>::new();
        store.set("a/b", 1).unwrap();
        let planted = plant_staging_file(store.path(), "a/b", b"{");

        let found = artifacts(store.path());
        assert!(found.contains(&planted));
        assert!(found.contains(&store.path().join("a").join("b...lock")));
        assert_eq!(staging_files(store.path()), vec![planted]);
    }
}
