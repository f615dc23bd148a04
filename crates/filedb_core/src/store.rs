//! The public document store.

use crate::config::Config;
use crate::entry::{Entry, EntryStore};
use crate::error::CoreResult;
use crate::retry::Retries;
use filedb_codec::{Codec, JsonCodec};
use filedb_storage::{FileStore, Key};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;

/// A directory of documents of type `T`, one file per key.
///
/// Any number of `Store` handles, in any number of processes, may share a
/// root. Writes for one key are serialized by a per-key file lock held only
/// while a staged entry is checked and renamed into place. Reads never lock.
///
/// For schemaless documents use `Store<serde_json::Value>`.
///
/// # Opening a Store
///
/// ```rust,ignore
/// use filedb_core::{Config, Store};
///
/// let store: Store<Profile> = Store::open("data/profiles")?;
///
/// let config = Config::default().lock_timeout(Some(Duration::from_secs(5)));
/// let store: Store<Profile> = Store::open_with_config("data/profiles", config)?;
///
/// let store: Store<Profile, CborCodec> =
///     Store::open_with_codec("data/profiles", Config::default(), CborCodec::new())?;
/// ```
pub struct Store<T, C = JsonCodec> {
    pub(crate) entries: EntryStore<C>,
    pub(crate) config: Config,
    _doc: PhantomData<fn() -> T>,
}

impl<T, C: Clone> Clone for Store<T, C> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            config: self.config.clone(),
            _doc: PhantomData,
        }
    }
}

impl<T, C: fmt::Debug> fmt::Debug for Store<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("entries", &self.entries)
            .field("config", &self.config)
            .finish()
    }
}

impl<T> Store<T, JsonCodec>
where
    T: Serialize + DeserializeOwned,
{
    /// Opens the store at `root` with the default configuration.
    ///
    /// An empty (or missing) root is initialized with the `.filedb` marker.
    ///
    /// # Errors
    ///
    /// Returns an error if the root is non-empty without a marker or cannot
    /// be read.
    pub fn open(root: impl AsRef<Path>) -> CoreResult<Self> {
        Self::open_with_config(root, Config::default())
    }

    /// Opens the store at `root` with a custom configuration.
    pub fn open_with_config(root: impl AsRef<Path>, config: Config) -> CoreResult<Self> {
        Self::open_with_codec(root, config, JsonCodec::new())
    }
}

impl<T, C> Store<T, C>
where
    T: Serialize + DeserializeOwned,
    C: Codec,
{
    /// Opens the store at `root` with a custom configuration and codec.
    ///
    /// Every handle on one root must use the same codec.
    pub fn open_with_codec(root: impl AsRef<Path>, config: Config, codec: C) -> CoreResult<Self> {
        let files = FileStore::open(root.as_ref(), config.create_if_missing)?
            .sync_on_commit(config.sync_on_commit);
        tracing::debug!(
            root = %root.as_ref().display(),
            codec = codec.name(),
            "opened store"
        );

        Ok(Self {
            entries: EntryStore::new(files, codec),
            config,
            _doc: PhantomData,
        })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.entries.root()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the document for a key, or `None` if the key does not exist.
    pub fn get(&self, key: &str) -> CoreResult<Option<T>> {
        Ok(self.get_entry(key)?.map(|entry| entry.doc))
    }

    /// Returns the document for a key together with its version.
    pub fn get_entry(&self, key: &str) -> CoreResult<Option<Entry<T>>> {
        let key = Key::parse(key)?;
        self.entries.read(&key)
    }

    /// Returns the current version of a key, `0` if it does not exist.
    pub fn version(&self, key: &str) -> CoreResult<u64> {
        let key = Key::parse(key)?;
        self.entries.read_version(&key)
    }

    /// Lists the keys stored directly under `prefix`, in lexicographic order.
    ///
    /// `""` lists the root. Subdirectories and in-flight staging or lock
    /// files are not keys and are never returned.
    pub fn list(&self, prefix: &str) -> CoreResult<Vec<String>> {
        Ok(self
            .entries
            .list(prefix)?
            .into_iter()
            .map(|key| key.as_str().to_string())
            .collect())
    }

    /// Stores a document, retrying conflicts per `Config::default_retries`.
    pub fn set(&self, key: &str, doc: T) -> CoreResult<()>
    where
        T: Clone,
    {
        self.set_with_retry(key, doc, self.config.default_retries)
    }

    /// Stores a document, retrying conflicts up to `retries` times.
    pub fn set_with_retry(&self, key: &str, doc: T, retries: Retries) -> CoreResult<()>
    where
        T: Clone,
    {
        self.update(key, |_| Ok(Some(doc.clone())), retries)?;
        Ok(())
    }

    /// Deletes a key. Deleting a missing key succeeds.
    ///
    /// The next write to the key starts again at version 1.
    pub fn delete(&self, key: &str) -> CoreResult<()> {
        self.update(key, |_| Ok(None), Retries::NONE)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::Backoff;
    use filedb_codec::CborCodec;
    use filedb_storage::StorageError;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        visits: u32,
    }

    fn quiet() -> Config {
        Config::default()
            .sync_on_commit(false)
            .backoff(Backoff::none())
    }

    #[test]
    fn get_never_written_is_none() {
        let dir = tempdir().unwrap();
        let store: Store<String> = Store::open(dir.path()).unwrap();

        assert_eq!(store.get("missing").unwrap(), None);
        assert_eq!(store.get("a/b/c").unwrap(), None);
        assert_eq!(store.version("missing").unwrap(), 0);
    }

    #[test]
    fn set_then_get_roundtrip() {
        let dir = tempdir().unwrap();
        let store: Store<Profile> = Store::open_with_config(dir.path(), quiet()).unwrap();
        let profile = Profile {
            name: "alice".into(),
            visits: 3,
        };

        store.set("users/alice", profile.clone()).unwrap();

        assert_eq!(store.get("users/alice").unwrap(), Some(profile.clone()));
        assert_eq!(
            store.get_entry("users/alice").unwrap(),
            Some(Entry {
                version: 1,
                doc: profile
            })
        );
    }

    #[test]
    fn cbor_store_roundtrip() {
        let dir = tempdir().unwrap();
        let store: Store<Profile, CborCodec> =
            Store::open_with_codec(dir.path(), quiet(), CborCodec::new()).unwrap();
        let profile = Profile {
            name: "bob".into(),
            visits: 0,
        };

        store.set("bob", profile.clone()).unwrap();
        assert_eq!(store.get("bob").unwrap(), Some(profile));
    }

    #[test]
    fn versions_count_commits() {
        let dir = tempdir().unwrap();
        let store: Store<u32> = Store::open_with_config(dir.path(), quiet()).unwrap();

        for i in 0..5 {
            store.set("n", i).unwrap();
        }

        assert_eq!(store.version("n").unwrap(), 5);
        assert_eq!(store.get("n").unwrap(), Some(4));
    }

    #[test]
    fn delete_resets_version() {
        let dir = tempdir().unwrap();
        let store: Store<String> = Store::open_with_config(dir.path(), quiet()).unwrap();

        store.set("k", "one".into()).unwrap();
        store.set("k", "two".into()).unwrap();
        assert_eq!(store.version("k").unwrap(), 2);

        store.delete("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        assert!(!dir.path().join("k").exists());

        store.set("k", "three".into()).unwrap();
        assert_eq!(store.version("k").unwrap(), 1);
    }

    #[test]
    fn delete_missing_key_succeeds() {
        let dir = tempdir().unwrap();
        let store: Store<String> = Store::open(dir.path()).unwrap();
        store.delete("never/was").unwrap();
    }

    #[test]
    fn list_returns_full_keys() {
        let dir = tempdir().unwrap();
        let store: Store<u8> = Store::open_with_config(dir.path(), quiet()).unwrap();
        store.set("top", 1).unwrap();
        store.set("dir/a", 2).unwrap();
        store.set("dir/b", 3).unwrap();
        store.set("dir/nested/c", 4).unwrap();

        assert_eq!(store.list("").unwrap(), vec!["top"]);
        assert_eq!(store.list("dir").unwrap(), vec!["dir/a", "dir/b"]);
        assert_eq!(store.list("dir/nested/").unwrap(), vec!["dir/nested/c"]);
        assert!(store.list("nothing").unwrap().is_empty());
    }

    #[test]
    fn invalid_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let store: Store<u8> = Store::open(dir.path()).unwrap();

        for bad in ["", "../escape", "/abs", "a...lock", ".filedb"] {
            assert!(
                matches!(
                    store.set(bad, 1),
                    Err(CoreError::Storage(StorageError::InvalidKey { .. }))
                ),
                "accepted {bad:?}"
            );
        }
        assert!(store.get("../escape").is_err());
    }

    #[test]
    fn open_rejects_foreign_directory() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"mine").unwrap();

        let result = Store::<String>::open(dir.path());
        assert!(matches!(
            result,
            Err(CoreError::Storage(StorageError::NotAStore { .. }))
        ));
    }

    #[test]
    fn open_without_create_requires_root() {
        let dir = tempdir().unwrap();
        let config = Config::default().create_if_missing(false);
        let result = Store::<String>::open_with_config(dir.path().join("missing"), config);
        assert!(result.is_err());
    }

    #[test]
    fn dynamic_documents() {
        let dir = tempdir().unwrap();
        let store: Store<serde_json::Value> =
            Store::open_with_config(dir.path(), quiet()).unwrap();
        let doc = serde_json::json!({"tags": ["a", "b"], "score": 1.5, "none": null});

        store.set("doc", doc.clone()).unwrap();
        assert_eq!(store.get("doc").unwrap(), Some(doc));

        // A stored null is a document, not a deletion
        store.set("null", serde_json::Value::Null).unwrap();
        assert_eq!(store.get("null").unwrap(), Some(serde_json::Value::Null));
        assert_eq!(store.version("null").unwrap(), 1);
    }

    #[test]
    fn handles_clone_for_any_document_type() {
        // Neither Clone nor Debug
        #[derive(Serialize, Deserialize, PartialEq)]
        struct Opaque(u32);

        let dir = tempdir().unwrap();
        let store: Store<Opaque> = Store::open_with_config(dir.path(), quiet()).unwrap();
        let other = store.clone();

        store
            .update("k", |_| Ok(Some(Opaque(7))), Retries::NONE)
            .unwrap();
        assert!(other.get("k").unwrap() == Some(Opaque(7)));
        assert!(format!("{other:?}").starts_with("Store"));
    }
}
