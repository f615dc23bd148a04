//! Versioned entries and their typed persistence.

use crate::error::{CoreError, CoreResult};
use filedb_codec::Codec;
use filedb_storage::{FileStore, Key, KeyLock, StagedFile};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// The persisted unit for a key.
///
/// A key without an entry file behaves as version `0` with no document;
/// that state is never written. The first commit writes version `1` and
/// every later commit increments it by exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry<T> {
    /// Number of commits since the key was last created.
    pub version: u64,
    /// The document.
    pub doc: T,
}

/// Only the version of a stored entry; the document is skipped.
#[derive(Deserialize)]
struct VersionView {
    version: u64,
}

/// Reads and writes entries through a codec.
///
/// `EntryStore` adds encoding to [`FileStore`]. It attaches the key to every
/// codec failure and otherwise passes storage errors through.
#[derive(Debug, Clone)]
pub struct EntryStore<C> {
    files: FileStore,
    codec: C,
}

impl<C: Codec> EntryStore<C> {
    /// Wraps an opened file store.
    pub fn new(files: FileStore, codec: C) -> Self {
        Self { files, codec }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.files.root()
    }

    /// Returns the codec.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Reads and decodes the entry for a key.
    pub fn read<T: DeserializeOwned>(&self, key: &Key) -> CoreResult<Option<Entry<T>>> {
        match self.files.read(key)? {
            Some(bytes) => self.decode(key, &bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Reads only the version of the entry for a key, `0` if absent.
    pub fn read_version(&self, key: &Key) -> CoreResult<u64> {
        match self.files.read(key)? {
            Some(bytes) => Ok(self.decode::<VersionView>(key, &bytes)?.version),
            None => Ok(0),
        }
    }

    /// Encodes an entry into a staging file next to the key's entry.
    pub fn stage<T: Serialize>(&self, key: &Key, entry: &Entry<T>) -> CoreResult<StagedFile> {
        let bytes = self
            .codec
            .encode(entry)
            .map_err(|e| CoreError::codec(key.as_str(), e))?;
        Ok(self.files.stage(key, &bytes)?)
    }

    /// Atomically replaces the key's entry with a staged file.
    pub fn commit(&self, staged: StagedFile) -> CoreResult<()> {
        Ok(self.files.commit(staged)?)
    }

    /// Removes the entry for a key; returns whether one existed.
    pub fn remove(&self, key: &Key) -> CoreResult<bool> {
        Ok(self.files.remove(key)?)
    }

    /// Acquires the exclusive lock for a key.
    pub fn lock(&self, key: &Key, timeout: Option<Duration>) -> CoreResult<KeyLock> {
        Ok(self.files.lock(key, timeout)?)
    }

    /// Lists keys directly under a prefix.
    pub fn list(&self, prefix: &str) -> CoreResult<Vec<Key>> {
        Ok(self.files.list(prefix)?)
    }

    fn decode<V: DeserializeOwned>(&self, key: &Key, bytes: &[u8]) -> CoreResult<V> {
        self.codec
            .decode(bytes)
            .map_err(|e| CoreError::codec(key.as_str(), e))
    }
}
