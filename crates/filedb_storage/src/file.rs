//! Entry files under a store root.

use crate::error::{StorageError, StorageResult};
use crate::layout::{is_artifact, normalize_prefix, Key, Layout, MARKER};
use crate::lock::KeyLock;
use crate::staging::StagedFile;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

/// Byte-level access to the entry files of one store.
///
/// `FileStore` never interprets entry contents. It guarantees that a
/// committed entry replaces its predecessor in a single `rename`, so a
/// reader that does not take the key lock still sees either the old or the
/// new file in full.
///
/// # Durability
///
/// With `sync_on_commit` enabled (the default), staged files are fsynced
/// before they are committed and the parent directory is fsynced after the
/// rename or removal.
#[derive(Debug, Clone)]
pub struct FileStore {
    layout: Layout,
    sync: bool,
}

impl FileStore {
    /// Opens the store rooted at `root`, initializing it when empty.
    ///
    /// An empty directory receives the `.filedb` marker. A non-empty
    /// directory must already carry it.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The root does not exist and `create_if_missing` is false
    /// - The root is not a directory, or is non-empty without a marker
    ///   (`NotAStore`)
    /// - I/O errors occur
    pub fn open(root: &Path, create_if_missing: bool) -> StorageResult<Self> {
        if create_if_missing {
            fs::create_dir_all(root).map_err(StorageError::io("open", root))?;
        }

        let metadata = fs::metadata(root).map_err(StorageError::io("open", root))?;
        if !metadata.is_dir() {
            return Err(StorageError::NotAStore {
                root: root.to_path_buf(),
                reason: "root is not a directory",
            });
        }

        let layout = Layout::new(root);
        let marker = layout.marker_path();
        let is_empty = fs::read_dir(root)
            .map_err(StorageError::io("open", root))?
            .next()
            .is_none();

        if is_empty {
            match fs::create_dir(&marker) {
                Ok(()) => tracing::debug!(root = %root.display(), "initialized new store"),
                // Another process initialized the root concurrently
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(StorageError::io("init", &marker)(e)),
            }
        } else if !marker.is_dir() {
            return Err(StorageError::NotAStore {
                root: root.to_path_buf(),
                reason: "directory is not empty and has no .filedb marker",
            });
        }

        Ok(Self { layout, sync: true })
    }

    /// Sets whether staged files and directories are fsynced.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync = value;
        self
    }

    /// Returns the key-to-path layout.
    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    /// Reads the entry file for a key.
    ///
    /// Returns `None` if the key has no entry file.
    pub fn read(&self, key: &Key) -> StorageResult<Option<Vec<u8>>> {
        let path = self.layout.entry_path(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io("read", &path)(e)),
        }
    }

    /// Writes `bytes` to a fresh staging file next to the key's entry.
    ///
    /// The file is fully written and closed before this returns. Parent
    /// directories of the key are created as needed.
    pub fn stage(&self, key: &Key, bytes: &[u8]) -> StorageResult<StagedFile> {
        let target = self.layout.entry_path(key);
        let path = self.layout.staging_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(StorageError::io("stage", parent))?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(StorageError::io("stage", &path))?;
        let staged = StagedFile::new(path, target);

        file.write_all(bytes)
            .and_then(|()| file.flush())
            .map_err(StorageError::io("stage", staged.path()))?;
        if self.sync {
            file.sync_all()
                .map_err(StorageError::io("stage", staged.path()))?;
        }

        Ok(staged)
    }

    /// Moves a staged file over its entry in one atomic rename.
    ///
    /// Callers serialize commits for a key by holding its [`KeyLock`].
    pub fn commit(&self, staged: StagedFile) -> StorageResult<()> {
        let target = staged.target().to_path_buf();
        staged.persist()?;
        if self.sync {
            sync_parent(&target)?;
        }
        Ok(())
    }

    /// Removes the entry file for a key.
    ///
    /// Returns whether a file was removed. A missing file is not an error.
    pub fn remove(&self, key: &Key) -> StorageResult<bool> {
        let path = self.layout.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                if self.sync {
                    sync_parent(&path)?;
                }
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io("remove", &path)(e)),
        }
    }

    /// Acquires the exclusive lock for a key.
    ///
    /// See [`KeyLock::acquire`] for the meaning of `timeout`.
    pub fn lock(&self, key: &Key, timeout: Option<Duration>) -> StorageResult<KeyLock> {
        KeyLock::acquire(&self.layout.lock_path(key), timeout)
    }

    /// Lists the keys stored directly under `prefix`.
    ///
    /// Only regular entries count: subdirectories, the store marker and
    /// staging or lock artifacts are skipped, as are file names that are not
    /// legal keys. A prefix with no directory yields an empty list. Keys are
    /// returned in lexicographic order.
    pub fn list(&self, prefix: &str) -> StorageResult<Vec<Key>> {
        let prefix = normalize_prefix(prefix)?;
        let dir = self.layout.prefix_dir(prefix);

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io("list", &dir)(e)),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(StorageError::io("list", &dir))?;
            let file_type = entry.file_type().map_err(StorageError::io("list", &dir))?;
            if file_type.is_dir() {
                continue;
            }

            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if (prefix.is_empty() && name == MARKER) || is_artifact(name) {
                continue;
            }

            let raw = if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{prefix}/{name}")
            };
            if let Ok(key) = Key::parse(&raw) {
                keys.push(key);
            }
        }

        keys.sort();
        Ok(keys)
    }
}

/// Fsyncs the directory containing `path` so a rename or unlink is durable.
#[cfg(unix)]
fn sync_parent(path: &Path) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::File::open(parent)
            .and_then(|dir| dir.sync_all())
            .map_err(StorageError::io("sync", parent))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> StorageResult<()> {
    // NTFS journals metadata; directory handles cannot be fsynced
    Ok(())
}
