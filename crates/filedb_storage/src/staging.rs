//! Staged entry replacements.

use crate::error::{StorageError, StorageResult};
use std::fs;
use std::path::{Path, PathBuf};

/// A fully written replacement for an entry, not yet visible to readers.
///
/// The staging file is removed when the guard is dropped, unless
/// [`StagedFile::persist`] moved it over its target first. This holds on
/// every exit path, including unwinding.
#[derive(Debug)]
#[must_use = "a staged file is discarded when dropped"]
pub struct StagedFile {
    path: PathBuf,
    target: PathBuf,
    armed: bool,
}

impl StagedFile {
    pub(crate) fn new(path: PathBuf, target: PathBuf) -> Self {
        Self {
            path,
            target,
            armed: true,
        }
    }

    /// Returns the staging file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the entry path this file will replace.
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Atomically renames the staging file over its target.
    ///
    /// Concurrent readers of the target observe either the previous file or
    /// this one, never a mix.
    pub(crate) fn persist(mut self) -> StorageResult<()> {
        fs::rename(&self.path, &self.target).map_err(StorageError::io("commit", &self.target))?;
        self.armed = false;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to discard staged file");
            }
        }
    }
}
