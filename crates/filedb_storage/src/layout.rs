//! Key validation and key-to-path mapping.
//!
//! Every key maps to exactly one entry path under the root. Staging files
//! and the lock file for a key live in the same directory as its entry, so
//! the final `rename` never crosses a filesystem boundary.

use crate::error::{StorageError, StorageResult};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Name of the marker directory that identifies a store root.
pub const MARKER: &str = ".filedb";

/// Sequence no key segment may contain. Artifact names are built from it.
pub const RESERVED_INFIX: &str = "...";

/// Infix between an entry name and the random part of a staging file name.
pub const STAGING_INFIX: &str = "...tmp.";

/// Suffix appended to an entry name to form its lock file name.
pub const LOCK_SUFFIX: &str = "...lock";

/// Returns true if a directory entry name is a staging or lock artifact.
#[must_use]
pub fn is_artifact(name: &str) -> bool {
    name.contains(STAGING_INFIX) || name.ends_with(LOCK_SUFFIX)
}

/// A validated document key.
///
/// Keys are relative, `/`-separated paths such as `users/alice`. Each
/// segment must be non-empty, must not be `.` or `..`, must not contain a
/// backslash, NUL or the reserved `...` sequence, and the first segment must
/// not be the store marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
    /// Parses and validates a key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if the key could escape the root
    /// or collide with a reserved name.
    pub fn parse(raw: &str) -> StorageResult<Self> {
        if raw.is_empty() {
            return Err(StorageError::invalid_key(raw, "key is empty"));
        }
        check_path(raw).map_err(|reason| StorageError::invalid_key(raw, reason))?;
        Ok(Self(raw.to_string()))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates over the `/`-separated segments of the key.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Returns the last segment of the key (its file name).
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Key {
    type Error = StorageError;

    fn try_from(raw: &str) -> StorageResult<Self> {
        Self::parse(raw)
    }
}

/// Normalizes a listing prefix.
///
/// An empty prefix names the root. A single trailing `/` is accepted and
/// stripped. Otherwise prefixes follow the key grammar.
///
/// # Errors
///
/// Returns [`StorageError::InvalidKey`] for illegal prefixes.
pub(crate) fn normalize_prefix(prefix: &str) -> StorageResult<&str> {
    let trimmed = prefix.strip_suffix('/').unwrap_or(prefix);
    if trimmed.is_empty() {
        return Ok(trimmed);
    }
    check_path(trimmed).map_err(|reason| StorageError::invalid_key(prefix, reason))?;
    Ok(trimmed)
}

fn check_path(raw: &str) -> Result<(), &'static str> {
    if raw.starts_with('/') {
        return Err("key must be relative");
    }
    for segment in raw.split('/') {
        check_segment(segment)?;
    }
    if raw.split('/').next() == Some(MARKER) {
        return Err("key is reserved for the store marker");
    }
    Ok(())
}

fn check_segment(segment: &str) -> Result<(), &'static str> {
    if segment.is_empty() {
        return Err("empty path segment");
    }
    if segment == "." || segment == ".." {
        return Err("relative path segments are not allowed");
    }
    if segment.contains('\\') || segment.contains('\0') {
        return Err("backslash and NUL are not allowed");
    }
    if segment.contains(RESERVED_INFIX) {
        return Err("the \"...\" sequence is reserved");
    }
    Ok(())
}

/// Derives on-disk locations for keys under one root directory.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    /// Creates a layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path of the marker directory.
    #[must_use]
    pub fn marker_path(&self) -> PathBuf {
        self.root.join(MARKER)
    }

    /// Returns the canonical entry path for a key.
    #[must_use]
    pub fn entry_path(&self, key: &Key) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(key.segments());
        path
    }

    /// Returns a fresh, unique staging path next to the key's entry.
    #[must_use]
    pub fn staging_path(&self, key: &Key) -> PathBuf {
        let name = format!("{}{STAGING_INFIX}{}", key.name(), Uuid::new_v4().simple());
        self.entry_path(key).with_file_name(name)
    }

    /// Returns the lock file path for a key.
    #[must_use]
    pub fn lock_path(&self, key: &Key) -> PathBuf {
        let name = format!("{}{LOCK_SUFFIX}", key.name());
        self.entry_path(key).with_file_name(name)
    }

    /// Returns the directory a normalized prefix refers to.
    pub(crate) fn prefix_dir(&self, prefix: &str) -> PathBuf {
        let mut path = self.root.clone();
        if !prefix.is_empty() {
            path.extend(prefix.split('/'));
        }
        path
    }
}
