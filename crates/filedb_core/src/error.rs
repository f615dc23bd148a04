//! Error types for FileDB core.

use filedb_codec::CodecError;
use filedb_storage::StorageError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Error returned by a caller-supplied update function.
///
/// It is handed back unchanged inside [`CoreError::Apply`] and can be
/// recovered with `downcast_ref`.
pub type ApplyError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur in FileDB core operations.
///
/// A missing key is not an error: reads report it as `None`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Filesystem failure, invalid key, uninitialized root or lock timeout.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A stored entry could not be decoded, or a document could not be
    /// encoded.
    #[error("codec error for key {key:?}: {source}")]
    Codec {
        /// The key being read or written.
        key: String,
        /// The underlying codec failure.
        source: CodecError,
    },

    /// Another writer committed the key between this update's read and its
    /// commit, and no retries were left.
    #[error("concurrent modification of key {key:?}")]
    ConcurrentModification {
        /// The contended key.
        key: String,
    },

    /// The update function returned an error.
    #[error("update function failed for key {key:?}: {source}")]
    Apply {
        /// The key being updated.
        key: String,
        /// The error returned by the update function.
        source: ApplyError,
    },
}

impl CoreError {
    /// Creates a codec error for a key.
    pub fn codec(key: impl Into<String>, source: CodecError) -> Self {
        Self::Codec {
            key: key.into(),
            source,
        }
    }

    /// Creates a concurrent modification error.
    pub fn concurrent_modification(key: impl Into<String>) -> Self {
        Self::ConcurrentModification { key: key.into() }
    }

    /// Returns true if this is a [`CoreError::ConcurrentModification`].
    #[must_use]
    pub fn is_concurrent_modification(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug)]
    struct Rejected;

    impl std::fmt::Display for Rejected {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("rejected")
        }
    }

    impl std::error::Error for Rejected {}

    #[test]
    fn apply_error_is_preserved() {
        let err = CoreError::Apply {
            key: "k".into(),
            source: Box::new(Rejected),
        };

        assert_eq!(err.to_string(), "update function failed for key \"k\": rejected");
        let source = err.source().unwrap();
        assert!(source.downcast_ref::<Rejected>().is_some());
    }

    #[test]
    fn conflict_predicate() {
        assert!(CoreError::concurrent_modification("k").is_concurrent_modification());
        let codec = CoreError::codec("k", CodecError::decoding_failed("json", "eof"));
        assert!(!codec.is_concurrent_modification());
    }
}
