//! CLI command implementations.

pub mod init;
pub mod read;
pub mod write;

use filedb_core::{Config, CoreResult, Store};
use serde_json::Value;
use std::path::Path;

/// Errors reported by commands beyond those of the store itself.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The key holds no document.
    #[error("key not found: {key}")]
    NotFound {
        /// The key that was read.
        key: String,
    },

    /// The document cannot be incremented.
    #[error("document at '{key}' is not an integer: {found}")]
    NotAnInteger {
        /// The key that was updated.
        key: String,
        /// The document found there.
        found: Value,
    },

    /// The increment left the integer range.
    #[error("counter at '{key}' would overflow")]
    Overflow {
        /// The key that was updated.
        key: String,
    },

    /// Unknown output format.
    #[error("unknown format '{0}' (expected text or json)")]
    UnknownFormat(String),
}

/// Opens an existing store of JSON documents.
///
/// Only `init` creates stores; every other command expects one.
pub fn open_existing(path: &Path) -> CoreResult<Store<Value>> {
    Store::open_with_config(path, Config::default().create_if_missing(false))
}
