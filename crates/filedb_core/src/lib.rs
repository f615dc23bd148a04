//! # FileDB Core
//!
//! A document store that keeps one document per key in its own file.
//!
//! This crate provides:
//! - The versioned [`Entry`] model (`{version, doc}`)
//! - [`Store`], the typed facade: `get`, `list`, `set`, `delete`, `update`
//! - Optimistic read-modify-write with bounded or unbounded [`Retries`]
//!
//! ## Update protocol
//!
//! An update reads the entry and its version without locking, runs the
//! caller's function, and stages the result in a file next to the entry.
//! Only then does it take the key's lock, re-check the version and rename
//! the staged file into place. A changed version means another writer
//! committed first: the attempt is discarded and, if retries remain,
//! repeated from the read after a jittered pause.
//!
//! ```text
//!   read(v) ──> apply ──> stage(v+1) ──> lock ──> version == v ? ──> rename ──> unlock
//!     ^                                                 │ no
//!     └────────────── backoff <── unlock, discard ──────┘
//! ```
//!
//! Correctness rests only on the filesystem, so writers may live in
//! different processes.
//!
//! ## Example
//!
//! ```rust
//! use filedb_core::{Retries, Store};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store: Store<u64> = Store::open(dir.path()).unwrap();
//!
//! store.set("counters/hits", 1).unwrap();
//! store
//!     .update("counters/hits", |n| Ok(Some(n.unwrap_or(0) + 1)), Retries::Infinite)
//!     .unwrap();
//!
//! assert_eq!(store.get("counters/hits").unwrap(), Some(2));
//! assert_eq!(store.version("counters/hits").unwrap(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod entry;
mod error;
mod retry;
mod store;
mod update;

pub use config::Config;
pub use entry::{Entry, EntryStore};
pub use error::{ApplyError, CoreError, CoreResult};
pub use retry::{Backoff, Retries};
pub use store::Store;

pub use filedb_codec::{CborCodec, Codec, CodecError, JsonCodec};
pub use filedb_storage::{Key, StorageError};

/// Current version of FileDB.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
