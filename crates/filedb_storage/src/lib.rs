//! # FileDB Storage
//!
//! Filesystem layer for FileDB.
//!
//! This crate knows where a key lives on disk and how to replace its file
//! atomically. It treats entry contents as **opaque bytes**; versions and
//! documents are interpreted by `filedb_core`.
//!
//! ## Layout
//!
//! ```text
//! <root>/
//! ├─ .filedb/                  # Marker proving the directory is a store
//! ├─ users/
//! │  ├─ alice                  # Entry for key "users/alice"
//! │  ├─ alice...lock           # Per-key advisory lock (kept forever)
//! │  └─ alice...tmp.<uuid>     # Staged replacement (transient)
//! └─ config                    # Entry for key "config"
//! ```
//!
//! The `...` infix is reserved: no key segment may contain it, so staging
//! and lock artifacts never collide with real keys.
//!
//! ## Components
//!
//! - [`Key`] and [`Layout`] - validated keys and their derived paths
//! - [`FileStore`] - read, stage, commit, remove and list entry files
//! - [`StagedFile`] - a staged replacement removed on drop unless committed
//! - [`KeyLock`] - exclusive cross-process lock on one key
//!
//! ## Example
//!
//! ```rust
//! use filedb_storage::{FileStore, Key};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = FileStore::open(dir.path(), true).unwrap();
//! let key = Key::parse("notes/today").unwrap();
//!
//! let staged = store.stage(&key, b"hello").unwrap();
//! let _lock = store.lock(&key, None).unwrap();
//! store.commit(staged).unwrap();
//!
//! assert_eq!(store.read(&key).unwrap().as_deref(), Some(&b"hello"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod layout;
mod lock;
mod staging;

pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use layout::{is_artifact, Key, Layout, LOCK_SUFFIX, MARKER, RESERVED_INFIX, STAGING_INFIX};
pub use lock::KeyLock;
pub use staging::StagedFile;
