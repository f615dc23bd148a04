//! # FileDB Testkit
//!
//! Test utilities for FileDB.
//!
//! This crate provides:
//! - Temporary-directory store fixtures
//! - Property-based test generators using proptest
//! - Concurrency stress helpers for the update protocol
//!
//! ## Usage
//!
//! ```rust,ignore
//! use filedb_testkit::prelude::*;
//!
//! #[test]
//! fn counts_visits() {
//!     let store = TestStore::<u64>::new();
//!     store.set("visits", 1).unwrap();
//!     assert_eq!(store.version("visits").unwrap(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
