//! Store configuration.

use crate::retry::{Backoff, Retries};
use std::time::Duration;

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the root directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Retries used by [`Store::set`](crate::Store::set).
    pub default_retries: Retries,

    /// Pause between conflicting attempts.
    pub backoff: Backoff,

    /// Whether to fsync staged entries and directories on commit.
    pub sync_on_commit: bool,

    /// Upper bound on waiting for a key lock (`None` waits forever).
    pub lock_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            default_retries: Retries::NONE,
            backoff: Backoff::default(),
            sync_on_commit: true,
            lock_timeout: None,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the root directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets the retries used by `set`.
    #[must_use]
    pub const fn default_retries(mut self, retries: Retries) -> Self {
        self.default_retries = retries;
        self
    }

    /// Sets the pause between conflicting attempts.
    #[must_use]
    pub const fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets whether to fsync on commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets the lock wait limit.
    #[must_use]
    pub const fn lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_timeout = timeout;
        self
    }
}
