//! Retry policy for conflicting updates.

use rand::Rng;
use std::time::Duration;

/// How many times an update is repeated after a concurrent modification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retries {
    /// Retry at most this many times, so at most `n + 1` attempts.
    Finite(u32),
    /// Retry until the update commits or fails for another reason.
    Infinite,
}

impl Retries {
    /// Fail on the first conflict.
    pub const NONE: Self = Self::Finite(0);

    /// Returns whether another attempt is allowed after `conflicts`
    /// consecutive conflicts.
    #[must_use]
    pub const fn permits(self, conflicts: u32) -> bool {
        match self {
            Self::Finite(limit) => conflicts <= limit,
            Self::Infinite => true,
        }
    }
}

impl Default for Retries {
    fn default() -> Self {
        Self::NONE
    }
}

/// Randomized pause between conflicting attempts.
///
/// Every pause is drawn uniformly from `[min, max]`, whatever the attempt
/// number. Jitter spreads writers that collided so they do not collide
/// again in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Shortest pause.
    pub min: Duration,
    /// Longest pause.
    pub max: Duration,
}

impl Backoff {
    /// Creates a backoff drawing pauses from `[min, max]`.
    #[must_use]
    pub const fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// A backoff that never pauses.
    #[must_use]
    pub const fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Draws the next pause.
    #[must_use]
    pub fn delay(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(50), Duration::from_millis(100))
    }
}
