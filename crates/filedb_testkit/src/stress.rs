//! Stress helpers for FileDB.
//!
//! These drive the update protocol from many threads, each with its own
//! store handle, to check behavior under contention.

use crate::fixtures::test_config;
use filedb_core::{CoreError, CoreResult, Retries, Store};
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Operations that committed.
    pub successful_ops: usize,
    /// Operations that gave up on a concurrent modification.
    pub conflicted_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, conflicted: usize, duration: Duration) -> Self {
        let total = successful + conflicted;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            conflicted_ops: conflicted,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Conflicted: {}", self.conflicted_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of concurrent threads.
    pub threads: usize,
    /// Updates performed by each thread.
    pub ops_per_thread: usize,
    /// Retry policy for each update.
    pub retries: Retries,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 8,
            ops_per_thread: 25,
            retries: Retries::Infinite,
        }
    }
}

/// Increments the integer document at `key` from many threads at once.
///
/// Every thread opens its own handle on `root` and waits at a barrier so the
/// threads start together. With `Retries::Infinite` every increment commits
/// and the document ends at `threads * ops_per_thread` above its start.
///
/// # Errors
///
/// Returns the first error other than a concurrent modification.
pub fn stress_concurrent_increments(
    root: &Path,
    key: &str,
    config: &StressConfig,
) -> CoreResult<StressTestResult> {
    let barrier = Arc::new(Barrier::new(config.threads));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|_| {
            let root = root.to_path_buf();
            let key = key.to_string();
            let barrier = Arc::clone(&barrier);
            let config = config.clone();
            thread::spawn(move || -> CoreResult<(usize, usize)> {
                let store: Store<u64> = Store::open_with_config(&root, test_config())?;
                barrier.wait();

                let mut successful = 0;
                let mut conflicted = 0;
                for _ in 0..config.ops_per_thread {
                    match store.update(&key, |n| Ok(Some(n.unwrap_or(0) + 1)), config.retries) {
                        Ok(_) => successful += 1,
                        Err(CoreError::ConcurrentModification { .. }) => conflicted += 1,
                        Err(e) => return Err(e),
                    }
                }
                Ok((successful, conflicted))
            })
        })
        .collect();

    let mut successful = 0;
    let mut conflicted = 0;
    for handle in handles {
        let (ok, conflicts) = handle.join().expect("stress thread panicked")?;
        successful += ok;
        conflicted += conflicts;
    }

    Ok(StressTestResult::new(successful, conflicted, start.elapsed()))
}
