//! Set, delete and incr command implementations.

use super::{open_existing, CommandError};
use filedb_core::Retries;
use serde_json::Value;
use std::path::Path;

/// Parses a command-line document. Text that isn't JSON becomes a string.
pub fn parse_document(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Replaces the document at `key`.
pub fn set(
    path: &Path,
    key: &str,
    raw: &str,
    retries: Retries,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing(path)?;
    store.set_with_retry(key, parse_document(raw), retries)?;
    let version = store.version(key)?;
    tracing::info!(key, version, "document written");
    Ok(())
}

/// Removes `key`. Removing an absent key succeeds.
pub fn delete(path: &Path, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing(path)?;
    store.delete(key)?;
    tracing::info!(key, "document deleted");
    Ok(())
}

/// Adds `by` to the integer at `key` `times` times, retrying until each commits.
///
/// An absent key counts from zero. Prints the final value.
pub fn incr(path: &Path, key: &str, by: i64, times: u32) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing(path)?;

    let mut last = None;
    for _ in 0..times {
        last = store.update(
            key,
            |old| {
                let current = match old {
                    None => 0,
                    Some(doc) => doc.as_i64().ok_or_else(|| CommandError::NotAnInteger {
                        key: key.to_string(),
                        found: doc.clone(),
                    })?,
                };
                let next = current.checked_add(by).ok_or_else(|| CommandError::Overflow {
                    key: key.to_string(),
                })?;
                Ok(Some(Value::from(next)))
            },
            Retries::Infinite,
        )?;
    }

    if let Some(value) = last {
        println!("{value}");
    }
    Ok(())
}
