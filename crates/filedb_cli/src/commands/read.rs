//! Get and list command implementations.

use super::{open_existing, CommandError};
use std::path::Path;

/// Prints the document at `key` as pretty JSON.
pub fn get(path: &Path, key: &str, with_version: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing(path)?;
    let entry = store
        .get_entry(key)?
        .ok_or_else(|| CommandError::NotFound {
            key: key.to_string(),
        })?;

    if with_version {
        println!("version: {}", entry.version);
    }
    println!("{}", serde_json::to_string_pretty(&entry.doc)?);
    Ok(())
}

/// Prints the keys directly under `prefix`.
pub fn list(path: &Path, prefix: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing(path)?;
    let keys = store.list(prefix)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&keys)?),
        "text" => {
            for key in &keys {
                println!("{key}");
            }
        }
        other => return Err(CommandError::UnknownFormat(other.to_string()).into()),
    }
    Ok(())
}
