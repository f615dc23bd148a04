//! Init command implementation.

use filedb_core::{Config, Store};
use serde_json::Value;
use std::path::Path;

/// Runs the init command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store: Store<Value> = Store::open_with_config(path, Config::default())?;
    tracing::debug!(root = %store.root().display(), "store ready");
    println!("✓ Initialized store at {:?}", store.root());
    Ok(())
}
