//! FileDB CLI
//!
//! Command-line access to a FileDB store. Documents are JSON.
//!
//! # Commands
//!
//! - `init` - Initialize a store directory
//! - `get` - Print the document at a key
//! - `set` - Replace the document at a key
//! - `delete` - Remove a key
//! - `list` - List keys directly under a prefix
//! - `incr` - Increment an integer document, retrying on conflicts

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// FileDB command-line tools.
#[derive(Parser)]
#[command(name = "filedb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a store directory
    Init,

    /// Print the document at a key
    Get {
        /// Key to read
        key: String,

        /// Also print the entry version
        #[arg(long)]
        with_version: bool,
    },

    /// Replace the document at a key
    Set {
        /// Key to write
        key: String,

        /// Document as JSON (anything else is stored as a string)
        value: String,

        /// Retries after a concurrent modification
        #[arg(short, long, default_value = "0")]
        retries: u32,

        /// Retry until the write commits
        #[arg(long, conflicts_with = "retries")]
        retry_forever: bool,
    },

    /// Remove a key
    Delete {
        /// Key to remove
        key: String,
    },

    /// List keys directly under a prefix
    List {
        /// Directory prefix (empty for the root)
        #[arg(default_value = "")]
        prefix: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Increment an integer document, retrying on conflicts
    Incr {
        /// Key holding the counter
        key: String,

        /// Amount to add
        #[arg(long, default_value = "1", allow_hyphen_values = true)]
        by: i64,

        /// Number of increments to perform
        #[arg(long, default_value = "1")]
        times: u32,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => {
            let path = cli.path.ok_or("Store path required for init")?;
            commands::init::run(&path)?;
        }
        Commands::Get { key, with_version } => {
            let path = cli.path.ok_or("Store path required for get")?;
            commands::read::get(&path, &key, with_version)?;
        }
        Commands::Set {
            key,
            value,
            retries,
            retry_forever,
        } => {
            let path = cli.path.ok_or("Store path required for set")?;
            let retries = if retry_forever {
                filedb_core::Retries::Infinite
            } else {
                filedb_core::Retries::Finite(retries)
            };
            commands::write::set(&path, &key, &value, retries)?;
        }
        Commands::Delete { key } => {
            let path = cli.path.ok_or("Store path required for delete")?;
            commands::write::delete(&path, &key)?;
        }
        Commands::List { prefix, format } => {
            let path = cli.path.ok_or("Store path required for list")?;
            commands::read::list(&path, &prefix, &format)?;
        }
        Commands::Incr { key, by, times } => {
            let path = cli.path.ok_or("Store path required for incr")?;
            commands::write::incr(&path, &key, by, times)?;
        }
        Commands::Version => {
            println!("FileDB CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("FileDB Core v{}", filedb_core::VERSION);
        }
    }

    Ok(())
}
