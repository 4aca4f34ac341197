// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//!
//! xelstore: inspect and edit a file-backed XelStore from the shell.
//!
//! Opens a redb-backed local area as a `VersionedStore` (running the same
//! backend probe and version reconciliation as any embedding application)
//! and performs one operation per invocation.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use xel_storage::{HostEnvironment, RedbArea, StoreConfig, StoreVersion, VersionedStore};

/// Crate version string, pulled from Cargo.toml at compile time.
const VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

/// xelstore: versioned key/value store inspector.
#[derive(Parser, Debug)]
#[command(name = "xelstore", version = VERSION, about = "Inspect and edit a XelStore database")]
struct Cli {
    /// Path of the redb database file.
    #[arg(long, default_value = "xelstore.redb")]
    db: PathBuf,

    /// Data version the store is opened with (number or dotted release).
    #[arg(long, default_value = "1")]
    app_version: String,

    /// Host identifier used to name the backend probe entry.
    #[arg(long, default_value = "localhost")]
    hostname: String,

    /// Optional JSON file with store configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Command {
    /// Print the JSON value stored under a key.
    Get { key: String },
    /// Store a JSON value under a key (`null` deletes it).
    Set { key: String, json: String },
    /// Delete a key.
    Delete { key: String },
    /// Print whether a key holds a value.
    Has { key: String },
    /// Remove every key and mark the store as up to date.
    Clear,
    /// Print the encoded data version.
    Version,
}

// ---------------------------------------------------------------------------
// Store plumbing
// ---------------------------------------------------------------------------

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<StoreConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            Ok(StoreConfig::from_json(&text)?)
        }
        None => Ok(StoreConfig::default()),
    }
}

fn open_store(cli: &Cli) -> anyhow::Result<VersionedStore> {
    let config = load_config(cli.config.as_ref())?;
    let area = RedbArea::open(&cli.db)
        .with_context(|| format!("opening database {}", cli.db.display()))?;
    let host = HostEnvironment::new(cli.hostname.clone()).with_local(area);

    // Parsing a version never fails: unparsable text encodes as 0.
    let version: StoreVersion = cli.app_version.parse().unwrap_or_default();
    let store = VersionedStore::open(&host, version, config).context("opening store")?;
    Ok(store)
}

/// Run one command, returning what should be printed on stdout.
fn execute(store: &mut VersionedStore, command: &Command) -> anyhow::Result<Option<String>> {
    match command {
        Command::Get { key } => match store.get(key)? {
            Some(value) => Ok(Some(serde_json::to_string_pretty(&value)?)),
            None => bail!("key not found: {key}"),
        },
        Command::Set { key, json } => {
            let value: Value =
                serde_json::from_str(json).with_context(|| format!("parsing value for {key}"))?;
            store.set(key, value)?;
            Ok(None)
        }
        Command::Delete { key } => {
            store.delete(key)?;
            Ok(None)
        }
        Command::Has { key } => Ok(Some(store.has(key).to_string())),
        Command::Clear => {
            store.clear()?;
            Ok(None)
        }
        Command::Version => Ok(Some(store.version().to_string())),
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_format);
    tracing::debug!(db = %cli.db.display(), command = ?cli.command, "running command");

    let result = open_store(&cli).and_then(|mut store| execute(&mut store, &cli.command));
    match result {
        Ok(Some(output)) => println!("{output}"),
        Ok(None) => {}
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}
