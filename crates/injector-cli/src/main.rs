//! Injector CLI - command-line front end for the injection configuration store.
//!
//! Stands in for the presentation layer: it parses user input, clamps values
//! the way a UI would, and prints results (JSON for structured output).

mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Args;
use injector_core::ConfigStore;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; RUST_LOG overrides --debug
    let default_level = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let root = args.resolve_root()?;
    debug!("Store root: {}", root.display());

    let store = ConfigStore::open(&root)
        .with_context(|| format!("Failed to open store at {}", root.display()))?;

    let output = commands::run(&store, args.command)?;
    println!("{}", output);

    Ok(())
}
