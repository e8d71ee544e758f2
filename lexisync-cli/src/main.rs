//! Lexisync: keep a local copy of a course dashboard in step with the source.
//!
//! # Usage
//!
//! ```text
//! lexisync init [--source <dir>] [--force]
//! lexisync sync [--dry-run] [--json] [--source <dir>]
//! lexisync status [--all] [--json]
//! ```
//!
//! Logging goes to stderr and follows `RUST_LOG` (default `info`).

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{init::InitArgs, status::StatusArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "lexisync",
    version,
    about = "Synchronize courses, levels and words into a local store",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create ~/.lexisync with a default config and an empty source directory.
    Init(InitArgs),

    /// Reconcile the local store with the source.
    Sync(SyncArgs),

    /// Show the courses held in the local store.
    Status(StatusArgs),
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Sync(args) => args.run(),
        Commands::Status(args) => args.run(),
    }
}
