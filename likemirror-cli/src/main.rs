//! likemirror — mirror liked SoundCloud tracks into Dropbox.
//!
//! # Usage
//!
//! ```text
//! likemirror sync [--dry-run] [--json]
//! likemirror daemon [--interval-minutes <N>] [--log-json]
//! likemirror status [--json]
//! likemirror requeue <ID>... | --all
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{daemon::DaemonArgs, requeue::RequeueArgs, status::StatusArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "likemirror",
    version,
    about = "Mirror liked SoundCloud tracks into Dropbox, exactly once",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one sync cycle and exit.
    Sync(SyncArgs),

    /// Run sync cycles on a fixed interval until interrupted.
    Daemon(DaemonArgs),

    /// Show the persisted succeeded/failed records and the last cycle.
    Status(StatusArgs),

    /// Remove ids from the failed record so the next cycle retries them.
    Requeue(RequeueArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Daemon(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Requeue(args) => args.run(),
    }
}
