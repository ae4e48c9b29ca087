//! `likemirror sync` — run a single cycle in the foreground.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use likemirror_core::{Config, Track};
use likemirror_daemon::{init_tracing, last_cycle};
use likemirror_sync::{CycleOutcome, CycleReport};

/// Arguments for `likemirror sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// List the tracks the next cycle would mirror without transferring or
    /// recording anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the cycle report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let config = Config::load().context("failed to load configuration")?;
        init_tracing(false);
        let orchestrator = super::build_orchestrator(&config);

        if self.dry_run {
            let candidates = orchestrator
                .preview()
                .context("failed to fetch liked tracks")?;
            print_preview(&candidates, self.json)?;
            return Ok(());
        }

        let report = orchestrator.run_cycle();
        if let Err(err) = last_cycle::record(&config.state_dir, &report) {
            eprintln!("warning: could not record last cycle: {err}");
        }

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to render report JSON")?
            );
        } else {
            print_report(&report);
        }

        match report.outcome {
            CycleOutcome::ListingFailed => bail!("could not list liked tracks; nothing was recorded"),
            CycleOutcome::PersistFailed => bail!(
                "tracks were processed but the state in {} could not be saved",
                config.state_dir.display()
            ),
            CycleOutcome::NothingToDo | CycleOutcome::Completed => Ok(()),
        }
    }
}

fn print_preview(candidates: &[Track], json: bool) -> Result<()> {
    if json {
        let rows: Vec<_> = candidates
            .iter()
            .map(|t| serde_json::json!({ "id": t.id, "title": t.title }))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&rows).context("failed to render preview JSON")?
        );
        return Ok(());
    }

    if candidates.is_empty() {
        println!("[dry-run] ✓ nothing to do");
        return Ok(());
    }
    println!("[dry-run] {} track(s) would be mirrored", candidates.len());
    for track in candidates {
        println!("  ~  {} ({})", track.title, track.id);
    }
    Ok(())
}

fn print_report(report: &CycleReport) {
    match report.outcome {
        CycleOutcome::ListingFailed => {
            println!("{} could not list liked tracks", "✗".red().bold());
            return;
        }
        CycleOutcome::NothingToDo => {
            println!("✓ nothing to do ({} liked track(s) already handled)", report.listed);
            return;
        }
        CycleOutcome::Completed | CycleOutcome::PersistFailed => {}
    }

    println!(
        "✓ cycle finished ({} mirrored, {} failed) in {}ms",
        report.succeeded.len(),
        report.failed.len(),
        report.duration_ms
    );
    for track in &report.succeeded {
        let marker = if track.already_present { "·" } else { "✎" };
        println!("  {marker}  {} → {}", track.title, track.destination);
    }
    for track in &report.failed {
        println!(
            "  {}  {} ({}): {}",
            "✗".red(),
            track.title,
            track.id,
            track.reason
        );
    }
}
