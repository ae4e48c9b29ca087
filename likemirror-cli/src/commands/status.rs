//! `likemirror status` — what has been mirrored, what failed, when it last ran.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use likemirror_core::TrackId;
use likemirror_daemon::{last_cycle, LastCycle};
use likemirror_sync::{StateStore, SyncState, FAILED_RECORD, SUCCEEDED_RECORD};

/// Arguments for `likemirror status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let state_dir = likemirror_core::config::state_dir()
            .context("failed to resolve the state directory")?;
        let report = build_report(&state_dir)?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to render status JSON")?
            );
            return Ok(());
        }

        print_table(&report);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct StatusReport {
    state_dir: PathBuf,
    succeeded: usize,
    failed: usize,
    failed_ids: Vec<TrackId>,
    last_cycle: Option<LastCycle>,
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "Record")]
    record: String,
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Tracks")]
    tracks: usize,
}

fn build_report(state_dir: &Path) -> Result<StatusReport> {
    let store = StateStore::new(state_dir);
    let state = SyncState::load_from(&store);
    let last_cycle = match last_cycle::load(state_dir) {
        Ok(last) => last,
        Err(err) => {
            eprintln!("warning: ignoring unreadable last cycle record: {err}");
            None
        }
    };

    Ok(StatusReport {
        state_dir: state_dir.to_path_buf(),
        succeeded: state.succeeded.len(),
        failed: state.failed.len(),
        failed_ids: state.failed.iter().cloned().collect(),
        last_cycle,
    })
}

fn print_table(report: &StatusReport) {
    let store = StateStore::new(&report.state_dir);
    println!("{} {}", "State:".bold(), report.state_dir.display());

    let rows = vec![
        RecordRow {
            record: "succeeded".green().to_string(),
            file: store.record_path(SUCCEEDED_RECORD).display().to_string(),
            tracks: report.succeeded,
        },
        RecordRow {
            record: if report.failed > 0 {
                "failed".red().to_string()
            } else {
                "failed".to_string()
            },
            file: store.record_path(FAILED_RECORD).display().to_string(),
            tracks: report.failed,
        },
    ];
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    match &report.last_cycle {
        Some(last) => println!(
            "{} {} ({}, {} mirrored, {} failed, {}ms)",
            "Last cycle:".bold(),
            format_started_at(last.started_at),
            last.outcome,
            last.succeeded,
            last.failed,
            last.duration_ms
        ),
        None => println!("{} never", "Last cycle:".bold()),
    }

    if !report.failed_ids.is_empty() {
        println!();
        println!("Failed tracks are not retried automatically:");
        for id in &report.failed_ids {
            println!("  {}  {id}", "✗".red());
        }
        println!("Run 'likemirror requeue <ID>...' or 'likemirror requeue --all' to retry them.");
    }
}

fn format_started_at(started_at: DateTime<Utc>) -> String {
    let local = started_at.with_timezone(&Local);
    let age = Utc::now().signed_duration_since(started_at);
    let ago = if age.num_days() > 0 {
        format!("{}d ago", age.num_days())
    } else if age.num_hours() > 0 {
        format!("{}h ago", age.num_hours())
    } else if age.num_minutes() > 0 {
        format!("{}m ago", age.num_minutes())
    } else {
        "just now".to_string()
    };
    format!("{} ({ago})", local.format("%Y-%m-%d %H:%M:%S"))
}
