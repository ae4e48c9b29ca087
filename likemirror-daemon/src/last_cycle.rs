//! Summary of the most recent cycle, kept next to the state records so
//! `likemirror status` can report when the mirror last ran.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use likemirror_sync::{CycleOutcome, CycleReport};

use crate::error::{io_err, DaemonError};

pub const LAST_CYCLE_FILE: &str = "last_cycle.json";

pub fn last_cycle_path(state_dir: &Path) -> PathBuf {
    state_dir.join(LAST_CYCLE_FILE)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastCycle {
    pub started_at: DateTime<Utc>,
    pub outcome: String,
    pub listed: usize,
    pub candidates: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

impl LastCycle {
    pub fn from_report(report: &CycleReport) -> Self {
        Self {
            started_at: report.started_at,
            outcome: outcome_label(report.outcome).to_string(),
            listed: report.listed,
            candidates: report.candidates,
            succeeded: report.succeeded.len(),
            failed: report.failed.len(),
            duration_ms: u64::try_from(report.duration_ms).unwrap_or(u64::MAX),
        }
    }
}

pub fn outcome_label(outcome: CycleOutcome) -> &'static str {
    match outcome {
        CycleOutcome::ListingFailed => "listing_failed",
        CycleOutcome::NothingToDo => "nothing_to_do",
        CycleOutcome::Completed => "completed",
        CycleOutcome::PersistFailed => "persist_failed",
    }
}

/// Write atomically (`.tmp` + rename).
pub fn record(state_dir: &Path, report: &CycleReport) -> Result<(), DaemonError> {
    fs::create_dir_all(state_dir).map_err(|e| io_err(state_dir, e))?;
    let path = last_cycle_path(state_dir);
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(&LastCycle::from_report(report))?;
    fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// `Ok(None)` when no cycle has been recorded yet.
pub fn load(state_dir: &Path) -> Result<Option<LastCycle>, DaemonError> {
    let path = last_cycle_path(state_dir);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_err(&path, e)),
    };
    Ok(Some(serde_json::from_str(&raw)?))
}
