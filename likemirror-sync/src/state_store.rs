//! State store — durable success/failure records for mirrored tracks.
//!
//! Each named record is a JSON array of track ids at
//! `<state_dir>/<name>.json`. Writes use the `.tmp` + rename pattern so a
//! record is always either the old or the new set, never a merge.
//!
//! Reads never fail: a missing, unreadable, or malformed record is treated as
//! "no prior state".

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use likemirror_core::TrackId;

use crate::error::{io_err, StateError};

/// Record holding ids of tracks that reached remote storage.
pub const SUCCEEDED_RECORD: &str = "downloaded_tracks";

/// Record holding ids of tracks that failed and are never retried.
pub const FAILED_RECORD: &str = "failed_tracks";

pub type TrackIdSet = BTreeSet<TrackId>;

/// Directory of named JSON records.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<state_dir>/<name>.json` — pure, no I/O.
    pub fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Load the ids stored under `name`.
    ///
    /// Returns an empty set if the record does not exist or cannot be parsed.
    pub fn load(&self, name: &str) -> TrackIdSet {
        let path = self.record_path(name);
        if !path.exists() {
            return TrackIdSet::new();
        }
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!("cannot read {}, treating as empty: {e}", path.display());
                return TrackIdSet::new();
            }
        };
        match serde_json::from_str::<Vec<TrackId>>(&contents) {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                tracing::warn!("corrupted record {}, treating as empty: {e}", path.display());
                TrackIdSet::new()
            }
        }
    }

    /// Replace the record `name` with `ids`, atomically.
    ///
    /// Creates the state directory if needed.
    pub fn save(&self, name: &str, ids: &TrackIdSet) -> Result<(), StateError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| io_err(&self.dir, e))?;

        let path = self.record_path(name);
        let json = serde_json::to_string_pretty(&ids.iter().collect::<Vec<_>>())?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(&path, e));
        }
        Ok(())
    }
}

/// Both outcome sets, held in memory for the length of one cycle.
///
/// Invariant: an id is never in both sets. The `mark_*` methods move ids
/// between sets rather than duplicating them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncState {
    pub succeeded: TrackIdSet,
    pub failed: TrackIdSet,
}

impl SyncState {
    /// Load both records. An id found in both keeps its success.
    pub fn load_from(store: &StateStore) -> Self {
        let succeeded = store.load(SUCCEEDED_RECORD);
        let mut failed = store.load(FAILED_RECORD);

        let overlap: Vec<TrackId> = failed.intersection(&succeeded).cloned().collect();
        if !overlap.is_empty() {
            tracing::warn!(
                "{} id(s) recorded as both succeeded and failed; keeping them as succeeded",
                overlap.len()
            );
            for id in &overlap {
                failed.remove(id);
            }
        }

        Self { succeeded, failed }
    }

    /// Save both records. Each save fully replaces its own record.
    pub fn save_to(&self, store: &StateStore) -> Result<(), StateError> {
        store.save(SUCCEEDED_RECORD, &self.succeeded)?;
        store.save(FAILED_RECORD, &self.failed)?;
        Ok(())
    }

    /// Whether `id` already has an outcome and must not be attempted.
    pub fn is_known(&self, id: &TrackId) -> bool {
        self.succeeded.contains(id) || self.failed.contains(id)
    }

    pub fn mark_succeeded(&mut self, id: TrackId) {
        self.failed.remove(&id);
        self.succeeded.insert(id);
    }

    pub fn mark_failed(&mut self, id: TrackId) {
        self.succeeded.remove(&id);
        self.failed.insert(id);
    }

    /// Forget the failure of each id so the next cycle retries it.
    ///
    /// Returns the ids that were actually in the failed set.
    pub fn requeue<'a>(&mut self, ids: impl IntoIterator<Item = &'a TrackId>) -> Vec<TrackId> {
        ids.into_iter()
            .filter(|id| self.failed.remove(*id))
            .cloned()
            .collect()
    }

    /// Forget every failure. Returns how many ids were requeued.
    pub fn requeue_all(&mut self) -> usize {
        let count = self.failed.len();
        self.failed.clear();
        count
    }
}
