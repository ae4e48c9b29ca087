//! Sync orchestrator — the single "run one cycle" entrypoint used by the CLI
//! and the daemon.
//!
//! ## Cycle
//!
//! 1. Load the `succeeded` and `failed` records.
//! 2. List the liked tracks. A listing failure ends the cycle with no state
//!    change.
//! 3. Keep the candidates: tracks in neither record.
//! 4. For each candidate, in listing order: resolve the stream, transfer it,
//!    record the outcome. One failure never stops the others.
//! 5. Save both records once.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use likemirror_core::{Config, HttpFetch, ObjectStore, SourceError, Track, TrackId, TrackSource};

use crate::error::TrackError;
use crate::resolver::resolve_stream;
use crate::state_store::{StateStore, SyncState};
use crate::transfer::{transfer, TransferOutcome, TransferTarget};

/// Settings the orchestrator needs from [`Config`].
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub client_id: String,
    pub state_dir: PathBuf,
    pub target: TransferTarget,
}

impl SyncSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            client_id: config.soundcloud.client_id.clone(),
            state_dir: config.state_dir.clone(),
            target: TransferTarget {
                staging_dir: config.staging_dir.clone(),
                destination_prefix: config.destination_prefix.clone(),
            },
        }
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// The likes listing failed; nothing was processed or saved.
    ListingFailed,
    /// Every listed track already had an outcome; nothing was saved.
    NothingToDo,
    /// Candidates were processed and the state was saved.
    Completed,
    /// Candidates were processed but saving the state failed.
    PersistFailed,
}

/// A track that was attempted and recorded as failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackFailure {
    pub id: TrackId,
    pub title: String,
    pub kind: &'static str,
    pub reason: String,
}

/// A track that reached remote storage during this cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackSuccess {
    pub id: TrackId,
    pub title: String,
    pub destination: String,
    /// `true` when remote storage already held the file.
    pub already_present: bool,
}

/// Informational summary of one cycle. The durable result is the saved
/// state; this only feeds logs and CLI output.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub outcome: CycleOutcome,
    pub listed: usize,
    pub candidates: usize,
    pub succeeded: Vec<TrackSuccess>,
    pub failed: Vec<TrackFailure>,
    pub duration_ms: u128,
}

impl CycleReport {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            outcome: CycleOutcome::NothingToDo,
            listed: 0,
            candidates: 0,
            succeeded: Vec::new(),
            failed: Vec::new(),
            duration_ms: 0,
        }
    }
}

/// Drives liked tracks through stream resolution and transfer, one cycle at
/// a time.
pub struct Orchestrator {
    settings: SyncSettings,
    state: StateStore,
    source: Box<dyn TrackSource>,
    http: Box<dyn HttpFetch>,
    store: Box<dyn ObjectStore>,
}

impl Orchestrator {
    pub fn new(
        settings: SyncSettings,
        source: Box<dyn TrackSource>,
        http: Box<dyn HttpFetch>,
        store: Box<dyn ObjectStore>,
    ) -> Self {
        let state = StateStore::new(settings.state_dir.clone());
        Self {
            settings,
            state,
            source,
            http,
            store,
        }
    }

    pub fn state_store(&self) -> &StateStore {
        &self.state
    }

    /// Run one full cycle. Never fails: every error ends up in the persisted
    /// state, the logs, and the returned report.
    pub fn run_cycle(&self) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport::new(Utc::now());
        tracing::info!("sync cycle started");

        let mut state = SyncState::load_from(&self.state);

        let liked = match self.source.liked_tracks() {
            Ok(liked) => liked,
            Err(e) => {
                tracing::warn!("failed to fetch liked tracks, skipping cycle: {e}");
                report.outcome = CycleOutcome::ListingFailed;
                report.duration_ms = started.elapsed().as_millis();
                return report;
            }
        };
        report.listed = liked.len();

        let candidates = select_candidates(liked, &state);
        report.candidates = candidates.len();
        if candidates.is_empty() {
            tracing::info!("no new liked tracks to process");
            report.duration_ms = started.elapsed().as_millis();
            return report;
        }
        tracing::info!("{} new liked track(s) to process", candidates.len());

        for track in candidates {
            match self.process_track(&track) {
                Ok(outcome) => {
                    tracing::info!("mirrored '{}' ({})", track.title, track.id);
                    state.mark_succeeded(track.id.clone());
                    report.succeeded.push(TrackSuccess {
                        already_present: matches!(outcome, TransferOutcome::AlreadyPresent { .. }),
                        destination: outcome.destination().to_string(),
                        id: track.id,
                        title: track.title,
                    });
                }
                Err(e) => {
                    tracing::warn!("track '{}' ({}) failed: {e}", track.title, track.id);
                    state.mark_failed(track.id.clone());
                    report.failed.push(TrackFailure {
                        kind: e.kind(),
                        reason: e.to_string(),
                        id: track.id,
                        title: track.title,
                    });
                }
            }
        }

        report.outcome = match state.save_to(&self.state) {
            Ok(()) => CycleOutcome::Completed,
            Err(e) => {
                tracing::error!(
                    "failed to save sync state in {}: {e}",
                    self.state.dir().display()
                );
                CycleOutcome::PersistFailed
            }
        };
        report.duration_ms = started.elapsed().as_millis();
        tracing::info!(
            "sync cycle finished: {} succeeded, {} failed in {}ms",
            report.succeeded.len(),
            report.failed.len(),
            report.duration_ms
        );
        report
    }

    /// List the candidates the next cycle would process, without touching
    /// the network beyond the listing or changing any state.
    pub fn preview(&self) -> Result<Vec<Track>, SourceError> {
        let state = SyncState::load_from(&self.state);
        Ok(select_candidates(self.source.liked_tracks()?, &state))
    }

    fn process_track(&self, track: &Track) -> Result<TransferOutcome, TrackError> {
        let download_url = resolve_stream(self.http.as_ref(), &self.settings.client_id, track)?;
        transfer(
            self.http.as_ref(),
            self.store.as_ref(),
            &self.settings.target,
            track,
            &download_url,
        )
    }
}

/// Liked tracks with no recorded outcome, in listing order, first occurrence
/// of each id only.
pub fn select_candidates(liked: Vec<Track>, state: &SyncState) -> Vec<Track> {
    let mut seen = HashSet::new();
    liked
        .into_iter()
        .filter(|track| !state.is_known(&track.id))
        .filter(|track| seen.insert(track.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use likemirror_core::{Protocol, Transcoding};

    use super::*;

    fn track(id: &str) -> Track {
        Track {
            id: TrackId::from(id),
            title: format!("track {id}"),
            transcodings: vec![Transcoding {
                protocol: Protocol::Progressive,
                url: format!("https://api.example/{id}"),
                mime_type: None,
            }],
        }
    }

    fn ids(tracks: &[Track]) -> Vec<&str> {
        tracks.iter().map(|t| t.id.0.as_str()).collect()
    }

    #[test]
    fn candidates_exclude_known_ids_and_keep_order() {
        let mut state = SyncState::default();
        state.mark_succeeded(TrackId::from("2"));
        state.mark_failed(TrackId::from("4"));

        let liked = vec![track("5"), track("2"), track("1"), track("4"), track("3")];
        let candidates = select_candidates(liked, &state);
        assert_eq!(ids(&candidates), vec!["5", "1", "3"]);
    }

    #[test]
    fn duplicate_ids_are_processed_once() {
        let state = SyncState::default();
        let liked = vec![track("1"), track("2"), track("1")];
        assert_eq!(ids(&select_candidates(liked, &state)), vec!["1", "2"]);
    }

    #[test]
    fn settings_follow_config() {
        use likemirror_core::config::SoundCloudConfig;
        use std::time::Duration;

        let config = Config {
            soundcloud: SoundCloudConfig {
                client_id: "client".to_string(),
                user_id: "1".to_string(),
                page_size: 50,
                max_pages: 1,
                api_base: "https://api.example".to_string(),
            },
            dropbox_token: "token".to_string(),
            destination_prefix: "/Likes".to_string(),
            state_dir: PathBuf::from("/state"),
            staging_dir: PathBuf::from("/staging"),
            interval: Duration::from_secs(60),
        };
        let settings = SyncSettings::from_config(&config);
        assert_eq!(settings.client_id, "client");
        assert_eq!(settings.state_dir, PathBuf::from("/state"));
        assert_eq!(settings.target.staging_dir, PathBuf::from("/staging"));
        assert_eq!(settings.target.destination_prefix, "/Likes");
    }
}
