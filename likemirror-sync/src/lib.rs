//! # likemirror-sync
//!
//! Exactly-once mirroring of liked tracks into remote storage.
//!
//! Build an [`Orchestrator`] from a [`SyncSettings`] and the three capability
//! implementations, then call [`Orchestrator::run_cycle`] once per trigger.

pub mod error;
pub mod pipeline;
pub mod resolver;
pub mod state_store;
pub mod transfer;

pub use error::{StateError, TrackError};
pub use pipeline::{
    select_candidates, CycleOutcome, CycleReport, Orchestrator, SyncSettings, TrackFailure,
    TrackSuccess,
};
pub use state_store::{StateStore, SyncState, TrackIdSet, FAILED_RECORD, SUCCEEDED_RECORD};
pub use transfer::{staged_file_name, StagedFile, TransferOutcome, TransferTarget};
