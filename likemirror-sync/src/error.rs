//! Error types for likemirror-sync.

use std::path::PathBuf;

use thiserror::Error;

use likemirror_core::StoreError;

/// Errors from persisting the sync state records.
#[derive(Debug, Error)]
pub enum StateError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (state record).
    #[error("state record JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a single track could not be mirrored.
///
/// Every variant marks the track as permanently failed; none of them abort
/// the cycle.
#[derive(Debug, Error)]
pub enum TrackError {
    /// The track offers no progressive transcoding.
    #[error("no progressive stream available for '{title}'")]
    NoPlayableStream { title: String },

    /// The stream-info request failed or did not carry a download URL.
    #[error("could not resolve stream for '{title}': {reason}")]
    StreamResolutionFailed { title: String, reason: String },

    /// The audio bytes could not be fetched.
    #[error("download of '{title}' failed: {reason}")]
    DownloadFailed { title: String, reason: String },

    /// The staged file could not be written or read back.
    #[error("staging file {path} failed: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Remote storage rejected the upload for a reason other than a conflict.
    #[error("upload of '{title}' failed: {source}")]
    UploadFailed {
        title: String,
        #[source]
        source: StoreError,
    },
}

impl TrackError {
    /// Stable short name, used in reports and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TrackError::NoPlayableStream { .. } => "no_playable_stream",
            TrackError::StreamResolutionFailed { .. } => "stream_resolution_failed",
            TrackError::DownloadFailed { .. } => "download_failed",
            TrackError::Staging { .. } => "staging_failed",
            TrackError::UploadFailed { .. } => "upload_failed",
        }
    }
}

/// Convenience constructor for [`StateError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StateError {
    StateError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`TrackError::Staging`].
pub(crate) fn staging_err(path: impl Into<PathBuf>, source: std::io::Error) -> TrackError {
    TrackError::Staging {
        path: path.into(),
        source,
    }
}
