//! Capability traits consumed by the sync pipeline.
//!
//! Every side effect of a cycle goes through one of these seams so the
//! orchestrator can be driven by in-memory fakes in tests:
//!
//! - [`TrackSource`] lists the liked tracks
//! - [`HttpFetch`] performs plain GET requests (stream resolution, download)
//! - [`ObjectStore`] uploads a finished file to remote storage

use thiserror::Error;

use crate::types::Track;

// ---------------------------------------------------------------------------
// HTTP fetch
// ---------------------------------------------------------------------------

/// A fully-read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a response (DNS, TLS, connection reset, ...).
#[derive(Debug, Error)]
#[error("request to {url} failed: {reason}")]
pub struct FetchError {
    pub url: String,
    pub reason: String,
}

/// Blocking HTTP GET capability.
///
/// Non-2xx statuses are returned as `Ok` responses; callers decide what a
/// failing status means.
pub trait HttpFetch: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpResponse, FetchError>;
}

// ---------------------------------------------------------------------------
// Object store
// ---------------------------------------------------------------------------

/// Successful result of an upload request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// A new object was created at the destination.
    Created,
    /// The destination already held an object; nothing was written.
    AlreadyExists,
}

/// An upload was rejected for a reason other than a path conflict.
#[derive(Debug, Error)]
#[error("upload to {destination} failed: {reason}")]
pub struct StoreError {
    pub destination: String,
    pub reason: String,
}

/// Remote storage that accepts whole-file uploads with "do not overwrite"
/// semantics.
pub trait ObjectStore: Send + Sync {
    fn upload(&self, bytes: &[u8], destination: &str) -> Result<UploadOutcome, StoreError>;
}

// ---------------------------------------------------------------------------
// Track source
// ---------------------------------------------------------------------------

/// Listing the liked tracks failed as a whole.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("listing request failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("listing returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("listing response is not valid JSON: {0}")]
    Decode(String),
}

/// Lists the user's liked tracks, in the order the service returns them.
///
/// Entries that are not tracks, or that fail validation, are dropped by the
/// implementation rather than reported as errors.
pub trait TrackSource: Send + Sync {
    fn liked_tracks(&self) -> Result<Vec<Track>, SourceError>;
}
