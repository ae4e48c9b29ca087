//! likemirror core library — domain types, configuration, capability traits.
//!
//! - [`types`] — tracks, transcodings, identifiers
//! - [`config`] — immutable process configuration
//! - [`ports`] — listing / fetch / upload seams
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod ports;
pub mod types;

pub use config::Config;
pub use error::ConfigError;
pub use ports::{
    FetchError, HttpFetch, HttpResponse, ObjectStore, SourceError, StoreError, TrackSource,
    UploadOutcome,
};
pub use types::{Protocol, Track, TrackId, Transcoding};
