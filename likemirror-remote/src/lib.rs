//! Network adapters for the likemirror capability traits.
//!
//! - [`UreqFetcher`] — [`HttpFetch`](likemirror_core::HttpFetch) over `ureq`
//! - [`SoundCloudLikes`] — [`TrackSource`](likemirror_core::TrackSource)
//! - [`DropboxStore`] — [`ObjectStore`](likemirror_core::ObjectStore)

pub mod dropbox;
pub mod http;
pub mod soundcloud;

pub use dropbox::DropboxStore;
pub use http::UreqFetcher;
pub use soundcloud::SoundCloudLikes;
