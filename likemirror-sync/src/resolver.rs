//! Stream resolution — from a track's transcodings to a direct download URL.
//!
//! 1. Pick the first progressive transcoding (source order, no tie-break).
//! 2. GET its access URL with `client_id` appended.
//! 3. Read the time-limited download URL from the `url` field of the reply.
//!
//! No retries at this layer.

use serde::Deserialize;
use url::Url;

use likemirror_core::{HttpFetch, Track};

use crate::error::TrackError;

#[derive(Debug, Deserialize)]
struct StreamLocation {
    url: Option<String>,
}

/// Resolve the direct download URL for `track`.
pub fn resolve_stream(
    http: &dyn HttpFetch,
    client_id: &str,
    track: &Track,
) -> Result<String, TrackError> {
    let transcoding =
        track
            .progressive_transcoding()
            .ok_or_else(|| TrackError::NoPlayableStream {
                title: track.title.clone(),
            })?;

    let failed = |reason: String| TrackError::StreamResolutionFailed {
        title: track.title.clone(),
        reason,
    };

    let info_url = stream_info_url(&transcoding.url, client_id)
        .map_err(|e| failed(format!("bad transcoding URL '{}': {e}", transcoding.url)))?;

    let response = http
        .get(info_url.as_str())
        .map_err(|e| failed(e.to_string()))?;
    if !response.is_success() {
        return Err(failed(format!("stream info returned HTTP {}", response.status)));
    }

    let location: StreamLocation = serde_json::from_slice(&response.body)
        .map_err(|e| failed(format!("stream info is not valid JSON: {e}")))?;

    match location.url {
        Some(url) if !url.trim().is_empty() => Ok(url),
        _ => Err(failed("stream info has no download URL".to_string())),
    }
}

/// Append the client credential to a transcoding's URL template, keeping any
/// query parameters it already carries.
pub fn stream_info_url(template: &str, client_id: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(template)?;
    url.query_pairs_mut().append_pair("client_id", client_id);
    Ok(url)
}
