//! SoundCloud likes listing.
//!
//! `GET {api}/users/{user}/likes?client_id=..&limit=..` returns
//!
//! ```text
//! { "collection": [ { "track": { "id", "title", "media": { "transcodings": [..] } } }, .. ],
//!   "next_href": "https://.../likes?offset=..." }
//! ```
//!
//! Entries without a `track` (liked playlists) and tracks that fail
//! validation are skipped here, so the pipeline only ever sees well-formed
//! [`Track`] values.

use serde::Deserialize;
use url::Url;

use likemirror_core::config::SoundCloudConfig;
use likemirror_core::{HttpFetch, Protocol, SourceError, Track, TrackId, TrackSource, Transcoding};

use crate::http::{redact, snippet};

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct LikesPage {
    #[serde(default)]
    collection: Vec<LikeEntry>,
    next_href: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LikeEntry {
    track: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawTrack {
    id: Option<TrackId>,
    title: Option<String>,
    media: Option<RawMedia>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMedia {
    #[serde(default)]
    transcodings: Vec<RawTranscoding>,
}

#[derive(Debug, Deserialize)]
struct RawTranscoding {
    url: Option<String>,
    format: Option<RawFormat>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    protocol: Option<String>,
    mime_type: Option<String>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Turn one `track` object into a [`Track`], or explain why it was dropped.
fn validate_track(value: serde_json::Value) -> Result<Track, String> {
    let raw: RawTrack = serde_json::from_value(value).map_err(|e| e.to_string())?;
    let id = raw.id.ok_or("missing id")?;
    let title = raw
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| format!("track {id} has no title"))?;

    let transcodings = raw
        .media
        .unwrap_or_default()
        .transcodings
        .into_iter()
        .filter_map(|t| {
            let format = t.format?;
            Some(Transcoding {
                protocol: Protocol::parse(&format.protocol?),
                url: t.url?,
                mime_type: format.mime_type,
            })
        })
        .collect();

    Ok(Track {
        id,
        title,
        transcodings,
    })
}

fn parse_page(body: &[u8]) -> Result<(Vec<Track>, Option<String>), SourceError> {
    let page: LikesPage =
        serde_json::from_slice(body).map_err(|e| SourceError::Decode(e.to_string()))?;

    let mut tracks = Vec::with_capacity(page.collection.len());
    for entry in page.collection {
        let Some(value) = entry.track else { continue };
        if value.is_null() {
            continue;
        }
        match validate_track(value) {
            Ok(track) => tracks.push(track),
            Err(reason) => tracing::warn!(%reason, "skipping malformed liked track"),
        }
    }
    Ok((tracks, page.next_href))
}

// ---------------------------------------------------------------------------
// Lister
// ---------------------------------------------------------------------------

/// [`TrackSource`] backed by the SoundCloud v2 API.
pub struct SoundCloudLikes<H> {
    http: H,
    config: SoundCloudConfig,
}

impl<H: HttpFetch> SoundCloudLikes<H> {
    pub fn new(http: H, config: SoundCloudConfig) -> Self {
        Self { http, config }
    }

    /// URL of the first likes page.
    pub fn first_page_url(&self) -> Result<Url, SourceError> {
        let raw = format!(
            "{}/users/{}/likes",
            self.config.api_base.trim_end_matches('/'),
            self.config.user_id
        );
        let mut url = Url::parse(&raw).map_err(|e| SourceError::Decode(format!("{raw}: {e}")))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("limit", &self.config.page_size.to_string());
        Ok(url)
    }

    /// `next_href` usually omits the credential; add it back if needed.
    fn authorize(&self, href: &str) -> Result<Url, SourceError> {
        let mut url = Url::parse(href).map_err(|e| SourceError::Decode(format!("next_href: {e}")))?;
        if !url.query_pairs().any(|(k, _)| k == "client_id") {
            url.query_pairs_mut()
                .append_pair("client_id", &self.config.client_id);
        }
        Ok(url)
    }
}

impl<H: HttpFetch> TrackSource for SoundCloudLikes<H> {
    fn liked_tracks(&self) -> Result<Vec<Track>, SourceError> {
        let mut tracks = Vec::new();
        let mut next = Some(self.first_page_url()?);
        let mut pages = 0u32;

        while let Some(url) = next.take() {
            let response = self.http.get(url.as_str())?;
            if !response.is_success() {
                return Err(SourceError::Status {
                    status: response.status,
                    body: snippet(&response.body, 200),
                });
            }
            let (page_tracks, next_href) = parse_page(&response.body)?;
            pages += 1;
            tracing::debug!(
                url = %redact(url.as_str()),
                tracks = page_tracks.len(),
                page = pages,
                "fetched likes page"
            );
            tracks.extend(page_tracks);

            if pages < self.config.max_pages {
                next = next_href
                    .filter(|href| !href.is_empty())
                    .map(|href| self.authorize(&href))
                    .transpose()?;
            }
        }

        tracing::info!(count = tracks.len(), "fetched liked tracks");
        Ok(tracks)
    }
}
