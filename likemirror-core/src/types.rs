//! Domain types for mirrored tracks.
//!
//! Tracks are produced by a [`TrackSource`](crate::ports::TrackSource) and are
//! immutable for the duration of a sync cycle. Only the [`TrackId`] outlives
//! the cycle, inside the persisted state records.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Opaque identifier of a track, unique per remote source.
///
/// Serialized as a JSON string. Deserialization also accepts JSON numbers,
/// which is how older state records store SoundCloud ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TrackId(pub String);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TrackId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<u64> for TrackId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TrackIdCompat {
    Text(String),
    Number(u64),
}

impl<'de> Deserialize<'de> for TrackId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match TrackIdCompat::deserialize(deserializer)? {
            TrackIdCompat::Text(s) => TrackId(s),
            TrackIdCompat::Number(n) => TrackId::from(n),
        })
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Delivery protocol of a transcoding.
///
/// Only [`Protocol::Progressive`] streams can be fetched with a single
/// request; manifest-based protocols are rejected by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Protocol {
    Progressive,
    Hls,
    Other(String),
}

impl Protocol {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "progressive" => Protocol::Progressive,
            "hls" => Protocol::Hls,
            other => Protocol::Other(other.to_owned()),
        }
    }

    pub fn is_progressive(&self) -> bool {
        matches!(self, Protocol::Progressive)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Progressive => write!(f, "progressive"),
            Protocol::Hls => write!(f, "hls"),
            Protocol::Other(tag) => write!(f, "{tag}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One encoding/delivery variant of a track's audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcoding {
    pub protocol: Protocol,
    /// Access URL template; the resolver appends credentials to it.
    pub url: String,
    pub mime_type: Option<String>,
}

/// A liked track as listed by the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    /// Transcodings in the order the source returned them.
    pub transcodings: Vec<Transcoding>,
}

impl Track {
    /// First progressive transcoding, if any. Source order wins ties.
    pub fn progressive_transcoding(&self) -> Option<&Transcoding> {
        self.transcodings.iter().find(|t| t.protocol.is_progressive())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn transcoding(protocol: &str, url: &str) -> Transcoding {
        Transcoding {
            protocol: Protocol::parse(protocol),
            url: url.to_string(),
            mime_type: None,
        }
    }

    #[test]
    fn track_id_accepts_numbers_and_strings() {
        let ids: Vec<TrackId> = serde_json::from_str(r#"[1339565397, "abc"]"#).expect("parse");
        assert_eq!(ids, vec![TrackId::from("1339565397"), TrackId::from("abc")]);
    }

    #[test]
    fn track_id_serializes_as_string() {
        let json = serde_json::to_string(&TrackId::from(42u64)).expect("serialize");
        assert_eq!(json, r#""42""#);
    }

    #[test]
    fn protocol_parse_and_display() {
        assert_eq!(Protocol::parse("progressive"), Protocol::Progressive);
        assert_eq!(Protocol::parse("hls"), Protocol::Hls);
        assert_eq!(
            Protocol::parse("ctr-encrypted-hls").to_string(),
            "ctr-encrypted-hls"
        );
    }

    #[test]
    fn first_progressive_transcoding_wins() {
        let track = Track {
            id: TrackId::from("1"),
            title: "song".to_string(),
            transcodings: vec![
                transcoding("hls", "https://a/hls"),
                transcoding("progressive", "https://a/first"),
                transcoding("progressive", "https://a/second"),
            ],
        };
        let picked = track.progressive_transcoding().expect("progressive");
        assert_eq!(picked.url, "https://a/first");
    }

    #[test]
    fn no_progressive_transcoding() {
        let track = Track {
            id: TrackId::from("2"),
            title: "stream only".to_string(),
            transcodings: vec![transcoding("hls", "https://a/hls")],
        };
        assert!(track.progressive_transcoding().is_none());
    }
}
