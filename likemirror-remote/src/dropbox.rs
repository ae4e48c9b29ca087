//! Dropbox uploads via `files/upload`.
//!
//! Files are sent in a single request with `mode: add` and
//! `autorename: false`, so an existing object is never overwritten. Dropbox
//! answers HTTP 409 with an `error_summary` starting with `path/conflict/`
//! in that case, which maps to [`UploadOutcome::AlreadyExists`].

use serde::{Deserialize, Serialize};

use likemirror_core::{ObjectStore, StoreError, UploadOutcome};

use crate::http::{build_agent, into_response, snippet};

pub const DEFAULT_CONTENT_BASE: &str = "https://content.dropboxapi.com";

#[derive(Debug, Serialize)]
struct UploadArg<'a> {
    path: &'a str,
    mode: &'static str,
    autorename: bool,
    mute: bool,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error_summary: Option<String>,
}

/// `Dropbox-API-Arg` header value for an upload to `destination`.
///
/// HTTP headers must be ASCII, so every non-ASCII character is escaped as
/// `\uXXXX` (surrogate pairs above the BMP).
pub fn upload_arg(destination: &str) -> String {
    let arg = UploadArg {
        path: destination,
        mode: "add",
        autorename: false,
        mute: true,
    };
    // Serializing a struct of strings and bools cannot fail.
    let json = serde_json::to_string(&arg).unwrap_or_default();
    escape_non_ascii(&json)
}

/// Header values must be visible ASCII, so DEL is escaped along with non-ASCII.
fn escape_non_ascii(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() && c != '\x7f' {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    out
}

/// Map a `files/upload` reply to an outcome.
pub fn classify_response(
    destination: &str,
    status: u16,
    body: &[u8],
) -> Result<UploadOutcome, StoreError> {
    if (200..300).contains(&status) {
        return Ok(UploadOutcome::Created);
    }

    let summary = serde_json::from_slice::<ApiError>(body)
        .ok()
        .and_then(|e| e.error_summary);
    if status == 409 {
        if let Some(summary) = summary.as_deref() {
            if summary.starts_with("path/conflict") {
                return Ok(UploadOutcome::AlreadyExists);
            }
        }
    }

    Err(StoreError {
        destination: destination.to_string(),
        reason: match summary {
            Some(summary) => format!("HTTP {status}: {summary}"),
            None => format!("HTTP {status}: {}", snippet(body, 200)),
        },
    })
}

/// [`ObjectStore`] writing into a Dropbox account.
pub struct DropboxStore {
    agent: ureq::Agent,
    token: String,
    content_base: String,
}

impl DropboxStore {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_content_base(token, DEFAULT_CONTENT_BASE)
    }

    pub fn with_content_base(token: impl Into<String>, content_base: impl Into<String>) -> Self {
        Self {
            agent: build_agent(),
            token: token.into(),
            content_base: content_base.into().trim_end_matches('/').to_string(),
        }
    }
}

impl ObjectStore for DropboxStore {
    fn upload(&self, bytes: &[u8], destination: &str) -> Result<UploadOutcome, StoreError> {
        let url = format!("{}/2/files/upload", self.content_base);
        tracing::debug!(%destination, bytes = bytes.len(), "dropbox upload");

        let result = self
            .agent
            .post(&url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Dropbox-API-Arg", &upload_arg(destination))
            .set("Content-Type", "application/octet-stream")
            .send_bytes(bytes);

        let response = into_response(&url, result).map_err(|e| StoreError {
            destination: destination.to_string(),
            reason: e.reason,
        })?;
        classify_response(destination, response.status, &response.body)
    }
}
