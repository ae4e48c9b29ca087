//! Blocking HTTP client shared by every adapter.

use std::io::Read;
use std::time::Duration;

use likemirror_core::{FetchError, HttpFetch, HttpResponse};

/// The likes endpoint rejects requests without a browser-like agent.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const READ_TIMEOUT: Duration = Duration::from_secs(300);

/// [`HttpFetch`] over a shared `ureq` agent. Cheap to clone.
#[derive(Clone)]
pub struct UreqFetcher {
    agent: ureq::Agent,
}

impl UreqFetcher {
    pub fn new() -> Self {
        Self {
            agent: build_agent(),
        }
    }

    pub fn agent(&self) -> &ureq::Agent {
        &self.agent
    }
}

impl Default for UreqFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetch for UreqFetcher {
    fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        tracing::debug!(url = %redact(url), "GET");
        into_response(url, self.agent.get(url).call())
    }
}

pub(crate) fn build_agent() -> ureq::Agent {
    ureq::AgentBuilder::new()
        .user_agent(USER_AGENT)
        .timeout_connect(CONNECT_TIMEOUT)
        .timeout_read(READ_TIMEOUT)
        .build()
}

/// Fold `ureq`'s status errors back into plain responses; only transport
/// failures stay errors.
pub(crate) fn into_response(
    url: &str,
    result: Result<ureq::Response, ureq::Error>,
) -> Result<HttpResponse, FetchError> {
    let response = match result {
        Ok(response) => response,
        Err(ureq::Error::Status(_, response)) => response,
        Err(ureq::Error::Transport(transport)) => {
            return Err(FetchError {
                url: redact(url),
                reason: transport_reason(&transport),
            })
        }
    };

    let status = response.status();
    let mut body = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut body)
        .map_err(|e| FetchError {
            url: redact(url),
            reason: format!("reading body: {e}"),
        })?;
    Ok(HttpResponse { status, body })
}

/// Strip the query string, which carries credentials and signatures.
pub fn redact(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => format!("{base}?…"),
        None => url.to_string(),
    }
}

/// Kind, message and cause of a transport failure. `Transport`'s own display
/// leads with the full request URL, so it is never used directly.
fn transport_reason(transport: &ureq::Transport) -> String {
    let mut reason = transport.kind().to_string();
    if let Some(message) = transport.message() {
        reason.push_str(": ");
        reason.push_str(message);
    }
    if let Some(source) = std::error::Error::source(transport) {
        reason.push_str(": ");
        reason.push_str(&source.to_string());
    }
    reason
        .split(' ')
        .map(redact)
        .collect::<Vec<_>>()
        .join(" ")
}

/// First `max` characters of a body, for error messages.
pub(crate) fn snippet(body: &[u8], max: usize) -> String {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
