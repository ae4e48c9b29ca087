//! Process configuration, read once at startup.
//!
//! # Sources (lowest precedence first)
//!
//! 1. Built-in defaults
//! 2. `<home>/.likemirror/config.yaml` (every key optional)
//! 3. Environment variables
//!
//! ```text
//! SOUNDCLOUD_CLIENT_ID          soundcloud.client_id
//! SOUNDCLOUD_USER_ID            soundcloud.user_id
//! SOUNDCLOUD_API_BASE           soundcloud.api_base
//! DROPBOX_TOKEN                 dropbox.token
//! LIKEMIRROR_DESTINATION        dropbox.destination
//! LIKEMIRROR_STATE_DIR          state_dir
//! LIKEMIRROR_STAGING_DIR        staging_dir
//! LIKEMIRROR_INTERVAL_MINUTES   interval_minutes
//! ```
//!
//! # API pattern
//!
//! Same as the rest of the workspace: `fn_at(home, env)` takes an explicit
//! home directory and environment lookup (used in tests), `fn()` derives both
//! from the process.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_DESTINATION: &str = "/SoundCloudDownloads";
pub const DEFAULT_SOUNDCLOUD_API_BASE: &str = "https://api-v2.soundcloud.com";
pub const DEFAULT_INTERVAL_MINUTES: u64 = 60;
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const DEFAULT_MAX_PAGES: u32 = 1;

/// Environment lookup used by the `_at` constructors.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.likemirror/`
pub fn likemirror_root(home: &Path) -> PathBuf {
    home.join(".likemirror")
}

/// `<home>/.likemirror/config.yaml`
pub fn config_path_at(home: &Path) -> PathBuf {
    likemirror_root(home).join("config.yaml")
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Credentials and paging for the likes listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundCloudConfig {
    pub client_id: String,
    pub user_id: String,
    pub page_size: u32,
    pub max_pages: u32,
    /// Scheme and host of the v2 API, no trailing slash.
    pub api_base: String,
}

/// Immutable configuration handed to the orchestrator and its adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub soundcloud: SoundCloudConfig,
    pub dropbox_token: String,
    /// Remote folder receiving the uploads, e.g. `/SoundCloudDownloads`.
    pub destination_prefix: String,
    pub state_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub interval: Duration,
}

impl Config {
    /// Build the configuration from `<home>/.likemirror/config.yaml` and `env`.
    pub fn load_at(home: &Path, env: EnvLookup<'_>) -> Result<Self, ConfigError> {
        let file = ConfigFile::load_at(home)?;
        let soundcloud = file.soundcloud.unwrap_or_default();
        let dropbox = file.dropbox.unwrap_or_default();

        let client_id = pick(env, "SOUNDCLOUD_CLIENT_ID", soundcloud.client_id)
            .ok_or(ConfigError::Missing("SOUNDCLOUD_CLIENT_ID"))?;
        let user_id = pick(env, "SOUNDCLOUD_USER_ID", soundcloud.user_id)
            .ok_or(ConfigError::Missing("SOUNDCLOUD_USER_ID"))?;
        let dropbox_token = pick(env, "DROPBOX_TOKEN", dropbox.token)
            .ok_or(ConfigError::Missing("DROPBOX_TOKEN"))?;

        let destination = pick(env, "LIKEMIRROR_DESTINATION", dropbox.destination)
            .unwrap_or_else(|| DEFAULT_DESTINATION.to_string());

        let interval_minutes = match env("LIKEMIRROR_INTERVAL_MINUTES") {
            Some(raw) => parse_minutes(&raw)?,
            None => file.interval_minutes.unwrap_or(DEFAULT_INTERVAL_MINUTES),
        };
        if interval_minutes == 0 {
            return Err(ConfigError::Invalid {
                name: "interval_minutes",
                reason: "must be at least 1".to_string(),
            });
        }

        let api_base = pick(env, "SOUNDCLOUD_API_BASE", soundcloud.api_base)
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_SOUNDCLOUD_API_BASE.to_string());

        let page_size = soundcloud.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(ConfigError::Invalid {
                name: "soundcloud.page_size",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Config {
            soundcloud: SoundCloudConfig {
                client_id,
                user_id,
                page_size,
                max_pages: soundcloud.max_pages.unwrap_or(DEFAULT_MAX_PAGES).max(1),
                api_base,
            },
            dropbox_token,
            destination_prefix: normalize_destination(&destination),
            state_dir: resolve_dir(env, "LIKEMIRROR_STATE_DIR", file.state_dir, || {
                default_state_dir(home)
            }),
            staging_dir: resolve_dir(env, "LIKEMIRROR_STAGING_DIR", file.staging_dir, || {
                likemirror_root(home).join("staging")
            }),
            interval: Duration::from_secs(interval_minutes * 60),
        })
    }

    /// `load_at` convenience wrapper using `dirs::home_dir()` and the process
    /// environment.
    pub fn load() -> Result<Self, ConfigError> {
        let home = home()?;
        Config::load_at(&home, &process_env)
    }
}

/// State directory only, for commands that never talk to the network.
pub fn state_dir_at(home: &Path, env: EnvLookup<'_>) -> Result<PathBuf, ConfigError> {
    let file = ConfigFile::load_at(home)?;
    Ok(resolve_dir(env, "LIKEMIRROR_STATE_DIR", file.state_dir, || {
        default_state_dir(home)
    }))
}

/// `state_dir_at` convenience wrapper.
pub fn state_dir() -> Result<PathBuf, ConfigError> {
    state_dir_at(&home()?, &process_env)
}

// ---------------------------------------------------------------------------
// On-disk file
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    soundcloud: Option<SoundCloudSection>,
    dropbox: Option<DropboxSection>,
    state_dir: Option<PathBuf>,
    staging_dir: Option<PathBuf>,
    interval_minutes: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SoundCloudSection {
    client_id: Option<String>,
    /// Numeric in SoundCloud URLs, so YAML usually parses it as an integer.
    #[serde(default, deserialize_with = "string_or_number")]
    user_id: Option<String>,
    page_size: Option<u32>,
    max_pages: Option<u32>,
    api_base: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DropboxSection {
    token: Option<String>,
    destination: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Number(u64),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
        Scalar::Text(s) => s,
        Scalar::Number(n) => n.to_string(),
    }))
}

impl ConfigFile {
    /// Returns an empty file if `config.yaml` does not exist.
    fn load_at(home: &Path) -> Result<Self, ConfigError> {
        let path = config_path_at(home);
        if !path.exists() {
            return Ok(ConfigFile::default());
        }
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        if contents.trim().is_empty() {
            return Ok(ConfigFile::default());
        }
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn default_state_dir(home: &Path) -> PathBuf {
    likemirror_root(home).join("state")
}

/// Environment wins over the file; blank values count as unset.
fn pick(env: EnvLookup<'_>, key: &str, file_value: Option<String>) -> Option<String> {
    env(key)
        .or(file_value)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn resolve_dir(
    env: EnvLookup<'_>,
    key: &str,
    file_value: Option<PathBuf>,
    default: impl FnOnce() -> PathBuf,
) -> PathBuf {
    env(key)
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .or(file_value)
        .unwrap_or_else(default)
}

fn parse_minutes(raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::Invalid {
            name: "LIKEMIRROR_INTERVAL_MINUTES",
            reason: e.to_string(),
        })
}

/// Leading slash, no trailing slash: `SoundCloudDownloads/` → `/SoundCloudDownloads`.
/// The account root normalizes to the empty prefix.
fn normalize_destination(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
