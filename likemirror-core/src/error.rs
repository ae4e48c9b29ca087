//! Error types for likemirror-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while building a [`Config`](crate::config::Config).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure reading the config file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, with file path for context.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A required setting was not supplied by the file or the environment.
    #[error("missing required setting {0}")]
    Missing(&'static str),

    /// A setting was supplied but could not be interpreted.
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}
