//! Error types for configuration and reporting.
//!
//! Probe failures are not errors; they are carried in `ProbeResult`.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for configuration handling.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Invalid or unreadable check configuration, reported before probing.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required input: url")]
    MissingUrl,

    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported url scheme {0:?} (expected http or https)")]
    UnsupportedScheme(String),

    #[error("url has no host: {0}")]
    MissingHost(String),

    #[error("invalid timeout {0:?} (expected a positive duration such as 30, 500ms, 5s)")]
    InvalidTimeout(String),

    #[error("invalid retry count {0:?} (expected an integer >= 1)")]
    InvalidRetryCount(String),

    #[error("invalid expected status {0:?} (expected an HTTP status code 100-599)")]
    InvalidStatus(String),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Errors raised while emitting outputs or summaries.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize probe result: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The HTTP client could not be constructed.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build TLS client config: {0}")]
    Tls(#[from] rustls::Error),
}
