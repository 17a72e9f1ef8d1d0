//! Error types for fetching, storage and configuration.
//!
//! None of these are fatal to a crawl. A [`FetchError`] abandons one article
//! (or one source when the root page fails), a [`StoreError`] drops one
//! article, and a [`ConfigError`] rejects one source or the startup config.
//! Pages without a title are not errors at all; extraction returns `None`.

use std::path::PathBuf;

/// Failure retrieving a page over HTTP.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request could not be sent or the connection failed.
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },

    /// The body could not be read or decoded.
    #[error("could not read body of {url}: {reason}")]
    Body { url: String, reason: String },

    /// The concurrency limiter was shut down while the fetch waited for a slot.
    #[error("fetch limiter closed before {url} could start")]
    LimiterClosed { url: String },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Request { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Body { url, .. }
            | FetchError::LimiterClosed { url } => url,
        }
    }
}

/// Failure in an article store or source catalog.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("could not encode source rules: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("a source with root url '{root_url}' already exists")]
    SourceExists { root_url: String },

    #[error("no source with root url '{root_url}'")]
    SourceNotFound { root_url: String },

    #[error("stored row is invalid: {0}")]
    InvalidRow(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Invalid configuration file, selector or link pattern.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid {field} '{selector}': {reason}")]
    InvalidSelector {
        field: &'static str,
        selector: String,
        reason: String,
    },

    #[error("invalid link pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("invalid url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{0} must be at least 1")]
    ZeroLimit(&'static str),

    #[error("{name} must be at most {max}")]
    LimitTooLarge { name: &'static str, max: usize },
}
