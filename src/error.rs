//! Error types for the scan pipeline.
//!
//! Fetch failures carry a [`FailureKind`] so the retry policy can decide on
//! the kind alone, without inspecting the underlying client error.

use std::path::PathBuf;
use thiserror::Error;

/// Whether a failed fetch is worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection failure, timeout, or HTTP 503.
    Transient,
    /// Any other failure; retrying will not help.
    Terminal,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid target {target:?}: {source}")]
    InvalidTarget {
        target: String,
        #[source]
        source: url::ParseError,
    },

    #[error("connection to {url} failed: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out")]
    Timeout {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("server error: 503 for url: {url}")]
    ServiceUnavailable { url: String },

    #[error("HTTP {status} for url: {url}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Connect { .. }
            | FetchError::Timeout { .. }
            | FetchError::ServiceUnavailable { .. } => FailureKind::Transient,
            FetchError::InvalidTarget { .. }
            | FetchError::Status { .. }
            | FetchError::Request { .. } => FailureKind::Terminal,
        }
    }

    /// Classifies a client error raised while sending a request or reading its body.
    pub(crate) fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        let url = url.to_string();
        if source.is_timeout() {
            FetchError::Timeout { url, source }
        } else if source.is_connect() {
            FetchError::Connect { url, source }
        } else {
            FetchError::Request { url, source }
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read vulnerability database {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to download vulnerability database from {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("vulnerability database download from {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("malformed vulnerability database: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to cache vulnerability database at {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("File '{}' not found.", .0.display())]
    NotFound(PathBuf),

    #[error("An error occurred while reading the file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
