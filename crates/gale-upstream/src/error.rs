//! Error types for upstream access.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for upstream operations.
pub type Result<T> = std::result::Result<T, UpstreamError>;

/// Errors that can occur talking to the upstream archive.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Transport-level HTTP failure.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an unexpected status.
    #[error("unexpected status {status} from {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// No listed date exposed an eligible hour.
    #[error("no eligible run found in upstream listing")]
    NoEligibleRun,

    /// Local filesystem failure while landing a download.
    #[error("download I/O at '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
