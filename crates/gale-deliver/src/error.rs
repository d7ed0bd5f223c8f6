//! Error types for delivery.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for delivery operations.
pub type Result<T> = std::result::Result<T, DeliverError>;

/// Errors that can occur delivering an artifact.
#[derive(Debug, Error)]
pub enum DeliverError {
    /// The HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),

    /// The source file could not be read.
    #[error("failed to read '{path}': {source}")]
    ReadSource {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Every attempt failed.
    #[error("delivery failed after {attempts} attempt(s): {last_error}")]
    DeliveryFailed { attempts: u32, last_error: String },
}
