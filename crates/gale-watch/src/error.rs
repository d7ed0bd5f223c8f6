//! Error types for the arrival watcher.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for watcher operations.
pub type Result<T> = std::result::Result<T, WatchError>;

/// Errors that can occur during arrival watching.
#[derive(Debug, Error)]
pub enum WatchError {
    /// Failed to create the filesystem watcher.
    #[error("failed to create file watcher: {0}")]
    InitFailed(String),

    /// Failed to watch a path.
    #[error("failed to watch path {path}: {error}")]
    WatchFailed { path: PathBuf, error: String },

    /// Filesystem failure while scanning or staging.
    #[error("watcher I/O at '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An external transform failed.
    #[error(transparent)]
    Transform(#[from] crate::transform::TransformError),
}

impl WatchError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
