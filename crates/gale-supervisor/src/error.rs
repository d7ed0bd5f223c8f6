//! Error types for supervision.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for supervisor operations.
pub type Result<T> = std::result::Result<T, SupervisorError>;

/// Errors that can occur supervising watcher processes.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Another supervisor instance holds the lock.
    ///
    /// The one fatal, user-visible startup error: nothing has been
    /// touched, and the caller must exit non-zero with this message.
    #[error("another instance is already running (pid {pid}, lock {path})")]
    AlreadyRunning { pid: i32, path: PathBuf },

    /// A watcher process could not be spawned.
    #[error("failed to spawn watcher '{name}': {source}")]
    Spawn {
        name: String,
        source: std::io::Error,
    },

    /// Filesystem failure on a lock, PID, or log file.
    #[error("supervisor I/O at '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl SupervisorError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
