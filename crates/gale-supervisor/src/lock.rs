//! Single-instance lock.
//!
//! A lock file holding the owner's PID. Acquisition fails — fatally, with
//! a user-visible message — when the recorded owner is still alive; a
//! stale lock left by a dead owner is taken over silently. The lock is
//! released (file removed) on drop, but only by the process that wrote
//! it, so a crashed owner's successor is never blocked by our cleanup.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, SupervisorError};
use crate::process::pid_alive;

/// An acquired single-instance lock.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
    pid: i32,
}

impl InstanceLock {
    /// Acquire the lock, or fail with [`SupervisorError::AlreadyRunning`].
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(owner) = read_owner(&path) {
            if pid_alive(owner) {
                return Err(SupervisorError::AlreadyRunning {
                    pid: owner,
                    path,
                });
            }
            info!(stale_pid = owner, path = %path.display(), "replacing stale lock");
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(SupervisorError::io(parent))?;
        }
        let pid = std::process::id() as i32;
        std::fs::write(&path, format!("{pid}\n")).map_err(SupervisorError::io(&path))?;
        debug!(pid, path = %path.display(), "lock acquired");
        Ok(Self { path, pid })
    }

    /// The lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The owning PID recorded in a lock file, if the file exists and
    /// parses.
    pub fn owner_of(path: &Path) -> Option<i32> {
        read_owner(path)
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        // Only the writer removes its own lock
        if read_owner(&self.path) == Some(self.pid) {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

fn read_owner(path: &Path) -> Option<i32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn acquire_writes_our_pid_and_releases_on_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gale.lock");

        let lock = InstanceLock::acquire(&path).unwrap();
        assert_eq!(
            InstanceLock::owner_of(&path),
            Some(std::process::id() as i32)
        );

        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn live_owner_refuses_a_second_acquire() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gale.lock");

        let _lock = InstanceLock::acquire(&path).unwrap();
        let err = InstanceLock::acquire(&path).unwrap_err();
        assert!(matches!(err, SupervisorError::AlreadyRunning { .. }));
    }

    #[test]
    fn stale_lock_is_taken_over() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gale.lock");
        // A PID far beyond any default pid_max is never alive
        std::fs::write(&path, "2000000000\n").unwrap();

        let lock = InstanceLock::acquire(&path).unwrap();
        assert_eq!(
            InstanceLock::owner_of(&path),
            Some(std::process::id() as i32)
        );
        drop(lock);
    }

    #[test]
    fn unreadable_lock_content_is_treated_as_stale() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gale.lock");
        std::fs::write(&path, "not a pid").unwrap();

        let lock = InstanceLock::acquire(&path);
        assert!(lock.is_ok());
    }
}
