//! Process handles for supervised watchers.
//!
//! `start` is a no-op when the watcher is already alive — either through
//! a child handle we hold, or through a live PID recorded by a previous
//! supervisor life. `stop` escalates: SIGTERM, a grace period, SIGKILL.
//! PID files are written next to every spawn and removed on stop so that
//! `status` (a separate process) can report without talking to us.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use gale_config::WatcherSpec;

use crate::error::{Result, SupervisorError};

/// Liveness of an arbitrary PID.
///
/// `kill(pid, 0)` delivers nothing; success or EPERM means the process
/// exists.
pub fn pid_alive(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }
    let rc = unsafe { libc::kill(pid, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// Outcome of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A live process was already registered under this name.
    AlreadyRunning { pid: i32 },
    /// A new process was spawned.
    Started { pid: i32 },
}

/// Outcome of a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// No live process was registered under this name.
    NotRunning,
    /// The process exited within the grace period.
    Stopped,
    /// The process ignored SIGTERM and was killed.
    Killed,
}

/// Spawns, tracks, and terminates watcher processes.
pub struct ProcessSupervisor {
    pid_dir: PathBuf,
    log_dir: PathBuf,
    grace: Duration,
    children: HashMap<String, Child>,
}

impl ProcessSupervisor {
    pub fn new(pid_dir: impl Into<PathBuf>, log_dir: impl Into<PathBuf>, grace: Duration) -> Self {
        Self {
            pid_dir: pid_dir.into(),
            log_dir: log_dir.into(),
            grace,
            children: HashMap::new(),
        }
    }

    /// PID file path for a watcher name.
    pub fn pid_path(&self, name: &str) -> PathBuf {
        self.pid_dir.join(format!("{name}.pid"))
    }

    /// Log file path for a watcher name.
    pub fn log_path(&self, name: &str) -> PathBuf {
        self.log_dir.join(format!("{name}.log"))
    }

    /// Read a watcher's recorded PID, if any.
    pub fn recorded_pid(&self, name: &str) -> Option<i32> {
        std::fs::read_to_string(self.pid_path(name))
            .ok()?
            .trim()
            .parse()
            .ok()
    }

    /// Whether a watcher is currently alive.
    ///
    /// An owned child handle answers authoritatively (and reaps an exited
    /// child); otherwise the recorded PID is checked for liveness.
    pub fn is_alive(&mut self, name: &str) -> bool {
        if let Some(child) = self.children.get_mut(name) {
            match child.try_wait() {
                Ok(None) => return true,
                Ok(Some(status)) => {
                    debug!(watcher = name, %status, "child exited");
                    self.children.remove(name);
                }
                Err(e) => {
                    warn!(watcher = name, error = %e, "child wait failed");
                    self.children.remove(name);
                }
            }
        }
        self.recorded_pid(name).map(pid_alive).unwrap_or(false)
    }

    /// Start a watcher unless it is already running.
    ///
    /// Stdout and stderr are appended to the watcher's log file; the
    /// child runs detached from the supervisor's own stdio.
    pub async fn start(&mut self, spec: &WatcherSpec) -> Result<StartOutcome> {
        if self.is_alive(&spec.name) {
            let pid = self
                .children
                .get(&spec.name)
                .and_then(|c| c.id())
                .map(|p| p as i32)
                .or_else(|| self.recorded_pid(&spec.name))
                .unwrap_or(-1);
            return Ok(StartOutcome::AlreadyRunning { pid });
        }

        std::fs::create_dir_all(&self.pid_dir).map_err(SupervisorError::io(&self.pid_dir))?;
        std::fs::create_dir_all(&self.log_dir).map_err(SupervisorError::io(&self.log_dir))?;

        let log_path = self.log_path(&spec.name);
        let log = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(SupervisorError::io(&log_path))?;
        let log_err = log.try_clone().map_err(SupervisorError::io(&log_path))?;

        let child = Command::new(&spec.command)
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .spawn()
            .map_err(|e| SupervisorError::Spawn {
                name: spec.name.clone(),
                source: e,
            })?;

        let pid = child.id().map(|p| p as i32).unwrap_or(-1);
        let pid_path = self.pid_path(&spec.name);
        std::fs::write(&pid_path, format!("{pid}\n")).map_err(SupervisorError::io(&pid_path))?;
        self.children.insert(spec.name.clone(), child);

        info!(watcher = %spec.name, pid, "watcher started");
        Ok(StartOutcome::Started { pid })
    }

    /// Stop a watcher: SIGTERM, grace wait, SIGKILL, clear the PID file.
    pub async fn stop(&mut self, name: &str) -> Result<StopOutcome> {
        let pid = self
            .children
            .get(name)
            .and_then(|c| c.id())
            .map(|p| p as i32)
            .or_else(|| self.recorded_pid(name));

        let outcome = match pid {
            Some(pid) if pid_alive(pid) => {
                unsafe { libc::kill(pid, libc::SIGTERM) };
                debug!(watcher = name, pid, "sent SIGTERM");

                let deadline = Instant::now() + self.grace;
                while pid_alive(pid) && Instant::now() < deadline {
                    self.reap(name);
                    sleep(Duration::from_millis(100)).await;
                }

                if pid_alive(pid) {
                    warn!(watcher = name, pid, "grace period elapsed, sending SIGKILL");
                    unsafe { libc::kill(pid, libc::SIGKILL) };
                    StopOutcome::Killed
                } else {
                    StopOutcome::Stopped
                }
            }
            _ => StopOutcome::NotRunning,
        };

        // Reap an owned child so the kill is observed and nothing zombies
        if let Some(mut child) = self.children.remove(name) {
            let _ = child.wait().await;
        }

        let pid_path = self.pid_path(name);
        if pid_path.exists() {
            std::fs::remove_file(&pid_path).map_err(SupervisorError::io(&pid_path))?;
        }

        if outcome != StopOutcome::NotRunning {
            info!(watcher = name, ?outcome, "watcher stopped");
        }
        Ok(outcome)
    }

    /// Opportunistically reap an owned child without blocking.
    fn reap(&mut self, name: &str) {
        if let Some(child) = self.children.get_mut(name) {
            if matches!(child.try_wait(), Ok(Some(_)) | Err(_)) {
                self.children.remove(name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn spec(name: &str, script: &str) -> WatcherSpec {
        WatcherSpec {
            name: name.to_string(),
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
        }
    }

    fn supervisor(root: &Path, grace: Duration) -> ProcessSupervisor {
        ProcessSupervisor::new(root.join("run"), root.join("logs"), grace)
    }

    #[test]
    fn dead_pid_is_not_alive() {
        assert!(!pid_alive(0));
        assert!(!pid_alive(-1));
        // Far beyond any default pid_max
        assert!(!pid_alive(2_000_000_000));
    }

    #[tokio::test]
    async fn start_spawns_and_records_a_pid() {
        let dir = tempdir().unwrap();
        let mut sup = supervisor(dir.path(), Duration::from_secs(2));

        let outcome = sup.start(&spec("w", "sleep 30")).await.unwrap();
        let pid = match outcome {
            StartOutcome::Started { pid } => pid,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert!(pid_alive(pid));
        assert_eq!(sup.recorded_pid("w"), Some(pid));
        assert!(sup.is_alive("w"));

        sup.stop("w").await.unwrap();
    }

    #[tokio::test]
    async fn second_start_is_a_no_op() {
        let dir = tempdir().unwrap();
        let mut sup = supervisor(dir.path(), Duration::from_secs(2));

        let first = sup.start(&spec("w", "sleep 30")).await.unwrap();
        let second = sup.start(&spec("w", "sleep 30")).await.unwrap();
        match (first, second) {
            (StartOutcome::Started { pid }, StartOutcome::AlreadyRunning { pid: pid2 }) => {
                assert_eq!(pid, pid2);
            }
            other => panic!("unexpected outcomes: {other:?}"),
        }

        sup.stop("w").await.unwrap();
    }

    #[tokio::test]
    async fn stop_terminates_and_clears_the_pid_file() {
        let dir = tempdir().unwrap();
        let mut sup = supervisor(dir.path(), Duration::from_secs(2));

        let outcome = sup.start(&spec("w", "sleep 30")).await.unwrap();
        let pid = match outcome {
            StartOutcome::Started { pid } => pid,
            other => panic!("unexpected outcome: {other:?}"),
        };

        let stopped = sup.stop("w").await.unwrap();
        assert_eq!(stopped, StopOutcome::Stopped);
        assert!(!pid_alive(pid));
        assert!(!sup.pid_path("w").exists());
        assert!(!sup.is_alive("w"));
    }

    #[tokio::test]
    async fn stubborn_process_is_killed_after_grace() {
        let dir = tempdir().unwrap();
        let mut sup = supervisor(dir.path(), Duration::from_millis(300));

        sup.start(&spec("w", r#"trap "" TERM; sleep 30"#)).await.unwrap();
        // Give the shell a moment to install the trap
        sleep(Duration::from_millis(200)).await;

        let stopped = sup.stop("w").await.unwrap();
        assert_eq!(stopped, StopOutcome::Killed);
        assert!(!sup.is_alive("w"));
    }

    #[tokio::test]
    async fn stop_of_unknown_watcher_is_not_running() {
        let dir = tempdir().unwrap();
        let mut sup = supervisor(dir.path(), Duration::from_secs(1));
        assert_eq!(sup.stop("ghost").await.unwrap(), StopOutcome::NotRunning);
    }

    #[tokio::test]
    async fn exited_child_is_detected_and_restartable() {
        let dir = tempdir().unwrap();
        let mut sup = supervisor(dir.path(), Duration::from_secs(1));

        sup.start(&spec("w", "exit 0")).await.unwrap();
        sleep(Duration::from_millis(200)).await;

        assert!(!sup.is_alive("w"));
        let outcome = sup.start(&spec("w", "sleep 30")).await.unwrap();
        assert!(matches!(outcome, StartOutcome::Started { .. }));
        sup.stop("w").await.unwrap();
    }

    #[tokio::test]
    async fn watcher_output_lands_in_its_log_file() {
        let dir = tempdir().unwrap();
        let mut sup = supervisor(dir.path(), Duration::from_secs(1));

        sup.start(&spec("w", "echo hello-from-watcher")).await.unwrap();
        sleep(Duration::from_millis(300)).await;

        let log = std::fs::read_to_string(sup.log_path("w")).unwrap();
        assert!(log.contains("hello-from-watcher"));
        sup.stop("w").await.unwrap();
    }
}
