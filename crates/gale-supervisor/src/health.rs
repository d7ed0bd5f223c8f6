//! The supervisor's timer loops.
//!
//! Two independent cadences: a health check that restarts any dead
//! watcher, and a collection tick that triggers the upstream collection
//! stage regardless of watcher health. Restarting is the sole
//! self-healing mechanism — a restart is logged and that is all.

use std::future::Future;
use std::time::Duration;

use tokio::time::interval;
use tracing::{info, warn};

use gale_config::WatcherSpec;

use crate::error::Result;
use crate::process::{ProcessSupervisor, StartOutcome};

/// Timer cadences for [`run_supervisor`].
#[derive(Debug, Clone, Copy)]
pub struct SupervisorPolicy {
    /// Delay between watcher liveness checks.
    pub health_interval: Duration,
    /// Delay between collection cycles.
    pub collect_interval: Duration,
}

impl Default for SupervisorPolicy {
    fn default() -> Self {
        Self {
            health_interval: Duration::from_secs(60),
            collect_interval: Duration::from_secs(1800),
        }
    }
}

/// Run one health-check pass: start anything that is not alive.
pub async fn health_check(
    supervisor: &mut ProcessSupervisor,
    specs: &[WatcherSpec],
) -> Result<usize> {
    let mut restarted = 0;
    for spec in specs {
        if !supervisor.is_alive(&spec.name) {
            match supervisor.start(spec).await? {
                StartOutcome::Started { pid } => {
                    info!(watcher = %spec.name, pid, "watcher was down, restarted");
                    restarted += 1;
                }
                StartOutcome::AlreadyRunning { .. } => {}
            }
        }
    }
    Ok(restarted)
}

/// Drive the supervisor loops until the process is terminated.
///
/// Both intervals tick immediately on entry, so watchers start and the
/// first collection cycle runs right away. Collection failures are logged
/// and the cadence continues — the next tick naturally retries the same
/// not-yet-recorded run.
pub async fn run_supervisor<F, Fut, E>(
    mut supervisor: ProcessSupervisor,
    specs: Vec<WatcherSpec>,
    policy: SupervisorPolicy,
    mut collect: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<(), E>>,
    E: std::fmt::Display,
{
    let mut health_tick = interval(policy.health_interval);
    let mut collect_tick = interval(policy.collect_interval);

    loop {
        tokio::select! {
            _ = health_tick.tick() => {
                if let Err(e) = health_check(&mut supervisor, &specs).await {
                    warn!(error = %e, "health check failed");
                }
            }
            _ = collect_tick.tick() => {
                if let Err(e) = collect().await {
                    warn!(error = %e, "collection cycle failed; will retry next tick");
                }
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

    #[tokio::test]
    async fn health_check_starts_missing_watchers_once() {
        let dir = tempdir().unwrap();
        let mut sup = ProcessSupervisor::new(
            dir.path().join("run"),
            dir.path().join("logs"),
            Duration::from_secs(1),
        );
        let specs = vec![spec("a", "sleep 30"), spec("b", "sleep 30")];

        let restarted = health_check(&mut sup, &specs).await.unwrap();
        assert_eq!(restarted, 2);

        // Everything alive: the next pass does nothing
        let restarted = health_check(&mut sup, &specs).await.unwrap();
        assert_eq!(restarted, 0);

        sup.stop("a").await.unwrap();
        sup.stop("b").await.unwrap();
    }

    #[tokio::test]
    async fn health_check_revives_a_dead_watcher() {
        let dir = tempdir().unwrap();
        let mut sup = ProcessSupervisor::new(
            dir.path().join("run"),
            dir.path().join("logs"),
            Duration::from_secs(1),
        );
        let specs = vec![spec("w", "exit 0")];

        health_check(&mut sup, &specs).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let restarted = health_check(&mut sup, &specs).await.unwrap();
        assert_eq!(restarted, 1);
        sup.stop("w").await.unwrap();
    }
}
