//! The long-running arrival watcher.
//!
//! Ties together the classifier, the grouping registry, the pairing
//! engine, and the external transforms. Arrival detection is a debounced
//! `notify` change stream bridged into a tokio channel by a background
//! thread; each wakeup delivers a batch of changed paths. On startup the
//! watcher rescans the arrival and merged directories so its registries
//! are a pure function of on-disk state — no event log, no replay.
//!
//! Per-path failures (unrecognized names, failed transforms, staging I/O)
//! are logged and skipped; they never abort the loop. The next event for
//! the same group retries whatever is still missing, because every
//! promotion is gated on the transform output actually existing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use tokio::fs;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use gale_types::{classify, ArtifactDescriptor, ArtifactKind, GroupKey, PairKey};

use crate::error::{Result, WatchError};
use crate::pairing::PairingEngine;
use crate::registry::{GroupRegistry, Observation};
use crate::transform::Transforms;

/// Channel buffer size for bridged filesystem events.
const EVENT_BUFFER: usize = 256;

/// The directories one watcher instance operates over.
#[derive(Debug, Clone)]
pub struct WatcherPaths {
    /// Where raw subset artifacts arrive.
    pub arrival_dir: PathBuf,
}

/// Handle to the running bridge thread.
pub struct StreamHandle {
    handle: std::thread::JoinHandle<()>,
}

impl StreamHandle {
    /// Check if the bridge thread is still running.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// The arrival watcher: registries plus transforms plus the event loop.
pub struct ArrivalWatcher {
    arrival_dir: PathBuf,
    transforms: Transforms,
    debounce: Duration,
    registry: GroupRegistry,
    pairing: PairingEngine,
}

impl ArrivalWatcher {
    pub fn new(paths: WatcherPaths, transforms: Transforms, debounce: Duration) -> Self {
        Self {
            arrival_dir: paths.arrival_dir,
            transforms,
            debounce,
            registry: GroupRegistry::new(),
            pairing: PairingEngine::new(),
        }
    }

    /// The grouping registry (for status reporting and tests).
    pub fn registry(&self) -> &GroupRegistry {
        &self.registry
    }

    /// The pairing engine (for status reporting and tests).
    pub fn pairing(&self) -> &PairingEngine {
        &self.pairing
    }

    /// Run forever: rescan, then follow the change stream.
    pub async fn run(mut self) -> Result<()> {
        self.rescan().await?;
        let (mut rx, _handle) = self.start_stream()?;
        info!(dir = %self.arrival_dir.display(), "arrival watcher running");

        while let Some(path) = rx.recv().await {
            self.handle_path(&path).await;
        }
        info!("arrival watcher event stream closed");
        Ok(())
    }

    /// Rebuild both registries from what is on disk.
    ///
    /// Raw arrivals are replayed through the classifier in sorted order,
    /// then merged artifacts; together with the output-existence gates
    /// this reproduces the exact Partial/Complete/processed states the
    /// watcher had before a crash, without re-running any transform whose
    /// output survived.
    pub async fn rescan(&mut self) -> Result<()> {
        for dir in [
            self.arrival_dir.as_path(),
            self.transforms.merged_dir(),
            self.transforms.pair_dir(),
        ] {
            fs::create_dir_all(dir).await.map_err(WatchError::io(dir))?;
        }

        let arrivals = sorted_entries(&self.arrival_dir)?;
        let merged = sorted_entries(self.transforms.merged_dir())?;
        info!(
            arrivals = arrivals.len(),
            merged = merged.len(),
            "rescanning on-disk state"
        );

        for path in arrivals.iter().chain(merged.iter()) {
            self.handle_path(path).await;
        }
        Ok(())
    }

    /// Process one changed path. Never fails; problems are logged.
    pub async fn handle_path(&mut self, path: &Path) {
        let Some(descriptor) = classify(path) else {
            debug!(path = %path.display(), "ignoring unrecognized path");
            return;
        };

        match descriptor.kind {
            ArtifactKind::PressureA | ArtifactKind::PressureB | ArtifactKind::Surface => {
                self.on_raw(descriptor).await;
            }
            ArtifactKind::Merged => {
                self.on_merged(descriptor.group_key()).await;
            }
            ArtifactKind::Raw => {}
        }
    }

    async fn on_raw(&mut self, descriptor: ArtifactDescriptor) {
        match self.registry.observe(&descriptor) {
            Observation::ReadyToMerge => self.attempt_merge(descriptor.group_key()).await,
            Observation::AlreadyComplete => {
                debug!(group = %descriptor.group_key(), "arrival for completed group")
            }
            Observation::Partial { .. } | Observation::Ignored => {}
        }
    }

    /// Try to run the merge transform for a ready group.
    ///
    /// The output-existence gate makes this idempotent under duplicate
    /// events; a transform failure leaves the group un-promoted so the
    /// next event retries.
    async fn attempt_merge(&mut self, key: GroupKey) {
        if self.transforms.merged_path(&key).exists() {
            self.registry.mark_complete(&key);
            self.on_merged(key).await;
            return;
        }

        let input = |kind: ArtifactKind| {
            self.arrival_dir
                .join(key.artifact_name(kind).expect("required kinds carry tokens"))
        };
        let result = self
            .transforms
            .merge(
                &key,
                &input(ArtifactKind::PressureA),
                &input(ArtifactKind::PressureB),
                &input(ArtifactKind::Surface),
            )
            .await;

        match result {
            Ok(_) => {
                self.registry.mark_complete(&key);
                self.on_merged(key).await;
            }
            Err(e) => {
                warn!(group = %key, error = %e, "merge transform failed; group left for retry");
            }
        }
    }

    async fn on_merged(&mut self, key: GroupKey) {
        for pair in self.pairing.add_merged(key) {
            self.process_pair(pair).await;
        }
    }

    /// Stage a pair's members and run the converter.
    async fn process_pair(&mut self, pair: PairKey) {
        if self.transforms.pair_output_path(&pair).exists() {
            debug!(%pair, "pair output already on disk");
            self.pairing.mark_processed(pair);
            return;
        }

        let (earlier, later) = pair.members();
        let staged = match self.stage_pair(&earlier, &later).await {
            Ok(staged) => staged,
            Err(e) => {
                warn!(%pair, error = %e, "failed to stage pair; will retry");
                return;
            }
        };

        match self
            .transforms
            .convert_pair(&pair, &staged[&earlier], &staged[&later])
            .await
        {
            Ok(_) => {
                info!(%pair, "pair processed");
                self.pairing.mark_processed(pair);
            }
            Err(e) => {
                warn!(%pair, error = %e, "pair conversion failed; will retry");
            }
        }
    }

    /// Copy both merged members into the pairing directory.
    async fn stage_pair(
        &self,
        earlier: &GroupKey,
        later: &GroupKey,
    ) -> Result<HashMap<GroupKey, PathBuf>> {
        let pair_dir = self.transforms.pair_dir();
        fs::create_dir_all(pair_dir)
            .await
            .map_err(WatchError::io(pair_dir))?;

        let mut staged = HashMap::new();
        for key in [earlier, later] {
            let source = self.transforms.merged_path(key);
            let dest = pair_dir.join(key.merged_name());
            if !dest.exists() {
                fs::copy(&source, &dest)
                    .await
                    .map_err(WatchError::io(&source))?;
            }
            staged.insert(*key, dest);
        }
        Ok(staged)
    }

    /// Start the notify → tokio bridge over the watched directories.
    fn start_stream(&self) -> Result<(mpsc::Receiver<PathBuf>, StreamHandle)> {
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut debouncer = new_debouncer(self.debounce, notify_tx)
            .map_err(|e| WatchError::InitFailed(e.to_string()))?;

        for dir in [self.arrival_dir.as_path(), self.transforms.merged_dir()] {
            debouncer
                .watcher()
                .watch(dir, RecursiveMode::Recursive)
                .map_err(|e| WatchError::WatchFailed {
                    path: dir.to_path_buf(),
                    error: e.to_string(),
                })?;
            debug!("watching path: {}", dir.display());
        }

        let handle = std::thread::spawn(move || {
            // Keep the debouncer alive in this thread
            let _debouncer = debouncer;

            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(events) => {
                        for event in events {
                            if event_tx.blocking_send(event.path).is_err() {
                                warn!("event channel closed, stopping bridge");
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        warn!("file watcher error: {:?}", e);
                    }
                }
            }
            info!("file watcher bridge exiting");
        });

        Ok((event_rx, StreamHandle { handle }))
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(WatchError::io(dir))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();
    Ok(entries)
}
