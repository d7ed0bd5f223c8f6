//! One collection cycle.
//!
//! Control flow, in order: read the state record, discover the newest
//! eligible run, stop if it is already recorded, wait for the run's
//! required artifact set, fetch the subset triples into the arrival
//! directory, deliver everything the run produced, and only then rewrite
//! the state record. A delivery failure abandons the cycle with the
//! record untouched, so the next tick re-detects the same run and
//! retries the whole pass — every step before the record write is
//! idempotent.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use gale_config::GaleConfig;
use gale_deliver::{DeliveryGateway, EventKind, Notifier};
use gale_state::{StateRecord, StateStore};
use gale_types::{classify, ForecastOffset, RunId};
use gale_upstream::{
    latest_eligible_run, required_artifacts, run_url, wait_until_ready, Fetcher, FilterRequest,
    IndexClient, LevelProfile, ProbePolicy,
};

use crate::error::{CycleError, Result};

/// What one cycle pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The newest eligible run is already recorded; nothing to do.
    UpToDate { run: RunId },
    /// A run was processed end to end and recorded.
    Completed { run: RunId, delivered: usize },
}

/// The wired-up collection cycle.
#[derive(Debug)]
pub struct CollectCycle {
    index: IndexClient,
    fetcher: Fetcher,
    gateway: DeliveryGateway,
    notifier: Notifier,
    store: StateStore,
    filter_url: String,
    profile: LevelProfile,
    forecast_hours: u16,
    probe_policy: ProbePolicy,
    merged_dir: PathBuf,
}

impl CollectCycle {
    /// Build a cycle from configuration, resolving relative paths against
    /// `data_dir`.
    pub fn from_config(config: &GaleConfig, data_dir: &Path) -> Result<Self> {
        let upstream = config.upstream.clone().unwrap_or_default();
        let watch = config.watch.clone().unwrap_or_default();
        let deliver = config.deliver.clone().unwrap_or_default();
        let notify = config.notify.clone().unwrap_or_default();
        let state = config.state.clone().unwrap_or_default();

        let timeout = Duration::from_secs(upstream.request_timeout_secs);
        let profile = LevelProfile::from_levels(upstream.levels).ok_or_else(|| {
            CycleError::Config(format!(
                "unsupported level count {} (expected 13 or 37)",
                upstream.levels
            ))
        })?;
        if upstream.forecast_hours > 999 {
            return Err(CycleError::Config(format!(
                "forecast_hours {} exceeds the 3-digit code space",
                upstream.forecast_hours
            )));
        }

        Ok(Self {
            index: IndexClient::new(&upstream.base_url, timeout)
                .map_err(CycleError::Upstream)?,
            fetcher: Fetcher::new(config.resolve(data_dir, &watch.arrival_dir), timeout)
                .map_err(CycleError::Upstream)?,
            gateway: DeliveryGateway::new(&deliver, timeout).map_err(CycleError::Deliver)?,
            notifier: Notifier::new(&notify, timeout),
            store: StateStore::new(config.resolve(data_dir, &state.file)),
            filter_url: upstream.filter_url,
            profile,
            forecast_hours: upstream.forecast_hours,
            probe_policy: ProbePolicy {
                poll_interval: Duration::from_secs(upstream.poll_interval_secs),
                stall_notice: Duration::from_secs(upstream.stall_notice_secs),
            },
            merged_dir: config.resolve(data_dir, &watch.merged_dir),
        })
    }

    /// The state store this cycle reads and writes.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Run one full pass.
    pub async fn run_once(&self) -> Result<CycleOutcome> {
        let recorded = self.store.load()?;
        let run = latest_eligible_run(&self.index).await?;

        if let Some(ref record) = recorded {
            if run <= record.run_id {
                debug!(%run, recorded = %record.run_id, "no new run");
                return Ok(CycleOutcome::UpToDate { run });
            }
        }

        let url = run_url(self.index.base_url(), &run);
        info!(%run, %url, "new run detected");
        self.notifier
            .post(EventKind::NewRunDetected, &format!("run {run}\n{url}"))
            .await;

        let required = required_artifacts(&run, self.forecast_hours);
        wait_until_ready(&self.index, &run, &required, self.probe_policy).await?;
        self.notifier
            .post(EventKind::DataArrived, &format!("run {run} is complete upstream"))
            .await;

        let fetched = self.fetch_all(&run).await?;
        info!(%run, fetched = fetched.len(), "fetch stage finished");

        let deliverables = self.collect_deliverables(&run, fetched);
        match self.deliver_and_record(&run, &url, &deliverables).await {
            Ok(delivered) => {
                self.notifier
                    .post(
                        EventKind::DeliveryComplete,
                        &format!("run {run}: {delivered} artifact(s) delivered"),
                    )
                    .await;
                Ok(CycleOutcome::Completed { run, delivered })
            }
            Err(e) => {
                self.notifier
                    .post(EventKind::DeliveryFailed, &format!("run {run}: {e}"))
                    .await;
                Err(e)
            }
        }
    }

    /// Fetch the subset triple for every forecast step of the run.
    ///
    /// Already-present artifacts are skipped inside the fetcher, so a
    /// cycle retried after a crash downloads only what is missing.
    async fn fetch_all(&self, run: &RunId) -> Result<Vec<PathBuf>> {
        let mut landed = Vec::new();
        for hours in 0..self.forecast_hours {
            let forecast = ForecastOffset::new(hours)
                .expect("forecast_hours fits the 3-digit code space");
            for (kind, request) in
                FilterRequest::triple(&self.filter_url, *run, forecast, self.profile)
            {
                if let Some(path) = self.fetcher.fetch(&request, kind).await? {
                    landed.push(path);
                }
            }
        }
        Ok(landed)
    }

    /// Everything the run produced that should reach durable storage:
    /// the fetched raw triples plus any merged artifacts for this run.
    fn collect_deliverables(&self, run: &RunId, mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
        if let Ok(entries) = std::fs::read_dir(&self.merged_dir) {
            for entry in entries.filter_map(|e| e.ok()) {
                let path = entry.path();
                match classify(&path) {
                    Some(descriptor) if descriptor.run == *run => paths.push(path),
                    _ => {}
                }
            }
        }
        paths.sort();
        paths
    }

    /// Deliver every artifact, then — and only then — rewrite the state
    /// record. Any failure propagates before the store is touched.
    pub async fn deliver_and_record(
        &self,
        run: &RunId,
        url: &str,
        paths: &[PathBuf],
    ) -> Result<usize> {
        let mut record = StateRecord::new(*run, url);
        for path in paths {
            let location = self.gateway.deliver(path, run).await?;
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("artifact");
            record.push_artifact(name, location);
        }
        self.store.save(&record)?;
        info!(%run, delivered = paths.len(), "run recorded");
        Ok(paths.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gale_config::{DeliverConfig, GaleConfig, StateConfig, UpstreamConfig, WatchConfig};
    use tempfile::tempdir;

    fn config(data_dir: &Path, deliver_base: &str) -> GaleConfig {
        GaleConfig {
            upstream: Some(UpstreamConfig {
                request_timeout_secs: 1,
                ..Default::default()
            }),
            watch: Some(WatchConfig::default()),
            deliver: Some(DeliverConfig {
                base_url: deliver_base.to_string(),
                max_attempts: 2,
                retry_delay_secs: 0,
                ..Default::default()
            }),
            state: Some(StateConfig::default()),
            data_dir: Some(data_dir.to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn rejects_unknown_level_profiles() {
        let dir = tempdir().unwrap();
        let mut cfg = config(dir.path(), "http://127.0.0.1:1");
        cfg.upstream.as_mut().unwrap().levels = 20;
        let err = CollectCycle::from_config(&cfg, dir.path()).unwrap_err();
        assert!(matches!(err, CycleError::Config(_)));
    }

    #[tokio::test]
    async fn failed_delivery_leaves_the_state_record_untouched() {
        let dir = tempdir().unwrap();
        // Gateway pointed at a closed port: every delivery attempt fails
        let cfg = config(dir.path(), "http://127.0.0.1:1");
        let cycle = CollectCycle::from_config(&cfg, dir.path()).unwrap();

        // A previously recorded run
        let previous = StateRecord::new("2025010100".parse().unwrap(), "https://example/prev");
        cycle.store().save(&previous).unwrap();
        let before = std::fs::read(cycle.store().path()).unwrap();

        let artifact = dir.path().join("20250101_06_000_merged.nc");
        std::fs::write(&artifact, b"payload").unwrap();

        let run: RunId = "2025010106".parse().unwrap();
        let err = cycle
            .deliver_and_record(&run, "https://example/next", &[artifact])
            .await
            .unwrap_err();
        assert!(matches!(err, CycleError::Deliver(_)));

        let after = std::fs::read(cycle.store().path()).unwrap();
        assert_eq!(before, after, "state record must be byte-for-byte unchanged");
    }

    #[tokio::test]
    async fn empty_delivery_set_still_records_the_run() {
        let dir = tempdir().unwrap();
        let cfg = config(dir.path(), "http://127.0.0.1:1");
        let cycle = CollectCycle::from_config(&cfg, dir.path()).unwrap();

        let run: RunId = "2025010106".parse().unwrap();
        let delivered = cycle
            .deliver_and_record(&run, "https://example/run", &[])
            .await
            .unwrap();
        assert_eq!(delivered, 0);

        let record = cycle.store().load().unwrap().unwrap();
        assert_eq!(record.run_id, run);
        assert!(record.artifacts.is_empty());
    }
}
