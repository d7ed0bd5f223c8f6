//! Availability probing for a run's required artifact set.
//!
//! One status-only request per required artifact, no content download.
//! The whole set is re-checked every cycle — partial results are never
//! cached, since upstream files can disappear or rotate between polls.

use std::time::Duration;

use reqwest::StatusCode;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use gale_types::{ForecastOffset, RunId};

use crate::discovery::run_url;
use crate::error::Result;
use crate::listing::IndexClient;

/// Outcome of one probe pass over the required set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    /// Artifacts still missing, in required-set order.
    pub missing: Vec<String>,
}

impl ProbeReport {
    /// Ready iff nothing is missing.
    pub fn ready(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Polling policy for [`wait_until_ready`].
#[derive(Debug, Clone, Copy)]
pub struct ProbePolicy {
    /// Delay between poll cycles.
    pub poll_interval: Duration,
    /// How long an unchanged missing set stays quiet before a reminder.
    pub stall_notice: Duration,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            stall_notice: Duration::from_secs(300),
        }
    }
}

/// The filenames a run must expose before processing starts.
pub fn required_artifacts(run: &RunId, forecast_hours: u16) -> Vec<String> {
    (0..forecast_hours)
        .map(|h| {
            let fc = ForecastOffset::new(h).expect("forecast_hours fits the 3-digit code space");
            format!("gdas.t{}z.pgrb2.0p25.{}", run.hour_str(), fc.fcode())
        })
        .collect()
}

/// Probe every required artifact once and report the missing subset.
///
/// Success is exactly HTTP 200; any other status (or a transport error on
/// one artifact) counts that artifact as missing for this pass.
pub async fn probe_run(
    client: &IndexClient,
    run: &RunId,
    required: &[String],
) -> Result<ProbeReport> {
    let base = run_url(client.base_url(), run);
    let mut missing = Vec::new();

    for name in required {
        let url = format!("{base}{name}");
        match client.http().head(&url).send().await {
            Ok(response) if response.status() == StatusCode::OK => {}
            Ok(response) => {
                missing.push(name.clone());
                tracing::debug!(%url, status = %response.status(), "artifact not available");
            }
            Err(e) => {
                missing.push(name.clone());
                warn!(%url, error = %e, "probe request failed");
            }
        }
    }

    Ok(ProbeReport { missing })
}

/// Poll until every required artifact answers 200.
///
/// Retries without bound — not-yet-available is the expected steady state.
/// A log line is emitted only when the missing subset changes or when the
/// stall timer elapses, so a slow upstream does not flood the log.
pub async fn wait_until_ready(
    client: &IndexClient,
    run: &RunId,
    required: &[String],
    policy: ProbePolicy,
) -> Result<()> {
    let mut last_missing: Option<Vec<String>> = None;
    let mut last_notice = Instant::now();

    loop {
        let report = probe_run(client, run, required).await?;
        if report.ready() {
            info!(%run, "all required artifacts available");
            return Ok(());
        }

        let changed = last_missing.as_ref() != Some(&report.missing);
        if changed || last_notice.elapsed() >= policy.stall_notice {
            info!(
                %run,
                missing = report.missing.len(),
                first = %report.missing[0],
                "still waiting for upstream artifacts"
            );
            last_notice = Instant::now();
        }
        last_missing = Some(report.missing);

        sleep(policy.poll_interval).await;
    }
}
