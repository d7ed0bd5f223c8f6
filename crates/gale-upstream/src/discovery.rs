//! Run discovery: the newest run exposed by the archive.
//!
//! Date buckets are fixed-width `YYYYMMDD`, so descending lexicographic
//! order is descending chronological order, and the scan can stop at the
//! first date exposing a usable hour. Discovery is a pure query — errors
//! surface to the caller, who retries on its next tick.

use tracing::debug;

use gale_types::{RunId, ELIGIBLE_HOURS};

use crate::error::{Result, UpstreamError};
use crate::listing::{date_entries, hour_entries, IndexClient};

/// Find the newest run whose hour is one of the four synoptic hours.
pub async fn latest_eligible_run(client: &IndexClient) -> Result<RunId> {
    latest_run_matching(client, |hour| ELIGIBLE_HOURS.contains(&hour)).await
}

/// Best-effort variant: accept any hour the archive exposes.
pub async fn latest_run_any_hour(client: &IndexClient) -> Result<RunId> {
    latest_run_matching(client, |_| true).await
}

async fn latest_run_matching(
    client: &IndexClient,
    accept: impl Fn(u8) -> bool,
) -> Result<RunId> {
    let root = client.list("").await?;
    let mut dates = date_entries(&root);
    dates.sort_unstable();

    for date in dates.into_iter().rev() {
        let hrefs = client.list(&format!("gdas.{date}/")).await?;
        if let Some(run) = best_run_for_date(&date, &hrefs, &accept) {
            debug!(%run, "discovered latest run");
            return Ok(run);
        }
    }

    Err(UpstreamError::NoEligibleRun)
}

/// The newest acceptable run within one date bucket, if any.
fn best_run_for_date(
    date: &str,
    hrefs: &[String],
    accept: impl Fn(u8) -> bool,
) -> Option<RunId> {
    hour_entries(hrefs)
        .into_iter()
        .filter_map(|h| {
            let hour: u8 = h.parse().ok()?;
            accept(hour).then_some(hour)
        })
        .max()
        .and_then(|hour| RunId::from_parts(date, &format!("{hour:02}")).ok())
}

/// The archive URL of a run's artifact directory.
pub fn run_url(base_url: &str, run: &RunId) -> String {
    format!(
        "{}/gdas.{}/{}/atmos/",
        base_url.trim_end_matches('/'),
        run.date_str(),
        run.hour_str()
    )
}
