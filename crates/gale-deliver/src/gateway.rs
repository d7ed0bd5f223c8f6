//! The delivery gateway.
//!
//! Uploads a finished artifact to the object store with bounded retry and
//! a fixed delay between attempts. An artifact is either fully delivered
//! or not delivered at all — the store's PUT is atomic and idempotent,
//! keyed by the object path `bucket/prefix/date/hour/filename` — so a
//! retried upload simply overwrites with identical content.

use std::path::Path;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use gale_config::DeliverConfig;
use gale_types::RunId;

use crate::error::{DeliverError, Result};

/// Uploads artifacts to the configured object store.
#[derive(Debug, Clone)]
pub struct DeliveryGateway {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
    prefix: String,
    max_attempts: u32,
    retry_delay: Duration,
}

impl DeliveryGateway {
    pub fn new(config: &DeliverConfig, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            prefix: config.prefix.clone(),
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_secs(config.retry_delay_secs),
        })
    }

    /// The object key for an artifact of a run: `prefix/date/hour/name`.
    pub fn object_key(&self, run: &RunId, name: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.prefix,
            run.date_str(),
            run.hour_str(),
            name
        )
    }

    /// The object location recorded in the state file: `bucket/key`.
    pub fn object_location(&self, run: &RunId, name: &str) -> String {
        format!("{}/{}", self.bucket, self.object_key(run, name))
    }

    fn object_url(&self, run: &RunId, name: &str) -> String {
        format!("{}/{}", self.base_url, self.object_location(run, name))
    }

    /// Upload one local file, retrying up to the configured attempt count.
    ///
    /// Returns the object location on success, or
    /// [`DeliverError::DeliveryFailed`] with the attempt count once every
    /// attempt has been spent.
    pub async fn deliver(&self, source: &Path, run: &RunId) -> Result<String> {
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("artifact")
            .to_string();
        let url = self.object_url(run, &name);

        let body = tokio::fs::read(source)
            .await
            .map_err(|e| DeliverError::ReadSource {
                path: source.to_path_buf(),
                source: e,
            })?;

        let mut last_error = String::new();
        for attempt in 1..=self.max_attempts {
            match self.http.put(&url).body(body.clone()).send().await {
                Ok(response) if response.status().is_success() => {
                    info!(artifact = %name, location = %self.object_location(run, &name), "delivered");
                    return Ok(self.object_location(run, &name));
                }
                Ok(response) => {
                    last_error = format!("status {}", response.status());
                }
                Err(e) => {
                    last_error = e.to_string();
                }
            }
            warn!(
                artifact = %name,
                attempt,
                max_attempts = self.max_attempts,
                error = %last_error,
                "upload attempt failed"
            );
            if attempt < self.max_attempts {
                sleep(self.retry_delay).await;
            }
        }

        Err(DeliverError::DeliveryFailed {
            attempts: self.max_attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn gateway(max_attempts: u32) -> DeliveryGateway {
        let config = DeliverConfig {
            // Reserved port on loopback: every attempt is refused fast
            base_url: "http://127.0.0.1:1".to_string(),
            bucket: "wx".to_string(),
            prefix: "gdas".to_string(),
            max_attempts,
            retry_delay_secs: 0,
        };
        DeliveryGateway::new(&config, Duration::from_millis(500)).unwrap()
    }

    #[test]
    fn object_key_follows_the_sink_layout() {
        let run: RunId = "2025010106".parse().unwrap();
        let gw = gateway(1);
        assert_eq!(
            gw.object_key(&run, "20250101_06_000_merged.nc"),
            "gdas/20250101/06/20250101_06_000_merged.nc"
        );
        assert_eq!(
            gw.object_location(&run, "a.nc"),
            "wx/gdas/20250101/06/a.nc"
        );
    }

    #[tokio::test]
    async fn exhausted_attempts_report_the_count() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("20250101_06_000_merged.nc");
        let mut f = std::fs::File::create(&source).unwrap();
        f.write_all(b"payload").unwrap();

        let run: RunId = "2025010106".parse().unwrap();
        let err = gateway(2).deliver(&source, &run).await.unwrap_err();
        match err {
            DeliverError::DeliveryFailed { attempts, .. } => assert_eq!(attempts, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_source_fails_before_any_attempt() {
        let run: RunId = "2025010106".parse().unwrap();
        let err = gateway(1)
            .deliver(Path::new("/nonexistent/file.nc"), &run)
            .await
            .unwrap_err();
        assert!(matches!(err, DeliverError::ReadSource { .. }));
    }
}
