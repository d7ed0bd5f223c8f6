//! Download subset artifacts into the arrival directory.
//!
//! Fetches are idempotent: an artifact whose arrival filename already
//! exists is skipped, so re-running a cycle after a crash re-downloads
//! only what is actually absent. Downloads land in a `.part` file first
//! and are renamed into place, so the arrival watcher never classifies a
//! half-written file under its final name.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::StatusCode;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use gale_types::{ArtifactKind, GroupKey};

use crate::error::{Result, UpstreamError};
use crate::filter::FilterRequest;

/// Downloads filtered artifacts into the arrival directory.
#[derive(Debug, Clone)]
pub struct Fetcher {
    http: reqwest::Client,
    arrival_dir: PathBuf,
}

impl Fetcher {
    pub fn new(arrival_dir: impl Into<PathBuf>, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            http,
            arrival_dir: arrival_dir.into(),
        })
    }

    pub fn arrival_dir(&self) -> &Path {
        &self.arrival_dir
    }

    /// Fetch one filtered artifact.
    ///
    /// Returns the landed path, or `None` when the artifact already
    /// existed and no request was made.
    pub async fn fetch(
        &self,
        request: &FilterRequest,
        kind: ArtifactKind,
    ) -> Result<Option<PathBuf>> {
        let key = GroupKey::new(*request.run(), request.forecast());
        let name = key
            .artifact_name(kind)
            .expect("fetched kinds carry a filename token");
        let dest = self.arrival_dir.join(&name);

        if dest.exists() {
            debug!(path = %dest.display(), "artifact already present, skipping fetch");
            return Ok(None);
        }

        let io = |path: &Path| {
            let path = path.to_path_buf();
            move |e| UpstreamError::Io { path, source: e }
        };

        fs::create_dir_all(&self.arrival_dir)
            .await
            .map_err(io(&self.arrival_dir))?;

        let url = request.url();
        let mut response = self.http.get(&url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(UpstreamError::Status {
                url,
                status: response.status(),
            });
        }

        let part = dest.with_extension("part");
        let mut file = fs::File::create(&part).await.map_err(io(&part))?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await.map_err(io(&part))?;
        }
        file.flush().await.map_err(io(&part))?;
        drop(file);

        fs::rename(&part, &dest).await.map_err(io(&dest))?;
        info!(artifact = %name, "fetched");
        Ok(Some(dest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::LevelProfile;
    use gale_types::{ForecastOffset, RunId};
    use tempfile::tempdir;

    #[tokio::test]
    async fn skips_existing_artifacts_without_a_request() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("20250101_06_000_pgrba.grib2"), b"present").unwrap();

        let fetcher = Fetcher::new(dir.path(), Duration::from_secs(5)).unwrap();
        let run: RunId = "2025010106".parse().unwrap();
        let request = FilterRequest::pressure_a(
            // Unroutable endpoint: the test fails if a request is attempted
            "http://192.0.2.1/filter.pl",
            run,
            ForecastOffset::new(0).unwrap(),
            LevelProfile::L13,
        );

        let landed = fetcher.fetch(&request, ArtifactKind::PressureA).await.unwrap();
        assert!(landed.is_none());
    }
}
