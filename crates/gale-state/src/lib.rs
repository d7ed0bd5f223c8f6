//! Durable record of the last fully processed run.
//!
//! The record is a newline-delimited `KEY=VALUE` file holding the run id,
//! the run's upstream URL, the delivered artifact locations, and an update
//! stamp. It is read once at the start of each collection cycle and
//! rewritten wholesale — via a temporary file and an atomic rename — only
//! after every derived artifact for a run has been delivered. A reader can
//! therefore never observe a half-written record, and a crashed cycle
//! leaves the previous record byte-for-byte intact.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;
use tracing::debug;

use gale_types::RunId;

/// Result type for state-store operations.
pub type Result<T> = std::result::Result<T, StateError>;

/// Errors from reading or writing the state record.
#[derive(Debug, Error)]
pub enum StateError {
    /// Filesystem failure reading or writing the record.
    #[error("state file I/O at '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A line was not `KEY=VALUE`.
    #[error("malformed state line: '{0}'")]
    MalformedLine(String),

    /// A required key was absent.
    #[error("state record missing required key '{0}'")]
    MissingKey(&'static str),

    /// A value failed to parse.
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// One delivered artifact: its local name and where it was put.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredArtifact {
    pub name: String,
    pub location: String,
}

/// The authoritative "last fully completed run" pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateRecord {
    pub run_id: RunId,
    pub run_url: String,
    pub artifacts: Vec<DeliveredArtifact>,
    pub updated_at: DateTime<Utc>,
}

impl StateRecord {
    /// Create a record stamped with the current time.
    pub fn new(run_id: RunId, run_url: impl Into<String>) -> Self {
        Self {
            run_id,
            run_url: run_url.into(),
            artifacts: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Append a delivered artifact entry.
    pub fn push_artifact(&mut self, name: impl Into<String>, location: impl Into<String>) {
        self.artifacts.push(DeliveredArtifact {
            name: name.into(),
            location: location.into(),
        });
    }

    /// Serialize to the `KEY=VALUE` wire form.
    pub fn to_env(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("RUN_ID={}\n", self.run_id));
        out.push_str(&format!("RUN_URL={}\n", self.run_url));
        out.push_str(&format!(
            "UPDATED_AT={}\n",
            self.updated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
        for (i, artifact) in self.artifacts.iter().enumerate() {
            out.push_str(&format!(
                "ARTIFACT_{}={} {}\n",
                i + 1,
                artifact.name,
                artifact.location
            ));
        }
        out
    }

    /// Parse the `KEY=VALUE` wire form.
    pub fn from_env(contents: &str) -> Result<Self> {
        let mut run_id = None;
        let mut run_url = None;
        let mut updated_at = None;
        let mut artifacts = Vec::new();

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| StateError::MalformedLine(line.to_string()))?;
            match key {
                "RUN_ID" => {
                    run_id = Some(value.parse::<RunId>().map_err(|e| {
                        StateError::InvalidValue {
                            key: "RUN_ID",
                            reason: e.to_string(),
                        }
                    })?);
                }
                "RUN_URL" => run_url = Some(value.to_string()),
                "UPDATED_AT" => {
                    updated_at = Some(
                        DateTime::parse_from_rfc3339(value)
                            .map_err(|e| StateError::InvalidValue {
                                key: "UPDATED_AT",
                                reason: e.to_string(),
                            })?
                            .with_timezone(&Utc),
                    );
                }
                k if k.starts_with("ARTIFACT_") => {
                    let (name, location) = value
                        .split_once(' ')
                        .ok_or_else(|| StateError::MalformedLine(line.to_string()))?;
                    artifacts.push(DeliveredArtifact {
                        name: name.to_string(),
                        location: location.to_string(),
                    });
                }
                // Unknown keys are preserved-by-ignore: the file is
                // rewritten wholesale each cycle anyway.
                _ => {}
            }
        }

        Ok(Self {
            run_id: run_id.ok_or(StateError::MissingKey("RUN_ID"))?,
            run_url: run_url.ok_or(StateError::MissingKey("RUN_URL"))?,
            updated_at: updated_at.ok_or(StateError::MissingKey("UPDATED_AT"))?,
            artifacts,
        })
    }
}

/// Reads and atomically rewrites the state record file.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record, or `None` when no run has completed yet.
    pub fn load(&self) -> Result<Option<StateRecord>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StateError::Io {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };
        StateRecord::from_env(&contents).map(Some)
    }

    /// Replace the record via write-to-temp-then-rename.
    ///
    /// The temporary file lives in the same directory as the target so the
    /// rename stays within one filesystem.
    pub fn save(&self, record: &StateRecord) -> Result<()> {
        let io = |e| StateError::Io {
            path: self.path.clone(),
            source: e,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, record.to_env()).map_err(io)?;
        fs::rename(&tmp, &self.path).map_err(io)?;
        debug!(run = %record.run_id, path = %self.path.display(), "state record written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record() -> StateRecord {
        let mut r = StateRecord::new("2025010106".parse().unwrap(), "https://example/run");
        r.push_artifact("20250101_06_000_merged.nc", "bucket/gdas/20250101/06/a.nc");
        r.push_artifact("20250101_06_001_merged.nc", "bucket/gdas/20250101/06/b.nc");
        r
    }

    #[test]
    fn round_trips_through_env_form() {
        let r = record();
        let parsed = StateRecord::from_env(&r.to_env()).unwrap();
        assert_eq!(parsed.run_id, r.run_id);
        assert_eq!(parsed.run_url, r.run_url);
        assert_eq!(parsed.artifacts, r.artifacts);
    }

    #[test]
    fn env_form_has_expected_keys() {
        let text = record().to_env();
        assert!(text.starts_with("RUN_ID=2025010106\n"));
        assert!(text.contains("RUN_URL=https://example/run\n"));
        assert!(text.contains("UPDATED_AT="));
        assert!(text.contains("ARTIFACT_1=20250101_06_000_merged.nc "));
        assert!(text.contains("ARTIFACT_2="));
    }

    #[test]
    fn missing_required_key_is_an_error() {
        let err = StateRecord::from_env("RUN_URL=x\nUPDATED_AT=2025-01-01T00:00:00Z\n").unwrap_err();
        assert!(matches!(err, StateError::MissingKey("RUN_ID")));
    }

    #[test]
    fn malformed_line_is_an_error() {
        assert!(StateRecord::from_env("RUN_ID 2025010106").is_err());
    }

    #[test]
    fn load_absent_file_is_none() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state/last_run.env"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state/last_run.env"));
        let r = record();
        store.save(&r).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.run_id, r.run_id);
        assert_eq!(loaded.artifacts.len(), 2);
    }

    #[test]
    fn save_replaces_wholesale_and_leaves_no_temp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("last_run.env");
        let store = StateStore::new(&path);

        store.save(&record()).unwrap();
        let mut next = StateRecord::new("2025010112".parse().unwrap(), "https://example/next");
        next.push_artifact("only.nc", "bucket/gdas/20250101/12/only.nc");
        store.save(&next).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("RUN_ID=2025010112"));
        assert!(!text.contains("ARTIFACT_2="));
        assert!(!path.with_extension("tmp").exists());
    }
}
