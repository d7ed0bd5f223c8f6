//! Typed invocation of the external transform tools.
//!
//! The merge and convert tools are black boxes: paths in, a path out,
//! success or failure. They are invoked directly with a typed argument
//! list — no shell, no string re-parsing — and both invocations are gated
//! on the output path not already existing, which is what makes the
//! pipeline idempotent under duplicate events and crash replays.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use gale_types::{GroupKey, PairKey};

/// Errors from running an external transform.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The program could not be spawned at all.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// The program ran and exited non-zero.
    #[error("'{program}' exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// A command and its argument list, built up value by value.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.display().to_string())
    }

    /// Run to completion, capturing stderr for the failure report.
    pub async fn run(&self) -> std::result::Result<(), TransformError> {
        debug!(program = %self.program, args = ?self.args, "running transform");
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| TransformError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(TransformError::Failed {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// The configured merge and pair-convert transforms.
#[derive(Debug, Clone)]
pub struct Transforms {
    merge: CommandSpec,
    convert: CommandSpec,
    merged_dir: PathBuf,
    pair_dir: PathBuf,
}

impl Transforms {
    pub fn new(
        merge: CommandSpec,
        convert: CommandSpec,
        merged_dir: impl Into<PathBuf>,
        pair_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            merge,
            convert,
            merged_dir: merged_dir.into(),
            pair_dir: pair_dir.into(),
        }
    }

    pub fn merged_dir(&self) -> &Path {
        &self.merged_dir
    }

    pub fn pair_dir(&self) -> &Path {
        &self.pair_dir
    }

    /// The merge output path for a group.
    pub fn merged_path(&self, key: &GroupKey) -> PathBuf {
        self.merged_dir.join(key.merged_name())
    }

    /// The converter output path for a pair (keyed by the earlier member).
    pub fn pair_output_path(&self, pair: &PairKey) -> PathBuf {
        let (earlier, _) = pair.members();
        self.pair_dir.join(earlier.pair_output_name())
    }

    /// Merge one group's raw triple into its merged artifact.
    ///
    /// Returns `false` without invoking anything when the output already
    /// exists. The argument order is fixed: pressure A, pressure B,
    /// surface, output.
    pub async fn merge(
        &self,
        key: &GroupKey,
        pressure_a: &Path,
        pressure_b: &Path,
        surface: &Path,
    ) -> std::result::Result<bool, TransformError> {
        let output = self.merged_path(key);
        if output.exists() {
            debug!(group = %key, "merged output already present, skipping transform");
            return Ok(false);
        }

        self.merge
            .clone()
            .path_arg(pressure_a)
            .path_arg(pressure_b)
            .path_arg(surface)
            .path_arg(&output)
            .run()
            .await?;
        info!(group = %key, output = %output.display(), "merge transform completed");
        Ok(true)
    }

    /// Convert a staged pair into its output artifact.
    ///
    /// Same gate as [`merge`](Self::merge): an existing output means the
    /// pair was already converted.
    pub async fn convert_pair(
        &self,
        pair: &PairKey,
        earlier: &Path,
        later: &Path,
    ) -> std::result::Result<bool, TransformError> {
        let output = self.pair_output_path(pair);
        if output.exists() {
            debug!(%pair, "pair output already present, skipping transform");
            return Ok(false);
        }

        self.convert
            .clone()
            .path_arg(earlier)
            .path_arg(later)
            .path_arg(&output)
            .run()
            .await?;
        info!(%pair, output = %output.display(), "pair conversion completed");
        Ok(true)
    }
}
