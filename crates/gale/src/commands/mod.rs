//! CLI command handlers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use gale_config::GaleConfig;
use gale_supervisor::ProcessSupervisor;

pub mod collect;
pub mod restart;
pub mod start;
pub mod status;
pub mod stop;
pub mod watch;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged configuration.
    pub config: GaleConfig,
    /// Base directory for relative paths.
    pub data_dir: PathBuf,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Resolve a possibly-relative path against the data directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.config.resolve(&self.data_dir, path)
    }

    /// Build the process supervisor from the supervisor section.
    pub fn process_supervisor(&self) -> ProcessSupervisor {
        let sup = self.config.supervisor.clone().unwrap_or_default();
        ProcessSupervisor::new(
            self.resolve(&sup.pid_dir),
            self.resolve(&sup.log_dir),
            Duration::from_secs(sup.grace_secs),
        )
    }
}
