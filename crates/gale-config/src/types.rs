//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [upstream]               # archive endpoints + probe policy
//! [watch]                  # arrival directories + transform commands
//! [deliver]                # object-store sink + retry policy
//! [notify]                 # best-effort notification topic
//! [state]                  # state record location
//! [supervisor]             # watcher processes, lock, timers
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// Maps to the full TOML config file. All sections are optional so that
/// partial configs (e.g., project-local overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GaleConfig {
    /// Upstream archive configuration.
    pub upstream: Option<UpstreamConfig>,

    /// Arrival watcher configuration.
    pub watch: Option<WatchConfig>,

    /// Delivery gateway configuration.
    pub deliver: Option<DeliverConfig>,

    /// Notification sink configuration.
    pub notify: Option<NotifyConfig>,

    /// State record configuration.
    pub state: Option<StateConfig>,

    /// Supervisor configuration.
    pub supervisor: Option<SupervisorConfig>,

    /// Base directory for relative paths (defaults to the config dir).
    pub data_dir: Option<PathBuf>,
}

impl GaleConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: GaleConfig) {
        if other.upstream.is_some() {
            self.upstream = other.upstream;
        }
        if other.watch.is_some() {
            self.watch = other.watch;
        }
        if other.deliver.is_some() {
            self.deliver = other.deliver;
        }
        if other.notify.is_some() {
            self.notify = other.notify;
        }
        if other.state.is_some() {
            self.state = other.state;
        }
        if other.supervisor.is_some() {
            self.supervisor = other.supervisor;
        }
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
    }

    /// Resolve a possibly-relative path against the data directory.
    pub fn resolve(&self, data_dir: &Path, p: &Path) -> PathBuf {
        if p.is_relative() {
            data_dir.join(p)
        } else {
            p.to_path_buf()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Upstream
// ─────────────────────────────────────────────────────────────────────────────

/// Upstream archive endpoints and probe policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Product root serving the HTML index of date directories.
    pub base_url: String,

    /// Filtered-download (subsetting) endpoint.
    pub filter_url: String,

    /// Seconds between availability poll cycles.
    pub poll_interval_secs: u64,

    /// Seconds of an unchanged missing set before a "still waiting" notice.
    pub stall_notice_secs: u64,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Pressure-level profile: 13 or 37.
    pub levels: u16,

    /// Number of required forecast files per run (f000..).
    pub forecast_hours: u16,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nomads.ncep.noaa.gov/pub/data/nccf/com/gfs/prod".to_string(),
            filter_url: "https://nomads.ncep.noaa.gov/cgi-bin/filter_gdas_0p25.pl".to_string(),
            poll_interval_secs: 60,
            stall_notice_secs: 300,
            request_timeout_secs: 30,
            levels: 13,
            forecast_hours: 12,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Watch
// ─────────────────────────────────────────────────────────────────────────────

/// Arrival watcher directories and external transform commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Directory where raw subset artifacts arrive.
    pub arrival_dir: PathBuf,

    /// Directory the merge transform writes into.
    pub merged_dir: PathBuf,

    /// Directory pairs are staged into.
    pub pair_dir: PathBuf,

    /// Debounce window for filesystem events, in milliseconds.
    pub debounce_ms: u64,

    /// Merge transform executable (three raw files in, one merged file out).
    pub merge_command: String,

    /// Extra leading arguments for the merge transform.
    pub merge_args: Vec<String>,

    /// Pair converter executable (two merged files in, one output out).
    pub convert_command: String,

    /// Extra leading arguments for the pair converter.
    pub convert_args: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            arrival_dir: PathBuf::from("data/arrivals"),
            merged_dir: PathBuf::from("data/merged"),
            pair_dir: PathBuf::from("data/pairs"),
            debounce_ms: 500,
            merge_command: "gale-merge".to_string(),
            merge_args: Vec::new(),
            convert_command: "gale-zarr".to_string(),
            convert_args: Vec::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Deliver
// ─────────────────────────────────────────────────────────────────────────────

/// Object-store sink and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverConfig {
    /// Object store endpoint (objects are PUT under this URL).
    pub base_url: String,

    /// Destination bucket.
    pub bucket: String,

    /// Key prefix inside the bucket.
    pub prefix: String,

    /// Maximum upload attempts per artifact.
    pub max_attempts: u32,

    /// Fixed delay between attempts, in seconds.
    pub retry_delay_secs: u64,
}

impl Default for DeliverConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000".to_string(),
            bucket: "gale-artifacts".to_string(),
            prefix: "gdas".to_string(),
            max_attempts: 3,
            retry_delay_secs: 10,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Notify
// ─────────────────────────────────────────────────────────────────────────────

/// Best-effort notification sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Whether to post notifications at all.
    pub enabled: bool,

    /// Topic URL notifications are POSTed to.
    pub topic_url: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            topic_url: "https://ntfy.sh/gale".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

/// State record location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Path of the `KEY=VALUE` state file (relative to the data dir).
    pub file: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("state/last_run.env"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Supervisor
// ─────────────────────────────────────────────────────────────────────────────

/// Supervisor timers, lock, and the watcher process roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Seconds between watcher liveness checks.
    pub health_interval_secs: u64,

    /// Seconds between collection cycles.
    pub collect_interval_secs: u64,

    /// Grace period between SIGTERM and SIGKILL, in seconds.
    pub grace_secs: u64,

    /// Single-instance lock file (relative to the data dir).
    pub lock_file: PathBuf,

    /// Directory for watcher PID files (relative to the data dir).
    pub pid_dir: PathBuf,

    /// Directory for watcher log files (relative to the data dir).
    pub log_dir: PathBuf,

    /// Watcher processes to supervise.
    pub watchers: Vec<WatcherSpec>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            health_interval_secs: 60,
            collect_interval_secs: 1800,
            grace_secs: 10,
            lock_file: PathBuf::from("gale.lock"),
            pid_dir: PathBuf::from("run"),
            log_dir: PathBuf::from("logs"),
            watchers: vec![WatcherSpec {
                name: "arrivals".to_string(),
                command: "gale".to_string(),
                args: vec!["watch".to_string()],
            }],
        }
    }
}

/// One supervised watcher process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherSpec {
    /// Name used for the PID file and log file.
    pub name: String,

    /// Executable to spawn.
    pub command: String,

    /// Arguments passed verbatim (no shell involved).
    #[serde(default)]
    pub args: Vec<String>,
}
