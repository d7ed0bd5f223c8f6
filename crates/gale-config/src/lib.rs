//! Configuration system for the Gale ingest orchestrator.
//!
//! TOML-based configuration with:
//! - One section per subsystem (`[upstream]`, `[watch]`, `[deliver]`,
//!   `[notify]`, `[state]`, `[supervisor]`)
//! - Config file layering (user config dir + project-local overrides)
//! - A `GALE_CONFIG_DIR` override for tests and multi-instance setups
//!
//! All sections are optional in the file; every section has working
//! defaults so a bare `gale.toml` naming only the delivery bucket is a
//! valid deployment.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    config_dir, config_path, load_config, load_config_file, load_config_with_options,
    ConfigSource, LoadedConfig,
};
pub use error::{ConfigError, Result};
pub use types::*;
