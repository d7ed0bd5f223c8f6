//! Gale - arrival-driven ingest orchestrator for GDAS model output.
//!
//! Main entry point for the Gale CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{collect, restart, start, status, stop, watch};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Gale - arrival-driven ingest orchestrator for GDAS model output
#[derive(Parser)]
#[command(name = "gale")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file (overrides default discovery)
    #[arg(long, global = true, env = "GALE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the supervisor: watchers, health checks, collection timer
    Start(start::StartArgs),

    /// Stop the supervised watcher processes
    Stop(stop::StopArgs),

    /// Restart the supervised watcher processes
    Restart(restart::RestartArgs),

    /// Show lock, watcher, and state-record status
    Status(status::StatusArgs),

    /// Run one collection cycle now
    Collect(collect::CollectArgs),

    /// Run the arrival watcher loop in the foreground
    Watch(watch::WatchArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing — console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "gale=debug,gale_upstream=debug,gale_watch=debug,gale_deliver=debug,\
         gale_supervisor=debug,gale_pipeline=debug,gale_state=debug,info"
    } else {
        "gale=info,gale_upstream=info,gale_watch=info,gale_deliver=info,\
         gale_supervisor=info,gale_pipeline=info,gale_state=info,warn"
    };

    let log_dir = gale_config::config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "gale.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "gale=trace,gale_upstream=trace,gale_watch=trace,gale_deliver=trace,\
                     gale_supervisor=trace,gale_pipeline=trace,gale_state=trace,info",
                )),
        )
        .init();

    // ── Load configuration ──────────────────────────────────────────────

    let loaded = if let Some(ref config_path) = cli.config {
        let config = gale_config::load_config_file(config_path)?;
        gale_config::LoadedConfig {
            config,
            sources: vec![gale_config::ConfigSource {
                path: config_path.clone(),
                loaded: true,
            }],
            warnings: Vec::new(),
        }
    } else {
        gale_config::load_config(None)?
    };

    for warning in &loaded.warnings {
        eprintln!("warning: {}", warning);
    }

    if cli.verbose {
        let sources = loaded.loaded_from();
        if sources.is_empty() {
            println!("No config files found, using defaults");
        } else {
            for source in sources {
                println!("Loaded config: {}", source.display());
            }
        }
    }

    let ctx = commands::Context {
        data_dir: loaded.data_dir(),
        config: loaded.config,
        verbose: cli.verbose,
    };

    // Dispatch to command handlers
    match cli.command {
        Commands::Start(args) => start::run(args, &ctx).await,
        Commands::Stop(args) => stop::run(args, &ctx).await,
        Commands::Restart(args) => restart::run(args, &ctx).await,
        Commands::Status(args) => status::run(args, &ctx).await,
        Commands::Collect(args) => collect::run(args, &ctx).await,
        Commands::Watch(args) => watch::run(args, &ctx).await,
    }
}
