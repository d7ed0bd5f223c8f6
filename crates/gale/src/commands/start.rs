//! Start command - runs the supervisor in the foreground.

use anyhow::{Context as _, Result};
use clap::Args;

use gale_pipeline::CollectCycle;
use gale_supervisor::{run_supervisor, InstanceLock, SupervisorPolicy};

use super::Context;

/// Arguments for the start command.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Skip the collection timer (watchers and health checks only)
    #[arg(long)]
    pub no_collect: bool,
}

/// Run the start command.
///
/// Acquires the single-instance lock first; a second instance is refused
/// here with a non-zero exit before anything else is touched.
pub async fn run(args: StartArgs, ctx: &Context) -> Result<()> {
    let sup_cfg = ctx.config.supervisor.clone().unwrap_or_default();

    let lock_path = ctx.resolve(&sup_cfg.lock_file);
    let _lock = InstanceLock::acquire(&lock_path)
        .context("refusing to start a second supervisor instance")?;

    let supervisor = ctx.process_supervisor();
    let cycle = CollectCycle::from_config(&ctx.config, &ctx.data_dir)?;
    let policy = SupervisorPolicy {
        health_interval: std::time::Duration::from_secs(sup_cfg.health_interval_secs),
        collect_interval: std::time::Duration::from_secs(sup_cfg.collect_interval_secs),
    };

    if ctx.verbose {
        println!("Lock: {}", lock_path.display());
        println!(
            "Watchers: {}",
            sup_cfg
                .watchers
                .iter()
                .map(|w| w.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!(
            "Health every {}s, collection every {}s",
            sup_cfg.health_interval_secs, sup_cfg.collect_interval_secs
        );
    }

    println!("Gale supervisor running");
    println!("Press Ctrl+C to stop");

    let no_collect = args.no_collect;
    let cycle = &cycle;
    run_supervisor(supervisor, sup_cfg.watchers.clone(), policy, move || async move {
        if no_collect {
            return Ok(());
        }
        cycle.run_once().await.map(|_| ())
    })
    .await?;

    Ok(())
}
