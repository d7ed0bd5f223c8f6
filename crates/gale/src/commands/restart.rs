//! Restart command - stops and restarts the supervised watchers.

use anyhow::Result;
use clap::Args;
use console::Style;

use gale_supervisor::StartOutcome;

use super::Context;

/// Arguments for the restart command.
#[derive(Args, Debug)]
pub struct RestartArgs {}

/// Run the restart command.
pub async fn run(_args: RestartArgs, ctx: &Context) -> Result<()> {
    let sup_cfg = ctx.config.supervisor.clone().unwrap_or_default();
    let mut supervisor = ctx.process_supervisor();

    let green = Style::new().green();

    for spec in &sup_cfg.watchers {
        supervisor.stop(&spec.name).await?;
        match supervisor.start(spec).await? {
            StartOutcome::Started { pid } => {
                println!("{} {} (pid {})", green.apply_to("restarted"), spec.name, pid);
            }
            StartOutcome::AlreadyRunning { pid } => {
                println!("already running: {} (pid {})", spec.name, pid);
            }
        }
    }

    Ok(())
}
