//! Stop command - stops the supervised watcher processes.

use anyhow::Result;
use clap::Args;
use console::Style;

use gale_supervisor::StopOutcome;

use super::Context;

/// Arguments for the stop command.
#[derive(Args, Debug)]
pub struct StopArgs {}

/// Run the stop command.
pub async fn run(_args: StopArgs, ctx: &Context) -> Result<()> {
    let sup_cfg = ctx.config.supervisor.clone().unwrap_or_default();
    let mut supervisor = ctx.process_supervisor();

    let dim = Style::new().dim();
    let green = Style::new().green();
    let yellow = Style::new().yellow();

    for spec in &sup_cfg.watchers {
        match supervisor.stop(&spec.name).await? {
            StopOutcome::Stopped => {
                println!("{} {}", green.apply_to("stopped"), spec.name);
            }
            StopOutcome::Killed => {
                println!(
                    "{} {} {}",
                    yellow.apply_to("killed"),
                    spec.name,
                    dim.apply_to("(ignored the termination signal)")
                );
            }
            StopOutcome::NotRunning => {
                println!("{} {}", dim.apply_to("not running"), spec.name);
            }
        }
    }

    Ok(())
}
