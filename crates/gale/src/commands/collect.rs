//! Collect command - runs one collection cycle immediately.

use anyhow::Result;
use clap::Args;

use gale_pipeline::{CollectCycle, CycleOutcome};

use super::Context;

/// Arguments for the collect command.
#[derive(Args, Debug)]
pub struct CollectArgs {}

/// Run the collect command.
pub async fn run(_args: CollectArgs, ctx: &Context) -> Result<()> {
    let cycle = CollectCycle::from_config(&ctx.config, &ctx.data_dir)?;

    match cycle.run_once().await? {
        CycleOutcome::UpToDate { run } => {
            println!("up to date: run {run} already recorded");
        }
        CycleOutcome::Completed { run, delivered } => {
            println!("completed: run {run}, {delivered} artifact(s) delivered");
        }
    }

    Ok(())
}
