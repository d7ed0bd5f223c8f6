//! Watch command - runs the arrival watcher loop in the foreground.
//!
//! This is the process the supervisor spawns for the watcher role; it can
//! equally be run by hand for a one-off session.

use std::time::Duration;

use anyhow::Result;
use clap::Args;

use gale_watch::{ArrivalWatcher, CommandSpec, Transforms, WatcherPaths};

use super::Context;

/// Arguments for the watch command.
#[derive(Args, Debug)]
pub struct WatchArgs {}

/// Run the watch command.
pub async fn run(_args: WatchArgs, ctx: &Context) -> Result<()> {
    let watch_cfg = ctx.config.watch.clone().unwrap_or_default();

    let transforms = Transforms::new(
        CommandSpec::new(&watch_cfg.merge_command).args(watch_cfg.merge_args.clone()),
        CommandSpec::new(&watch_cfg.convert_command).args(watch_cfg.convert_args.clone()),
        ctx.resolve(&watch_cfg.merged_dir),
        ctx.resolve(&watch_cfg.pair_dir),
    );
    let paths = WatcherPaths {
        arrival_dir: ctx.resolve(&watch_cfg.arrival_dir),
    };

    if ctx.verbose {
        println!("Arrival dir: {}", paths.arrival_dir.display());
        println!("Merge command: {}", watch_cfg.merge_command);
        println!("Convert command: {}", watch_cfg.convert_command);
    }

    let watcher = ArrivalWatcher::new(
        paths,
        transforms,
        Duration::from_millis(watch_cfg.debounce_ms),
    );
    watcher.run().await?;

    Ok(())
}
