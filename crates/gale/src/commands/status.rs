//! Status command - reports lock, watcher, and state-record status.

use anyhow::Result;
use clap::Args;
use console::Style;

use gale_state::StateStore;
use gale_supervisor::{pid_alive, InstanceLock};

use super::Context;

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {}

/// Run the status command.
pub async fn run(_args: StatusArgs, ctx: &Context) -> Result<()> {
    let sup_cfg = ctx.config.supervisor.clone().unwrap_or_default();
    let state_cfg = ctx.config.state.clone().unwrap_or_default();
    let mut supervisor = ctx.process_supervisor();

    let dim = Style::new().dim();
    let green = Style::new().green();
    let red = Style::new().red();

    // ── Supervisor lock ─────────────────────────────────────────────────

    let lock_path = ctx.resolve(&sup_cfg.lock_file);
    match InstanceLock::owner_of(&lock_path) {
        Some(pid) if pid_alive(pid) => {
            println!("supervisor: {} (pid {})", green.apply_to("running"), pid);
        }
        Some(pid) => {
            println!(
                "supervisor: {} {}",
                red.apply_to("not running"),
                dim.apply_to(format!("(stale lock, pid {pid})"))
            );
        }
        None => {
            println!("supervisor: {}", dim.apply_to("not running"));
        }
    }

    // ── Watchers ────────────────────────────────────────────────────────

    for spec in &sup_cfg.watchers {
        let pid = supervisor.recorded_pid(&spec.name);
        if supervisor.is_alive(&spec.name) {
            println!(
                "watcher {}: {} (pid {})",
                spec.name,
                green.apply_to("running"),
                pid.unwrap_or(-1)
            );
        } else {
            println!("watcher {}: {}", spec.name, red.apply_to("not running"));
        }
    }

    // ── State record ────────────────────────────────────────────────────

    let store = StateStore::new(ctx.resolve(&state_cfg.file));
    match store.load() {
        Ok(Some(record)) => {
            println!(
                "last run: {} ({} artifact(s), updated {})",
                record.run_id,
                record.artifacts.len(),
                record.updated_at.format("%Y-%m-%d %H:%M:%SZ")
            );
            if ctx.verbose {
                println!("  {}", dim.apply_to(&record.run_url));
                for artifact in &record.artifacts {
                    println!("  {} -> {}", artifact.name, artifact.location);
                }
            }
        }
        Ok(None) => {
            println!("last run: {}", dim.apply_to("none recorded"));
        }
        Err(e) => {
            println!("last run: {} ({e})", red.apply_to("unreadable"));
        }
    }

    Ok(())
}
