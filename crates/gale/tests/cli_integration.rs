//! CLI integration tests for the Gale command-line interface.
//!
//! These tests verify:
//! - Help text is displayed correctly
//! - The five control verbs plus `watch` parse
//! - Unrecognized verbs are rejected non-zero with usage text
//!
//! Note: these tests do not touch the network — they exercise CLI
//! parsing, help output, and the offline `status`/`stop` paths only.

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a command for the gale binary.
fn gale() -> Command {
    Command::cargo_bin("gale").unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    gale()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Gale"))
        .stdout(predicate::str::contains("ingest orchestrator"));
}

#[test]
fn test_version_displays() {
    gale()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gale"));
}

#[test]
fn test_help_lists_subcommands() {
    gale()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("stop"))
        .stdout(predicate::str::contains("restart"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("collect"))
        .stdout(predicate::str::contains("watch"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Verb Rejection
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_unrecognized_verb_fails_with_usage() {
    gale()
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_no_verb_fails_with_usage() {
    gale()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Global Flag Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_verbose_flag_accepted() {
    gale().args(["--verbose", "--help"]).assert().success();
}

#[test]
fn test_config_flag_accepted() {
    gale()
        .args(["--config", "/tmp/gale.toml", "--help"])
        .assert()
        .success();
}

// ─────────────────────────────────────────────────────────────────────────────
// Subcommand Help Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_start_help() {
    gale()
        .args(["start", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("supervisor"));
}

#[test]
fn test_collect_help() {
    gale()
        .args(["collect", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("collection cycle"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Offline Command Paths
// ─────────────────────────────────────────────────────────────────────────────

/// `status` against an empty data dir reports nothing running and exits 0.
#[test]
fn test_status_with_empty_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("gale.toml");
    std::fs::write(
        &config,
        format!("data_dir = \"{}\"\n", dir.path().display()),
    )
    .unwrap();

    gale()
        .args(["--config"])
        .arg(&config)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("supervisor"))
        .stdout(predicate::str::contains("none recorded"));
}

/// `stop` with nothing running reports each watcher as not running.
#[test]
fn test_stop_with_nothing_running() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("gale.toml");
    std::fs::write(
        &config,
        format!("data_dir = \"{}\"\n", dir.path().display()),
    )
    .unwrap();

    gale()
        .args(["--config"])
        .arg(&config)
        .arg("stop")
        .assert()
        .success()
        .stdout(predicate::str::contains("not running"));
}
