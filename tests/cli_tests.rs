//! CLI integration tests using assert_cmd.
//!
//! All tests run offline against short, capped simulations so the suite stays
//! fast.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

#[allow(deprecated)]
fn pubsim() -> Command {
    Command::cargo_bin("pubsim").unwrap()
}

// --- Help and arg validation ---

#[test]
fn help_shows_all_subcommands() {
    pubsim().arg("--help").assert().success().stdout(
        predicate::str::contains("single")
            .and(predicate::str::contains("chain"))
            .and(predicate::str::contains("step"))
            .and(predicate::str::contains("all")),
    );
}

#[test]
fn help_single_shows_args() {
    pubsim()
        .args(["single", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--sigma")
                .and(predicate::str::contains("--cap"))
                .and(predicate::str::contains("idle")),
        );
}

#[test]
fn unknown_subcommand_fails() {
    pubsim()
        .arg("nonexistent")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn unknown_theory_fails() {
    pubsim()
        .args(["single", "t9", "T1", "e10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn unknown_strategy_fails() {
    pubsim()
        .args(["single", "t1", "T1Zoom", "e10", "--cap", "e20"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown T1 strategy"));
}

#[test]
fn bad_rho_fails() {
    pubsim()
        .args(["single", "t1", "T1", "banana"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

// --- Simulation output ---

#[test]
fn single_prints_result_table() {
    pubsim()
        .args(["single", "t1", "T1", "0", "--cap", "e20"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Theory")
                .and(predicate::str::contains("Tau/hr"))
                .and(predicate::str::contains("T1")),
        );
}

#[test]
fn single_category_expands_strategies() {
    pubsim()
        .args(["single", "t1", "idle", "0", "--cap", "e20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("T1"));
}

#[test]
fn single_json_is_machine_readable() {
    let out = pubsim()
        .args(["--json", "single", "t1", "T1", "0", "--cap", "e20"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(parsed["theory"], "T1");
    assert_eq!(parsed["strat"], "T1");
    assert!(parsed["tau_h"].as_f64().unwrap() > 0.0);
}

#[test]
fn chain_prints_summary_line() {
    pubsim()
        .args(["chain", "t1", "T1", "0", "e25"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("delta tau")
                .and(predicate::str::contains("total time")),
        );
}

#[test]
fn step_emits_one_row_per_start() {
    let out = pubsim()
        .args(["--json", "step", "t1", "T1", "e10", "e20", "5"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 3);
}

#[test]
fn all_compares_active_and_idle() {
    pubsim()
        .args(["all", "T1=e12"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Active")
                .and(predicate::str::contains("Idle"))
                .and(predicate::str::contains("Ratio")),
        );
}

// --- Settings ---

#[test]
fn config_file_is_loaded() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    writeln!(f, "dt = 2.0").unwrap();
    pubsim()
        .args(["--config"])
        .arg(f.path())
        .args(["single", "t1", "T1", "0", "--cap", "e20"])
        .assert()
        .success();
}

#[test]
fn bad_config_value_fails() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    writeln!(f, "ddt = 0.5").unwrap();
    pubsim()
        .args(["--config"])
        .arg(f.path())
        .args(["single", "t1", "T1", "0", "--cap", "e20"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ddt"));
}

#[test]
fn bad_dt_flag_fails() {
    pubsim()
        .args(["--dt", "0", "single", "t1", "T1", "0", "--cap", "e20"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("dt"));
}
