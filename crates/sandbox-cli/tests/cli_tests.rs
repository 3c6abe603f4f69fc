//! Argument-parsing and early-failure acceptance tests for the `sandbox`
//! binary. These don't require a running gateway; they exercise clap's
//! validation and the paths that fail before any HTTP call is made.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_every_subcommand() {
    Command::cargo_bin("sandbox")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("upload"))
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("approve"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn missing_subcommand_fails() {
    Command::cargo_bin("sandbox").unwrap().assert().failure();
}

#[test]
fn analyze_rejects_non_uuid_skill_id() {
    Command::cargo_bin("sandbox")
        .unwrap()
        .args(["analyze", "not-a-uuid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn upload_of_missing_file_fails_before_any_network_call() {
    Command::cargo_bin("sandbox")
        .unwrap()
        .args(["upload", "/nonexistent/path/skill.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}
