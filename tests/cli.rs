//! CLI surface smoke tests
//!
//! Only the argument surface is exercised here; actually running the tool
//! inspects (and in live mode mutates) the host's boot disk.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_documents_the_live_switch() {
    Command::cargo_bin("ab-repart")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--live"))
        .stdout(predicate::str::contains("Apply the new layout"));
}

#[test]
fn unknown_flags_are_rejected() {
    Command::cargo_bin("ab-repart")
        .unwrap()
        .arg("--force")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unexpected argument"));
}

#[test]
fn version_is_reported() {
    Command::cargo_bin("ab-repart")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ab-repart"));
}
