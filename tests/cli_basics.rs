//! Black-box coverage of the `gg` binary: `init`, a commit, and the
//! read-only verbs against the resulting state.

use std::fs;
use std::process::Command;

use assert_cmd::cargo::cargo_bin;
use assert_fs::prelude::*;
use assert_fs::TempDir as FsTempDir;
use predicates::prelude::*;

fn git(dir: &std::path::Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .expect("git must be on PATH");
    assert!(status.success(), "git {args:?} failed");
}

fn gg(repo: &std::path::Path, config_home: &std::path::Path, args: &[&str]) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(cargo_bin("gg"));
    cmd.args(args)
        .arg("--cwd")
        .arg(repo)
        .env("HOME", config_home)
        .env("XDG_CONFIG_HOME", config_home.join(".config"));
    cmd
}

#[test]
fn init_commit_and_status_round_trip() {
    let repo = FsTempDir::new().unwrap();
    let home = FsTempDir::new().unwrap();

    git(repo.path(), &["init", "-q", "-b", "master"]);
    git(repo.path(), &["config", "user.name", "Test"]);
    git(repo.path(), &["config", "user.email", "test@example.com"]);
    repo.child("README").write_str("hello\n").unwrap();
    git(repo.path(), &["add", "-A"]);
    git(repo.path(), &["commit", "-q", "-m", "initial"]);

    gg(repo.path(), home.path(), &["init"])
        .assert()
        .success();

    fs::write(repo.path().join("feature.txt"), "work in progress\n").unwrap();
    gg(repo.path(), home.path(), &["commit", "add a feature"])
        .assert()
        .success();

    gg(repo.path(), home.path(), &["get-summary"])
        .assert()
        .success()
        .stdout(predicate::str::contains("add a feature"));

    gg(repo.path(), home.path(), &["print-status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("*"));

    gg(repo.path(), home.path(), &["check-state"])
        .assert()
        .success();
}

#[test]
fn init_twice_fails() {
    let repo = FsTempDir::new().unwrap();
    let home = FsTempDir::new().unwrap();

    git(repo.path(), &["init", "-q", "-b", "master"]);
    git(repo.path(), &["config", "user.name", "Test"]);
    git(repo.path(), &["config", "user.email", "test@example.com"]);
    repo.child("README").write_str("hello\n").unwrap();
    git(repo.path(), &["add", "-A"]);
    git(repo.path(), &["commit", "-q", "-m", "initial"]);

    gg(repo.path(), home.path(), &["init"]).assert().success();
    gg(repo.path(), home.path(), &["init"]).assert().failure();
}

#[test]
fn commands_without_init_fail_with_a_helpful_message() {
    let repo = FsTempDir::new().unwrap();
    let home = FsTempDir::new().unwrap();

    git(repo.path(), &["init", "-q", "-b", "master"]);

    gg(repo.path(), home.path(), &["print-status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("gg init"));
}
