//! CLI-level integration tests: argument parsing, validation exit codes,
//! and the cleanup confirmation gate. Nothing here reaches a real host —
//! every run either stops at validation or fails on a local path.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn gantry() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("gantry"));
    // Tests control the environment fully; anything inherited would leak in.
    for var in [
        "GANTRY_REPO",
        "GANTRY_BRANCH",
        "GANTRY_SERVER",
        "GANTRY_SSH_USER",
        "GANTRY_SSH_KEY",
        "GANTRY_APP_PORT",
        "GANTRY_TOKEN",
        "GANTRY_YES",
        "CI",
        "NO_COLOR",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

const CONNECTION_FLAGS: [&str; 6] = [
    "--server",
    "203.0.113.7",
    "--user",
    "deploy",
    "--key",
    "/tmp/id_ed25519",
];

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

#[test]
fn test_help_lists_subcommands() {
    gantry()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("cleanup"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_deploy_help_lists_flags() {
    gantry()
        .args(["deploy", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--repo"))
        .stdout(predicate::str::contains("--port"))
        .stdout(predicate::str::contains("--server"));
}

#[test]
fn test_version_prints_name_and_version() {
    gantry()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "gantry {}",
            env!("CARGO_PKG_VERSION")
        )));
}

// ---------------------------------------------------------------------------
// Validation exit codes — all fail before any remote call
// ---------------------------------------------------------------------------

#[test]
fn test_deploy_without_repository_exits_1() {
    let dir = TempDir::new().expect("tempdir");
    gantry()
        .arg("deploy")
        .args(CONNECTION_FLAGS)
        .args(["--port", "8080"])
        .env("HOME", dir.path())
        .env("GANTRY_TOKEN", "tok")
        .current_dir(dir.path())
        .write_stdin("")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("repository URL"));
}

#[test]
fn test_deploy_with_invalid_port_exits_1() {
    for bad_port in ["123456", "9", "80a0"] {
        let dir = TempDir::new().expect("tempdir");
        gantry()
            .args(["deploy", "--repo", "https://git.example.com/org/app.git"])
            .args(CONNECTION_FLAGS)
            .args(["--port", bad_port])
            .env("HOME", dir.path())
            .env("GANTRY_TOKEN", "tok")
            .current_dir(dir.path())
            .write_stdin("")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Invalid application port"));
    }
}

#[test]
fn test_deploy_without_token_exits_1() {
    // No GANTRY_TOKEN and stdin is a pipe, so no interactive prompt either.
    let dir = TempDir::new().expect("tempdir");
    gantry()
        .args(["deploy", "--repo", "https://git.example.com/org/app.git"])
        .args(CONNECTION_FLAGS)
        .args(["--port", "8080"])
        .env("HOME", dir.path())
        .current_dir(dir.path())
        .write_stdin("")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("access token"));
}

#[test]
fn test_token_is_never_a_flag() {
    gantry()
        .args(["deploy", "--token", "leaky"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unexpected argument"));
}

#[test]
fn test_missing_explicit_config_file_exits_1() {
    let dir = TempDir::new().expect("tempdir");
    gantry()
        .args(["deploy", "--config", "/definitely/not/here.yaml"])
        .env("HOME", dir.path())
        .env("GANTRY_TOKEN", "tok")
        .current_dir(dir.path())
        .write_stdin("")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Cannot use config file"));
}

#[test]
fn test_config_file_port_is_still_validated() {
    let dir = TempDir::new().expect("tempdir");
    let config_path = dir.path().join("gantry.yaml");
    std::fs::write(
        &config_path,
        "repo: https://git.example.com/org/app.git\n\
         server: 203.0.113.7\n\
         user: deploy\n\
         key: /tmp/id_ed25519\n\
         port: 123456\n",
    )
    .expect("write config");

    gantry()
        .args(["deploy", "--config"])
        .arg(&config_path)
        .env("HOME", dir.path())
        .env("GANTRY_TOKEN", "tok")
        .current_dir(dir.path())
        .write_stdin("")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid application port"));
}

#[test]
fn test_cleanup_without_server_exits_1() {
    let dir = TempDir::new().expect("tempdir");
    gantry()
        .args(["cleanup", "--user", "deploy", "--key", "/tmp/id_ed25519"])
        .env("HOME", dir.path())
        .current_dir(dir.path())
        .write_stdin("")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("server"));
}

// ---------------------------------------------------------------------------
// Failures past validation
// ---------------------------------------------------------------------------

#[test]
fn test_deploy_failure_after_validation_exits_2() {
    // Every field comes from the config file; the repository is a local path
    // that does not exist, so staging fails without touching the network.
    let dir = TempDir::new().expect("tempdir");
    let config_path = dir.path().join("gantry.yaml");
    std::fs::write(
        &config_path,
        "repo: /nonexistent/repo.git\n\
         server: 203.0.113.7\n\
         user: deploy\n\
         key: /tmp/id_ed25519\n\
         port: 8080\n",
    )
    .expect("write config");

    gantry()
        .args(["deploy", "--quiet", "--config"])
        .arg(&config_path)
        .env("HOME", dir.path())
        .env("GANTRY_TOKEN", "tok")
        .current_dir(dir.path())
        .write_stdin("")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("✗"));
}

#[test]
fn test_deploy_failure_lands_in_the_run_log() {
    // Same local-path failure as above; afterwards the run log must hold
    // both the step that was underway and the reason the run died.
    let dir = TempDir::new().expect("tempdir");
    let config_path = dir.path().join("gantry.yaml");
    std::fs::write(
        &config_path,
        "repo: /nonexistent/repo.git\n\
         server: 203.0.113.7\n\
         user: deploy\n\
         key: /tmp/id_ed25519\n\
         port: 8080\n",
    )
    .expect("write config");

    gantry()
        .args(["deploy", "--quiet", "--config"])
        .arg(&config_path)
        .env("HOME", dir.path())
        .env("GANTRY_TOKEN", "tok")
        .current_dir(dir.path())
        .write_stdin("")
        .assert()
        .code(2);

    let log = std::fs::read_to_string(dir.path().join(".gantry/gantry.log"))
        .expect("run log exists");
    assert!(log.contains("[STEP] Staging the repository"), "log:\n{log}");
    let error_line = log
        .lines()
        .find(|line| line.contains("[ERROR]"))
        .unwrap_or_else(|| panic!("no [ERROR] line in log:\n{log}"));
    assert!(error_line.contains("git"), "line: {error_line}");
}

// ---------------------------------------------------------------------------
// Cleanup confirmation gate
// ---------------------------------------------------------------------------

#[test]
fn test_cleanup_declined_exits_0() {
    let dir = TempDir::new().expect("tempdir");
    gantry()
        .arg("cleanup")
        .args(CONNECTION_FLAGS)
        .env("HOME", dir.path())
        .current_dir(dir.path())
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("This will remove"))
        .stdout(predicate::str::contains("203.0.113.7"))
        .stdout(predicate::str::contains("Cancelled."));
}

#[test]
fn test_cleanup_decline_is_the_default_answer() {
    let dir = TempDir::new().expect("tempdir");
    gantry()
        .arg("cleanup")
        .args(CONNECTION_FLAGS)
        .env("HOME", dir.path())
        .current_dir(dir.path())
        .write_stdin("\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled."));
}
