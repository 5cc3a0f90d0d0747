//! CLI smoke tests for the `tr` binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tr(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tr").unwrap();
    // Keep logs and config lookups inside the temp dir
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_help() {
    let home = TempDir::new().unwrap();
    tr(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("tools"));
}

#[test]
fn test_tools_against_calchost() {
    let home = TempDir::new().unwrap();
    tr(&home)
        .args(["tools", "--", env!("CARGO_BIN_EXE_calchost")])
        .assert()
        .success()
        .stdout(predicate::str::contains("simple-calculator"))
        .stdout(predicate::str::contains("Connected to server with 3 tools"))
        .stdout(predicate::str::contains("add: Add two numbers together"));
}

#[test]
fn test_tools_from_config_host() {
    let home = TempDir::new().unwrap();
    let config = format!("host:\n  command: {}\n", env!("CARGO_BIN_EXE_calchost"));
    std::fs::write(home.path().join(".toolrelay.yml"), config).unwrap();

    tr(&home)
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("greet"));
}

#[test]
fn test_no_host_fails() {
    let home = TempDir::new().unwrap();
    tr(&home)
        .arg("tools")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No tool host given"));
}

#[test]
fn test_missing_host_executable_fails() {
    let home = TempDir::new().unwrap();
    tr(&home)
        .args(["tools", "--", "/nonexistent/toolrelay-host"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to connect"));
}

#[test]
fn test_ask_requires_api_key() {
    let home = TempDir::new().unwrap();
    tr(&home)
        .env_remove("ANTHROPIC_API_KEY")
        .args(["ask", "2+2?", "--", env!("CARGO_BIN_EXE_calchost")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ANTHROPIC_API_KEY"));
}
