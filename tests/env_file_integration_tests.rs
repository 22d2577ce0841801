//! Integration tests for loading settings from a `.env` file.
//!
//! The binary runs inside a temporary directory so the `.env` file there is picked up.
//! The invoice directory named in it does not exist, so the run stops before any network request.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const ENV_VARS: [&str; 6] = [
    "OVH_ENDPOINT",
    "OVH_AK",
    "OVH_AS",
    "OVH_CK",
    "INVOICE_DIR",
    "OVH_INVOICE_CONFIG",
];

fn run_download(dir: &Path) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_ovh-invoice"));
    for var in ENV_VARS {
        command.env_remove(var);
    }
    command
        .current_dir(dir)
        .env("OVH_INVOICE_CONFIG", dir.join("missing-config.toml"))
        .args(["download", "--year", "2024", "--month", "03", "--verbose"])
        .output()
        .expect("Failed to run ovh-invoice")
}

#[test]
fn env_file_values_reach_the_config() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(
        dir.path().join(".env"),
        "OVH_ENDPOINT=ovh-ca\nOVH_AK=ak\nOVH_AS=as\nOVH_CK=ck\nINVOICE_DIR=from-env-file\n",
    )
    .expect("Failed to write .env");

    let output = run_download(dir.path());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(stdout.contains("Endpoint: ovh-ca"), "stdout: {stdout}");
    assert!(stdout.contains("Directory: from-env-file"), "stdout: {stdout}");
    assert!(stdout.contains("Period: 2024-03"), "stdout: {stdout}");
    assert!(!output.status.success());
    assert!(stderr.contains("Invoice directory does not exist"), "stderr: {stderr}");
    assert!(stderr.contains("from-env-file"), "stderr: {stderr}");
    assert!(!dir.path().join("from-env-file").exists());
}

#[test]
fn arguments_override_env_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(dir.path().join(".env"), "OVH_ENDPOINT=ovh-ca\nINVOICE_DIR=from-env-file\n").expect("Failed to write .env");

    let output = Command::new(env!("CARGO_BIN_EXE_ovh-invoice"))
        .current_dir(dir.path())
        .env_remove("OVH_ENDPOINT")
        .env_remove("INVOICE_DIR")
        .env("OVH_INVOICE_CONFIG", dir.path().join("missing-config.toml"))
        .args(["download", "--year", "2024", "--month", "03", "--verbose", "--dir", "from-args"])
        .output()
        .expect("Failed to run ovh-invoice");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("Endpoint: ovh-ca"), "stdout: {stdout}");
    assert!(stdout.contains("Directory: from-args"), "stdout: {stdout}");
}

#[test]
fn invalid_env_file_prints_warning_and_continues() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(dir.path().join(".env"), "INVOICE_DIR from-env-file\n").expect("Failed to write .env");

    let output = run_download(dir.path());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(stderr.contains("Failed to load .env file"), "stderr: {stderr}");
    assert!(stdout.contains("Directory: invoices"), "stdout: {stdout}");
    assert!(!output.status.success());
}
