//! Integration tests for config loading from fixture files.
//!
//! These tests verify that the sample config file matches the keys ovh-invoice reads.

use std::fs;
use std::path::Path;

/// Read the sample config file content.
fn read_sample_config() -> String {
    let config_path = Path::new("tests/fixtures/sample_config.toml");
    fs::read_to_string(config_path).expect("Failed to read sample config file")
}

fn ovh_invoice_section() -> toml::Value {
    let config_content = read_sample_config();
    let value: toml::Value = toml::from_str(&config_content).expect("should parse");
    value.get("ovh_invoice").expect("should have ovh_invoice section").clone()
}

#[test]
fn sample_config_file_exists() {
    let config_path = Path::new("tests/fixtures/sample_config.toml");
    assert!(config_path.exists(), "Sample config file should exist");
}

#[test]
fn sample_config_is_valid_toml() {
    let config_content = read_sample_config();
    let result: Result<toml::Value, _> = toml::from_str(&config_content);
    assert!(result.is_ok(), "Sample config should be valid TOML: {:?}", result.err());
}

#[test]
fn ovh_invoice_section_has_expected_structure() {
    let section = ovh_invoice_section();

    for key in [
        "endpoint",
        "application_key",
        "application_secret",
        "consumer_key",
        "dir",
        "verbose",
    ] {
        assert!(section.get(key).is_some(), "Config should have ovh_invoice.{key}");
    }
}

#[test]
fn ovh_invoice_section_has_expected_types() {
    let section = ovh_invoice_section();

    assert!(section.get("endpoint").and_then(toml::Value::as_str).is_some());
    assert!(section.get("dir").and_then(toml::Value::as_str).is_some());
    assert!(section.get("verbose").and_then(toml::Value::as_bool).is_some());
}

#[test]
fn sample_endpoint_is_a_known_alias() {
    let section = ovh_invoice_section();
    let endpoint = section.get("endpoint").and_then(toml::Value::as_str).expect("should have endpoint");

    let known = [
        "ovh-eu",
        "ovh-ca",
        "ovh-us",
        "kimsufi-eu",
        "kimsufi-ca",
        "soyoustart-eu",
        "soyoustart-ca",
    ];
    assert!(known.contains(&endpoint), "Unexpected endpoint alias: {endpoint}");
}

#[test]
fn default_config_path_is_under_home_config() {
    if std::env::var_os(ovh_invoice::config::CONFIG_PATH_ENV).is_some() {
        return;
    }
    if let Some(path) = ovh_invoice::config::CONFIG_PATH.as_deref() {
        assert!(path.ends_with(".config/ovh-invoice.toml"));
    }
}
