//! Unit tests for configuration resolution and graceful degradation
//!
//! Covers:
//! - Missing config files fall back to compiled defaults
//! - CLI path beats the environment variable
//! - Malformed TOML is reported, not silently ignored
//! - API key priority: ENV → TOML
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that touch LISTING_AUDIT_CONFIG or API key variables are marked
//! with #[serial].

use listing_common::config::{
    resolve_api_key, AddressStrategy, ConfigResolver, TomlConfig, CONFIG_PATH_ENV,
};
use listing_common::Error;
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

const TEST_KEY_ENV: &str = "LISTING_AUDIT_TEST_API_KEY";

#[test]
#[serial]
fn test_cli_path_has_priority_over_env() {
    let temp_dir = TempDir::new().unwrap();
    let cli_path = temp_dir.path().join("cli.toml");
    let env_path = temp_dir.path().join("env.toml");
    env::set_var(CONFIG_PATH_ENV, &env_path);

    let resolver = ConfigResolver::new(Some(cli_path.clone()));
    assert_eq!(resolver.resolve_path(), Some(cli_path));

    env::remove_var(CONFIG_PATH_ENV);
}

#[test]
#[serial]
fn test_env_path_used_without_cli_arg() {
    let temp_dir = TempDir::new().unwrap();
    let env_path = temp_dir.path().join("env.toml");
    env::set_var(CONFIG_PATH_ENV, &env_path);

    let resolver = ConfigResolver::new(None);
    assert_eq!(resolver.resolve_path(), Some(env_path));

    env::remove_var(CONFIG_PATH_ENV);
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    env::remove_var(CONFIG_PATH_ENV);
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("does-not-exist.toml");

    let config = ConfigResolver::new(Some(missing)).load().unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
#[serial]
fn test_load_full_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
        [classifier]
        model = "gpt-4o-mini"
        temperature = 0.0
        requests_per_second = 5

        [address]
        strategy = "validation"
        timeout_ms = 2500

        [orchestrator]
        check_timeout_ms = 1000
        max_concurrent_records = 2

        [database]
        path = "/var/lib/listing-audit/checks.db"

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    let config = ConfigResolver::new(Some(path)).load().unwrap();
    assert_eq!(config.classifier.model, "gpt-4o-mini");
    assert_eq!(config.classifier.temperature, 0.0);
    assert_eq!(config.classifier.requests_per_second, Some(5));
    assert_eq!(config.address.strategy, AddressStrategy::Validation);
    assert_eq!(config.address.timeout_ms, 2500);
    assert_eq!(config.orchestrator.check_timeout_ms, 1000);
    assert_eq!(config.orchestrator.max_concurrent_records, 2);
    assert_eq!(
        config.database.resolved_path().to_string_lossy(),
        "/var/lib/listing-audit/checks.db"
    );
    assert_eq!(config.logging.level, "debug");
}

#[test]
#[serial]
fn test_malformed_file_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    fs::write(&path, "[address\nstrategy = ").unwrap();

    let result = ConfigResolver::new(Some(path)).load();
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_api_key_env_beats_toml() {
    env::set_var(TEST_KEY_ENV, "env-key");
    let key = resolve_api_key(TEST_KEY_ENV, Some("toml-key"), "Test").unwrap();
    assert_eq!(key, "env-key");
    env::remove_var(TEST_KEY_ENV);
}

#[test]
#[serial]
fn test_api_key_falls_back_to_toml() {
    env::remove_var(TEST_KEY_ENV);
    let key = resolve_api_key(TEST_KEY_ENV, Some("toml-key"), "Test").unwrap();
    assert_eq!(key, "toml-key");
}

#[test]
#[serial]
fn test_blank_keys_are_ignored() {
    env::set_var(TEST_KEY_ENV, "   ");
    let key = resolve_api_key(TEST_KEY_ENV, Some("toml-key"), "Test").unwrap();
    assert_eq!(key, "toml-key");

    let missing = resolve_api_key(TEST_KEY_ENV, Some(""), "Test");
    assert!(matches!(missing, Err(Error::Config(_))));
    env::remove_var(TEST_KEY_ENV);
}
