//! Integration tests for configuration loading

use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use transit_points::infra::Config;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[camera]
device = "/tmp/frames.txt"
max_read_failures = 3
retry_delay_ms = 250

[scan]
cooldown_secs = 30
poll_interval_ms = 50
cooldown_poll_interval_ms = 200

[store]
file = "/var/lib/transit/trips.jsonl"

[metrics]
interval_secs = 15
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.camera_device(), "/tmp/frames.txt");
    assert_eq!(config.max_read_failures(), 3);
    assert_eq!(config.retry_delay(), Duration::from_millis(250));
    assert_eq!(config.cooldown(), Duration::from_secs(30));
    assert_eq!(config.poll_interval(), Duration::from_millis(50));
    assert_eq!(config.cooldown_poll_interval(), Duration::from_millis(200));
    assert_eq!(config.store_file(), "/var/lib/transit/trips.jsonl");
    assert_eq!(config.metrics_interval_secs(), 15);
    assert_eq!(config.config_file(), temp_file.path().display().to_string());
    // No [stations] table: built-in registry
    assert!(config.station_registry().is_valid("HarbourFront"));
}

#[test]
fn test_stations_table_replaces_registry() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(b"[stations]\n\"Depot\" = [1.30, 103.80]\n\"Terminal\" = [1.31, 103.81]\n")
        .unwrap();
    temp_file.flush().unwrap();

    let registry = Config::from_file(temp_file.path()).unwrap().station_registry();

    assert_eq!(registry.len(), 2);
    assert!(registry.is_valid("Depot"));
    assert!(!registry.is_valid("Kovan"));
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.camera_device(), "frames.txt");
    assert_eq!(config.cooldown(), Duration::from_secs(60));
    assert_eq!(config.store_file(), "trips.jsonl");
    assert_eq!(config.config_file(), "default");
}

#[test]
fn test_invalid_file_falls_back_to_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[scan]\ncooldown_secs = \"soon\"\n").unwrap();
    temp_file.flush().unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
    let config = Config::load_from_path(&temp_file.path().display().to_string());
    assert_eq!(config.cooldown(), Duration::from_secs(60));
}

#[test]
fn test_load_uses_config_file_env_unless_flag_given() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[stations]\n\"Alpha\" = [1.0, 103.0]\n").unwrap();
    temp_file.flush().unwrap();
    let env_path = temp_file.path().to_str().unwrap().to_string();

    std::env::set_var("CONFIG_FILE", &env_path);
    let from_env = Config::load(None);
    let from_flag = Config::load(Some("/nonexistent/flag.toml"));
    std::env::remove_var("CONFIG_FILE");

    assert_eq!(from_env.config_file(), env_path);
    let registry = from_env.station_registry();
    assert_eq!(registry.len(), 1);
    assert!(registry.is_valid("Alpha"));

    // The flag wins; its file is missing so defaults apply
    assert_eq!(from_flag.config_file(), "default");
    assert!(!from_flag.station_registry().is_valid("Alpha"));
    assert!(from_flag.station_registry().is_valid("Kovan"));
}
