//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use crate::domain::station::{Station, StationRegistry};
use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    /// Camera device (frame script path for the replay camera)
    #[serde(default = "default_camera_device")]
    pub device: String,
    /// Consecutive frame read failures tolerated before giving up
    #[serde(default = "default_max_read_failures")]
    pub max_read_failures: u32,
    /// Delay before retrying a failed frame read
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: default_camera_device(),
            max_read_failures: default_max_read_failures(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_camera_device() -> String {
    "frames.txt".to_string()
}

fn default_max_read_failures() -> u32 {
    5
}

fn default_retry_delay_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Cooldown after an accepted scan
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    /// Polling interval while actively scanning
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Polling interval while cooling down
    #[serde(default = "default_cooldown_poll_interval_ms")]
    pub cooldown_poll_interval_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            cooldown_poll_interval_ms: default_cooldown_poll_interval_ms(),
        }
    }
}

fn default_cooldown_secs() -> u64 {
    60
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_cooldown_poll_interval_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// File path for the trip log (JSONL format)
    #[serde(default = "default_store_file")]
    pub file: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { file: default_store_file() }
    }
}

fn default_store_file() -> String {
    "trips.jsonl".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval_secs")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval_secs() }
    }
}

fn default_metrics_interval_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Station id -> [lat, lon]; replaces the built-in table when present
    #[serde(default)]
    pub stations: BTreeMap<String, [f64; 2]>,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    camera_device: String,
    max_read_failures: u32,
    retry_delay_ms: u64,
    cooldown_secs: u64,
    poll_interval_ms: u64,
    cooldown_poll_interval_ms: u64,
    store_file: String,
    metrics_interval_secs: u64,
    stations: Vec<Station>,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera_device: default_camera_device(),
            max_read_failures: default_max_read_failures(),
            retry_delay_ms: default_retry_delay_ms(),
            cooldown_secs: default_cooldown_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            cooldown_poll_interval_ms: default_cooldown_poll_interval_ms(),
            store_file: default_store_file(),
            metrics_interval_secs: default_metrics_interval_secs(),
            stations: Vec::new(),
            config_file: "default".to_string(),
        }
    }
}

fn pick_config_path(cli_path: Option<&str>, env_path: Option<&str>) -> String {
    cli_path
        .or(env_path)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_CONFIG_PATH)
        .to_string()
}

const DEFAULT_CONFIG_PATH: &str = "config/dev.toml";

impl Config {
    /// Determine config file path: `--config` value, then `CONFIG_FILE`, then the default
    pub fn resolve_config_path(cli_path: Option<&str>) -> String {
        pick_config_path(cli_path, env::var("CONFIG_FILE").ok().as_deref())
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str, source: &str) -> anyhow::Result<Self> {
        let toml_config: TomlConfig = toml::from_str(content)
            .with_context(|| format!("Failed to parse config file {}", source))?;

        let stations = toml_config
            .stations
            .iter()
            .map(|(id, [lat, lon])| Station::new(id, *lat, *lon))
            .collect();

        Ok(Self {
            camera_device: toml_config.camera.device,
            max_read_failures: toml_config.camera.max_read_failures,
            retry_delay_ms: toml_config.camera.retry_delay_ms,
            cooldown_secs: toml_config.scan.cooldown_secs,
            poll_interval_ms: toml_config.scan.poll_interval_ms,
            cooldown_poll_interval_ms: toml_config.scan.cooldown_poll_interval_ms,
            store_file: toml_config.store.file,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            stations,
            config_file: source.to_string(),
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// Load configuration from a path, falling back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {:#}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Load configuration from the resolved path, falling back to defaults
    pub fn load(cli_path: Option<&str>) -> Self {
        Self::load_from_path(&Self::resolve_config_path(cli_path))
    }

    /// Build the station registry (configured table, or the built-in one)
    pub fn station_registry(&self) -> StationRegistry {
        if self.stations.is_empty() {
            StationRegistry::singapore()
        } else {
            StationRegistry::from_entries(self.stations.iter().cloned())
        }
    }

    // Getters for all config fields
    pub fn camera_device(&self) -> &str {
        &self.camera_device
    }

    pub fn max_read_failures(&self) -> u32 {
        self.max_read_failures
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn cooldown_poll_interval(&self) -> Duration {
        Duration::from_millis(self.cooldown_poll_interval_ms)
    }

    pub fn store_file(&self) -> &str {
        &self.store_file
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method to override the camera device
    pub fn with_camera_device(mut self, device: &str) -> Self {
        self.camera_device = device.to_string();
        self
    }
}
