// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/shelfwatch-rs

//! Configuration module

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// MQTT broker and subscription
    pub mqtt: MqttConfig,

    /// Shelf layout and item weights
    pub shelves: ShelfConfig,

    /// Alert thresholds and log sizing
    pub alerts: AlertConfig,

    /// Alarm actuator pins and pattern
    pub actuator: ActuatorConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Dashboard HTTP surface
    pub http: HttpConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let unit = self.shelves.item_unit_weight;
        if !unit.is_finite() || unit <= 0.0 {
            bail!("shelves.item_unit_weight must be a positive number, got {}", unit);
        }
        let threshold = self.alerts.low_stock_threshold;
        if !threshold.is_finite() || threshold <= 0.0 {
            bail!("alerts.low_stock_threshold must be a positive number, got {}", threshold);
        }
        if self.alerts.log_capacity == 0 {
            bail!("alerts.log_capacity must be at least 1");
        }
        if self.actuator.cycles == 0 {
            bail!("actuator.cycles must be at least 1");
        }
        if self.mqtt.topic_prefix.is_empty() {
            bail!("mqtt.topic_prefix must not be empty");
        }
        Ok(())
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("shelfwatch"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// MQTT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub broker: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,

    /// Namespace all sensor topics live under; subscription is `<prefix>/#`
    pub topic_prefix: String,

    pub keep_alive_secs: u64,

    /// Delay before polling again after a connection error
    pub reconnect_delay_ms: u64,

    /// Request channel capacity for the rumqttc client
    pub channel_capacity: usize,
}

impl MqttConfig {
    pub fn subscription(&self) -> String {
        format!("{}/#", self.topic_prefix)
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: "localhost".to_string(),
            port: 1883,
            client_id: "shelfwatch".to_string(),
            username: None,
            password: None,
            topic_prefix: "warehouse".to_string(),
            keep_alive_secs: 30,
            reconnect_delay_ms: 5000,
            channel_capacity: 100,
        }
    }
}

/// Shelf configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShelfConfig {
    /// Shelves created at startup; others appear on first event
    pub known: Vec<String>,

    /// Shelf used when a topic names none
    pub default_shelf: String,

    /// Distance reported before the first distance event
    pub initial_distance: u32,

    /// Weight of a single stocked item in kilograms
    pub item_unit_weight: f64,
}

impl Default for ShelfConfig {
    fn default() -> Self {
        Self {
            known: vec!["shelf1".to_string()],
            default_shelf: "shelf1".to_string(),
            initial_distance: 100,
            item_unit_weight: 0.5,
        }
    }
}

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Weight in kilograms below which a stock alert is raised
    pub low_stock_threshold: f64,

    /// Alerts retained in memory
    pub log_capacity: usize,

    /// Alerts included in the dashboard snapshot
    pub dashboard_recent: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: 2.0,
            log_capacity: 50,
            dashboard_recent: 10,
        }
    }
}

/// Which output driver the alarm uses
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActuatorBackend {
    /// Log transitions only
    Log,
    /// Linux sysfs GPIO
    Sysfs,
}

/// Actuator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuatorConfig {
    pub backend: ActuatorBackend,

    /// BCM pin numbers
    pub buzzer_pin: u32,
    pub light_pin: u32,

    /// On/off repetitions per alarm sequence
    pub cycles: u32,
    pub on_ms: u64,
    pub off_ms: u64,

    pub gpio_root: PathBuf,
}

impl ActuatorConfig {
    pub fn on_duration(&self) -> Duration {
        Duration::from_millis(self.on_ms)
    }

    pub fn off_duration(&self) -> Duration {
        Duration::from_millis(self.off_ms)
    }
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            backend: ActuatorBackend::Log,
            buzzer_pin: 18,
            light_pin: 24,
            cycles: 10,
            on_ms: 500,
            off_ms: 500,
            gpio_root: PathBuf::from("/sys/class/gpio"),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Enable database storage
    pub enabled: bool,

    /// Database path
    pub path: PathBuf,

    /// Records buffered between the event path and the writer
    pub queue_capacity: usize,

    /// Rows returned by a history query
    pub history_limit: usize,

    /// How long shutdown waits for queued records to be written
    pub drain_timeout_ms: u64,
}

impl DatabaseConfig {
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("./data/shelfwatch.db"),
            queue_capacity: 1024,
            history_limit: 50,
            drain_timeout_ms: 5000,
        }
    }
}

/// HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub enabled: bool,
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_warehouse_layout() {
        let config = Config::default();
        assert_eq!(config.mqtt.subscription(), "warehouse/#");
        assert_eq!(config.shelves.item_unit_weight, 0.5);
        assert_eq!(config.alerts.low_stock_threshold, 2.0);
        assert_eq!(config.alerts.log_capacity, 50);
        assert_eq!(config.actuator.cycles, 10);
        assert_eq!(config.actuator.on_duration(), Duration::from_millis(500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [alerts]
            low_stock_threshold = 3.5

            [actuator]
            backend = "sysfs"
            buzzer_pin = 17
            "#,
        )
        .unwrap();

        assert_eq!(config.alerts.low_stock_threshold, 3.5);
        assert_eq!(config.alerts.log_capacity, 50);
        assert_eq!(config.actuator.backend, ActuatorBackend::Sysfs);
        assert_eq!(config.actuator.buzzer_pin, 17);
        assert_eq!(config.actuator.light_pin, 24);
        assert_eq!(config.mqtt.port, 1883);
    }

    #[test]
    fn test_validate_rejects_zero_unit_weight() {
        let mut config = Config::default();
        config.shelves.item_unit_weight = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.alerts.log_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let created = Config::load_or_create(&path).unwrap();
        assert!(path.exists());

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.mqtt.broker, created.mqtt.broker);
        assert_eq!(loaded.shelves.known, vec!["shelf1".to_string()]);
    }
}
