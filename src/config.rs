use crate::error::ConfigError;
use crate::tracker::ranker::{MAX_CAPACITY, MIN_CAPACITY};
use anyhow::{anyhow, Result};
use serde_derive::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl AppConfig {
    pub fn log_level(&self) -> tracing::Level {
        tracing::Level::from_str(self.log_level.as_str()).unwrap_or(tracing::Level::INFO)
    }
}

pub(crate) fn load_app_config() -> Result<AppConfig> {
    match envy::from_env::<AppConfig>() {
        Ok(config) => Ok(config),
        Err(err) => Err(anyhow!("Failed to load AppConfig: {}", err)),
    }
}

fn default_num_max_values() -> usize {
    2
}

fn default_state_path() -> PathBuf {
    PathBuf::from("power_max_tracker.json")
}

/// Settings of one tracked power source. Immutable once loaded.
#[derive(Deserialize, Debug, Clone)]
pub struct TrackerConfig {
    pub source_sensor: String,
    #[serde(default)]
    pub binary_sensor: Option<String>,
    #[serde(default = "default_num_max_values")]
    pub num_max_values: usize,
    #[serde(default)]
    pub monthly_reset: bool,
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
    // replay today's hours not yet ranked from Home Assistant history at startup
    #[serde(default)]
    pub backfill_from_midnight: bool,
}

impl TrackerConfig {
    /// Checks the configuration surface and normalizes an empty binary sensor to `None`.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&self.num_max_values) {
            return Err(ConfigError::invalid(
                "num_max_values",
                format!(
                    "must be an integer between {} and {}, got {}",
                    MIN_CAPACITY, MAX_CAPACITY, self.num_max_values
                ),
            ));
        }

        self.source_sensor = self.source_sensor.trim().to_string();
        if self.source_sensor.is_empty() {
            return Err(ConfigError::missing("source_sensor"));
        }
        if !self.source_sensor.starts_with("sensor.") {
            return Err(ConfigError::invalid(
                "source_sensor",
                format!("'{}' is not a sensor entity", self.source_sensor),
            ));
        }

        self.binary_sensor = self
            .binary_sensor
            .take()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        if let Some(binary_sensor) = &self.binary_sensor {
            if !binary_sensor.starts_with("binary_sensor.") {
                return Err(ConfigError::invalid(
                    "binary_sensor",
                    format!("'{}' is not a binary_sensor entity", binary_sensor),
                ));
            }
        }

        Ok(self)
    }
}

pub(crate) fn load_tracker_config() -> crate::error::Result<TrackerConfig> {
    let config = envy::prefixed("TRACKER_")
        .from_env::<TrackerConfig>()
        .map_err(ConfigError::env_parse)?;
    Ok(config.validate()?)
}

fn default_poll_interval_sec() -> u64 {
    5
}

fn default_request_timeout_sec() -> u64 {
    10
}

#[derive(Deserialize, Debug, Clone)]
pub struct HassConfig {
    pub url: String,
    pub token: String,
    #[serde(default = "default_poll_interval_sec")]
    pub poll_interval_sec: u64,
    #[serde(default = "default_request_timeout_sec")]
    pub request_timeout_sec: u64,
}

pub(crate) fn load_hass_config() -> Result<HassConfig> {
    match envy::prefixed("HASS_").from_env::<HassConfig>() {
        Ok(config) => Ok(config),
        Err(err) => Err(anyhow!("Failed to load HassConfig: {}", err)),
    }
}

#[derive(Deserialize, Debug)]
pub struct InfluxConfig {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
}

pub fn load_influx_config() -> Result<InfluxConfig> {
    match envy::prefixed("INFLUXDB_").from_env::<InfluxConfig>() {
        Ok(config) => Ok(config),
        Err(err) => Err(anyhow!("Failed to load InfluxConfig: {}", err)),
    }
}
