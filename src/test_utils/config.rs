//! Configuration builders for tests.

use crate::config::{HassConfig, InfluxConfig, TrackerConfig};
use crate::test_utils::fixtures::constants::TEST_SOURCE;
use std::path::PathBuf;

/// Builder for tracker configurations. `build` does not validate.
#[derive(Debug)]
pub struct TestTrackerConfigBuilder {
    source_sensor: String,
    binary_sensor: Option<String>,
    num_max_values: usize,
    monthly_reset: bool,
    state_path: PathBuf,
    backfill_from_midnight: bool,
}

impl TestTrackerConfigBuilder {
    pub fn new() -> Self {
        Self {
            source_sensor: TEST_SOURCE.to_string(),
            binary_sensor: None,
            num_max_values: 2,
            monthly_reset: false,
            state_path: PathBuf::from("test_power_max_tracker.json"),
            backfill_from_midnight: false,
        }
    }

    pub fn with_source_sensor(mut self, source_sensor: impl Into<String>) -> Self {
        self.source_sensor = source_sensor.into();
        self
    }

    pub fn with_binary_sensor(mut self, binary_sensor: impl Into<String>) -> Self {
        self.binary_sensor = Some(binary_sensor.into());
        self
    }

    pub fn with_num_max_values(mut self, num_max_values: usize) -> Self {
        self.num_max_values = num_max_values;
        self
    }

    pub fn with_monthly_reset(mut self, monthly_reset: bool) -> Self {
        self.monthly_reset = monthly_reset;
        self
    }

    pub fn with_state_path(mut self, state_path: impl Into<PathBuf>) -> Self {
        self.state_path = state_path.into();
        self
    }

    pub fn build(self) -> TrackerConfig {
        TrackerConfig {
            source_sensor: self.source_sensor,
            binary_sensor: self.binary_sensor,
            num_max_values: self.num_max_values,
            monthly_reset: self.monthly_reset,
            state_path: self.state_path,
            backfill_from_midnight: self.backfill_from_midnight,
        }
    }
}

/// Builder for Home Assistant configurations.
#[derive(Debug)]
pub struct TestHassConfigBuilder {
    url: String,
    token: String,
    poll_interval_sec: u64,
    request_timeout_sec: u64,
}

impl TestHassConfigBuilder {
    pub fn new() -> Self {
        Self {
            url: "http://homeassistant.test:8123".to_string(),
            token: "test-token".to_string(),
            poll_interval_sec: 1,
            request_timeout_sec: 5,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn build(self) -> HassConfig {
        HassConfig {
            url: self.url,
            token: self.token,
            poll_interval_sec: self.poll_interval_sec,
            request_timeout_sec: self.request_timeout_sec,
        }
    }
}

/// Builder for InfluxDB configurations.
#[derive(Debug)]
pub struct TestInfluxConfigBuilder {
    url: String,
    org: String,
    token: String,
    bucket: String,
}

impl TestInfluxConfigBuilder {
    pub fn new() -> Self {
        Self {
            url: "http://localhost:8086".to_string(),
            org: "test-org".to_string(),
            token: "test-token".to_string(),
            bucket: "test-bucket".to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn build(self) -> InfluxConfig {
        InfluxConfig {
            url: self.url,
            org: self.org,
            token: self.token,
            bucket: self.bucket,
        }
    }
}

/// Home Assistant configuration pointing at a mock server.
pub fn test_hass_config_with_url(url: impl Into<String>) -> HassConfig {
    TestHassConfigBuilder::new().with_url(url).build()
}

/// InfluxDB configuration pointing at a mock server.
pub fn test_influx_config_with_url(url: impl Into<String>) -> InfluxConfig {
    TestInfluxConfigBuilder::new().with_url(url).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_config_builder() {
        let config = TestTrackerConfigBuilder::new()
            .with_source_sensor("sensor.grid")
            .with_binary_sensor("binary_sensor.gate")
            .with_num_max_values(5)
            .with_monthly_reset(true)
            .with_state_path("/tmp/state.json")
            .build();

        assert_eq!(config.source_sensor, "sensor.grid");
        assert_eq!(config.binary_sensor.as_deref(), Some("binary_sensor.gate"));
        assert_eq!(config.num_max_values, 5);
        assert!(config.monthly_reset);
        assert_eq!(config.state_path, PathBuf::from("/tmp/state.json"));
    }

    #[test]
    fn test_convenience_functions() {
        let hass = test_hass_config_with_url("http://mock:8123");
        assert_eq!(hass.url, "http://mock:8123");
        assert_eq!(hass.token, "test-token");

        let influx = TestInfluxConfigBuilder::new().with_bucket("energy").build();
        assert_eq!(influx.bucket, "energy");
        assert_eq!(test_influx_config_with_url("http://mock:8086").url, "http://mock:8086");
    }
}
