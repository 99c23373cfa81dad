//! Station configuration.

use crate::error::{Result, StationError};
use serde::{Deserialize, Serialize};

/// Serial line format for emitted samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// `T=22.5,H=48.3,P=1013.3,R=0.0`
    #[default]
    #[value(name = "kv")]
    KeyValue,
    /// One JSON object per line
    Json,
}

/// Configuration for the sample loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    /// Sampling interval in milliseconds
    pub interval_ms: u64,
    /// Scheduler tick in milliseconds
    pub tick_ms: u64,
    /// Serial line format
    pub format: OutputFormat,
    /// Sea-level reference pressure in hPa
    pub sea_level_hpa: f32,
    /// Title drawn on the first display row
    pub title: String,
    /// Halt at startup when the barometer is not detected
    pub require_barometer: bool,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            interval_ms: crate::DEFAULT_INTERVAL_MS,
            tick_ms: crate::DEFAULT_TICK_MS,
            format: OutputFormat::default(),
            sea_level_hpa: crate::SEA_LEVEL_PRESSURE_HPA,
            title: crate::DEFAULT_TITLE.to_string(),
            require_barometer: false,
        }
    }
}

impl StationConfig {
    /// Set the sampling interval.
    pub fn with_interval(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Set the scheduler tick.
    pub fn with_tick(mut self, tick_ms: u64) -> Self {
        self.tick_ms = tick_ms;
        self
    }

    /// Set the serial line format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_sea_level(mut self, hpa: f32) -> Self {
        self.sea_level_hpa = hpa;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Treat a missing barometer as fatal.
    pub fn with_required_barometer(mut self, required: bool) -> Self {
        self.require_barometer = required;
        self
    }

    /// Check that the timing values can drive a loop.
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(StationError::config_error("interval must be greater than zero"));
        }
        if self.tick_ms == 0 {
            return Err(StationError::config_error("tick must be greater than zero"));
        }
        if !(self.sea_level_hpa.is_finite() && self.sea_level_hpa > 0.0) {
            return Err(StationError::config_error(format!(
                "invalid sea-level pressure: {}",
                self.sea_level_hpa
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = StationConfig::default();
        assert_eq!(config.interval_ms, 5000);
        assert_eq!(config.format, OutputFormat::KeyValue);
        assert_eq!(config.sea_level_hpa, 1013.25);
        assert!(!config.require_barometer);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = StationConfig::default().with_interval(0);
        assert!(matches!(config.validate(), Err(StationError::Config(_))));
    }

    #[test]
    fn test_format_serializes_snake_case() {
        let json = serde_json::to_string(&OutputFormat::KeyValue).unwrap();
        assert_eq!(json, "\"key_value\"");
    }
}
