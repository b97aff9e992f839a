//! Configuration file support
//!
//! Supports loading configuration from TOML files, with environment
//! variable overrides applied on top.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto::DEFAULT_IV_HISTORY_CAPACITY;
use crate::error::{Result, TrackerError};

/// Root configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tracking engine settings
    pub tracker: TrackerSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config = Self::from_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| TrackerError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Serialize configuration to a TOML string
    pub fn to_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| TrackerError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Apply environment variable overrides.
    ///
    /// Supported environment variables:
    /// - AIRSCOPE_IV_HISTORY_CAPACITY
    /// - AIRSCOPE_VENDOR_LOOKUPS
    /// - AIRSCOPE_LOG_LEVEL
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("AIRSCOPE_IV_HISTORY_CAPACITY") {
            self.tracker.iv_history_capacity =
                v.parse().unwrap_or(self.tracker.iv_history_capacity);
        }
        if let Ok(v) = std::env::var("AIRSCOPE_VENDOR_LOOKUPS") {
            self.tracker.vendor_lookups = v.parse().unwrap_or(self.tracker.vendor_lookups);
        }
        if let Ok(v) = std::env::var("AIRSCOPE_LOG_LEVEL") {
            self.logging.level = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.tracker.validate()
    }
}

/// Tracking engine settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    /// Distinct IVs remembered per network before the oldest is dropped
    pub iv_history_capacity: usize,

    /// Keep per-network IV history (duplicate IV detection needs it)
    pub track_iv_history: bool,

    /// Query the vendor lookup service for new addresses
    pub vendor_lookups: bool,

    /// Disconnect counter decay, per second of capture time
    pub disconnect_decay_per_sec: u32,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            iv_history_capacity: DEFAULT_IV_HISTORY_CAPACITY,
            track_iv_history: true,
            vendor_lookups: true,
            disconnect_decay_per_sec: 1,
        }
    }
}

impl TrackerSettings {
    pub fn validate(&self) -> Result<()> {
        if self.iv_history_capacity == 0 {
            return Err(TrackerError::Config(
                "tracker.iv_history_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// IV history bound, or `None` when tracking is off
    pub fn iv_capacity(&self) -> Option<usize> {
        self.track_iv_history.then_some(self.iv_history_capacity)
    }
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,

    /// Force debug output regardless of level
    pub debug: bool,

    /// Include the event target in output
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            debug: false,
            with_target: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tracker.iv_history_capacity, 65_536);
        assert!(config.tracker.track_iv_history);
        assert!(config.tracker.vendor_lookups);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let config = Config::from_str(
            r#"
            [tracker]
            iv_history_capacity = 1024
            vendor_lookups = false

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.tracker.iv_history_capacity, 1024);
        assert!(!config.tracker.vendor_lookups);
        assert!(config.tracker.track_iv_history);
        assert_eq!(config.tracker.disconnect_decay_per_sec, 1);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = Config::from_str("[tracker]\niv_history_capacity = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(TrackerError::Config(_))));
    }

    #[test]
    fn test_iv_capacity_disabled() {
        let mut settings = TrackerSettings::default();
        assert_eq!(settings.iv_capacity(), Some(65_536));
        settings.track_iv_history = false;
        assert_eq!(settings.iv_capacity(), None);
    }

    #[test]
    fn test_round_trip_toml() {
        let text = Config::default().to_string().unwrap();
        assert!(text.contains("iv_history_capacity"));
        let parsed = Config::from_str(&text).unwrap();
        assert_eq!(parsed.tracker.iv_history_capacity, 65_536);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, TrackerError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
    }

    #[test]
    fn test_bad_toml() {
        assert!(Config::from_str("tracker = [").is_err());
    }
}
