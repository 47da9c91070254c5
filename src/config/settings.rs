//! Application configuration loading from config.toml
//!
//! Every section is optional; anything left out falls back to the defaults
//! defined here. A missing file is not an error, a malformed one is.

use super::database::DEFAULT_DATABASE_URL;
use super::reminders::ReminderPolicy;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Database settings
    pub database: DatabaseConfig,
    /// Billing settings
    pub billing: BillingConfig,
    /// Reminder tier table
    pub reminders: ReminderPolicy,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the API binds to
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Database settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL, overridden by `DATABASE_URL`
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

/// Billing settings
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Largest difference in dollars still treated as balanced
    pub tolerance: f64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self { tolerance: 0.01 }
    }
}

impl AppConfig {
    /// Checks values serde cannot.
    pub fn validate(&self) -> Result<()> {
        if !self.billing.tolerance.is_finite() || self.billing.tolerance < 0.0 {
            return Err(Error::Config {
                message: format!(
                    "billing.tolerance must be a non-negative number, got {}",
                    self.billing.tolerance
                ),
            });
        }
        self.reminders.validate()
    }
}

/// Parses and validates configuration from a TOML string.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from a TOML file, using defaults when the file does not exist.
///
/// # Errors
/// Returns an error if:
/// - The file exists but cannot be read
/// - The TOML syntax is invalid
/// - A value fails validation (e.g. duplicate reminder tiers)
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::info!("No config file at {:?}, using defaults", path);
        return Ok(AppConfig::default());
    }

    tracing::debug!("Loading configuration from {:?}", path);
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;
    parse_config(&contents)
}

/// Loads configuration from `TRIP_LEDGER_CONFIG`, or ./config.toml when unset.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var("TRIP_LEDGER_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    load_config(path)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::entities::enums::ReminderUrgency;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [server]
            bind_address = "0.0.0.0:9000"

            [database]
            url = "sqlite::memory:"

            [billing]
            tolerance = 0.05

            [[reminders.tiers]]
            urgency = "friendly"
            days_before = 10

            [[reminders.tiers]]
            urgency = "final"
            days_before = 1
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:9000");
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.billing.tolerance, 0.05);
        assert_eq!(config.reminders.tiers.len(), 2);
        assert_eq!(config.reminders.tiers[1].urgency, ReminderUrgency::Final);
        assert_eq!(config.reminders.tiers[1].days_before, 1);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert_eq!(config.billing.tolerance, 0.01);
        assert_eq!(config.reminders.tiers.len(), 4);
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let result = parse_config("[billing]\ntolerance = -1.0\n");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = parse_config("[server\nbind_address = 1");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config("definitely/not/here/config.toml").unwrap();
        assert_eq!(config.database.url, DEFAULT_DATABASE_URL);
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config = parse_config(include_str!("../../config.toml")).unwrap();
        assert_eq!(config.reminders, ReminderPolicy::default());
        assert_eq!(config.billing.tolerance, 0.01);
        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
    }
}
