//! Configuration loader for the `garlicbox` controller.
//!
//! Centralizes all runtime configuration and defaults so `env::var` calls do
//! not scatter through the codebase. Values load once at startup and are
//! immutable for the lifetime of the process; the tick cadence, fan grace
//! period and shutdown cooldown are compile-time constants in
//! [`crate::supervisor`] and [`crate::fans`] because changing them changes
//! the safety contract, not just tuning.

use std::env;

use anyhow::{anyhow, Result};

use crate::models::Thresholds;

/// Parse an optional float environment variable with a default value.
macro_rules! parse_env_f64 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<f64>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_usize {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<usize>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent
/// configuration snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// SQLite connection string.
    pub db_url: String,

    /// Hysteresis band for the heater.
    pub thresholds: Thresholds,

    /// Number of temperature probes the sanity check requires.
    pub expected_probes: usize,

    /// Relative humidity below which a warning is raised, in percent.
    pub humidity_alert_floor: f64,
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `DATABASE_URL` – SQLite connection string (default: `sqlite:garlicbox.db?mode=rwc`)
/// - `MIN_TEMP` – heater-on threshold in °C (default: 67.5)
/// - `MAX_TEMP` – heater-off threshold in °C (default: 72.5)
/// - `EXPECTED_PROBES` – probe count for the sanity check (default: 2)
/// - `HUMIDITY_ALERT_FLOOR` – low-humidity warning level in % (default: 20.0)
///
/// Returns an error if any variable fails to parse or the thresholds are
/// inverted.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:garlicbox.db?mode=rwc".to_string());
    let min_temp = parse_env_f64!("MIN_TEMP", 67.5);
    let max_temp = parse_env_f64!("MAX_TEMP", 72.5);
    let expected_probes = parse_env_usize!("EXPECTED_PROBES", 2);
    let humidity_alert_floor = parse_env_f64!("HUMIDITY_ALERT_FLOOR", 20.0);

    let thresholds = Thresholds::new(min_temp, max_temp)?;

    Ok(Config {
        db_url,
        thresholds,
        expected_probes,
        humidity_alert_floor,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL         : {}", self.db_url);
        tracing::info!("  MIN_TEMP             : {:.1}", self.thresholds.min_temp);
        tracing::info!("  MAX_TEMP             : {:.1}", self.thresholds.max_temp);
        tracing::info!("  EXPECTED_PROBES      : {}", self.expected_probes);
        tracing::info!("  HUMIDITY_ALERT_FLOOR : {:.1}", self.humidity_alert_floor);
    }
}
