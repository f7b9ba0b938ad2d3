//! Data model for the curing box controller.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ConfigError;

// ---

/// Digital level of a relay output. `get()` on the relay is the source of
/// truth; this type is never cached by the control logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RelayState {
    Off,
    On,
}

impl RelayState {
    pub fn is_on(self) -> bool {
        self == RelayState::On
    }
}

impl std::fmt::Display for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayState::Off => write!(f, "off"),
            RelayState::On => write!(f, "on"),
        }
    }
}

/// One temperature probe sample, rounded to a single decimal at creation.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReading {
    // ---
    pub probe_id: String,
    pub temperature_c: f64,
    pub timestamp: DateTime<Utc>,
}

impl ProbeReading {
    pub fn new(probe_id: impl Into<String>, temperature_c: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            probe_id: probe_id.into(),
            temperature_c: round_one_decimal(temperature_c),
            timestamp,
        }
    }
}

/// Combined temperature/humidity sample from the single DHT-class sensor.
#[derive(Debug, Clone, Serialize)]
pub struct HumidityReading {
    // ---
    pub temperature_c: f64,
    pub relative_humidity: f64,
    pub timestamp: DateTime<Utc>,
}

impl HumidityReading {
    pub fn new(temperature_c: f64, relative_humidity: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            temperature_c: round_one_decimal(temperature_c),
            relative_humidity: round_one_decimal(relative_humidity),
            timestamp,
        }
    }
}

/// Hysteresis band for the heater. Immutable after construction.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub min_temp: f64,
    pub max_temp: f64,
}

impl Thresholds {
    /// Build a threshold pair, rejecting inverted or degenerate bands.
    pub fn new(min_temp: f64, max_temp: f64) -> Result<Self, ConfigError> {
        if min_temp < max_temp {
            Ok(Self { min_temp, max_temp })
        } else {
            Err(ConfigError::InvalidThresholds { min_temp, max_temp })
        }
    }
}

/// Duty-cycle report produced after each accumulated heating session.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DutyCycle {
    // ---
    /// Cumulative heater-on time, startup heat-up excluded.
    pub total_on_secs: i64,
    /// Wall time since the accumulator baseline was set.
    pub runtime_secs: i64,
    /// `total_on_secs / runtime_secs * 100`.
    pub percentage: f64,
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn probe_reading_rounds_to_one_decimal() {
        // ---
        let r = ProbeReading::new("probe_1", 67.44, Utc::now());
        assert_eq!(r.temperature_c, 67.4);

        let r = ProbeReading::new("probe_1", 67.46, Utc::now());
        assert_eq!(r.temperature_c, 67.5);
    }

    #[test]
    fn humidity_reading_rounds_both_fields() {
        // ---
        let r = HumidityReading::new(21.06, 54.94, Utc::now());
        assert_eq!(r.temperature_c, 21.1);
        assert_eq!(r.relative_humidity, 54.9);
    }

    #[test]
    fn thresholds_require_min_below_max() {
        // ---
        assert!(Thresholds::new(67.5, 72.5).is_ok());
        assert!(Thresholds::new(72.5, 67.5).is_err());
        assert!(Thresholds::new(70.0, 70.0).is_err());
    }
}
