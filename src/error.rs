//! Fault taxonomy for the control loop.
//!
//! Transient faults (a failed sensor read, a dropped log write) are absorbed
//! close to where they occur; everything that reaches the supervisor as a
//! `ControlError` is fatal and unwinds into the shutdown sequence.

use thiserror::Error;

// ---

/// A single sensor read failed. Transient: the tick is skipped and the loop
/// continues, escalating to fatal only after three in a row.
#[derive(Debug, Error)]
pub enum SensorReadError {
    /// The sensor bus did not answer at all.
    #[error("sensor bus unavailable")]
    BusUnavailable,
    /// A read completed but produced no usable samples.
    #[error("no probes responded")]
    NoReadings,
    /// A sensor returned a value outside its physical range.
    #[error("invalid reading from {sensor}: {value}")]
    InvalidData { sensor: String, value: f64 },
}

/// Relay write/readback failure. Always fatal: without authoritative relay
/// state no safe control decision exists.
#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("readback of {name} relay failed")]
    ReadFailed { name: &'static str },
    #[error("write to {name} relay failed")]
    WriteFailed { name: &'static str },
}

/// Persistence failure. Recoverable during the loop: relay readback stays
/// authoritative, only historical accounting is lost.
#[derive(Debug, Error)]
#[error("store operation failed: {0}")]
pub struct StoreError(#[from] pub sqlx::Error);

/// Configuration rejected at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid thresholds: min_temp {min_temp} must be below max_temp {max_temp}")]
    InvalidThresholds { min_temp: f64, max_temp: f64 },
}

/// Top-level fault as seen by the supervisor. Any of these ends the loop.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Startup sanity check found fewer sensors than configured.
    #[error("sensor sanity check failed: {0}")]
    SensorFault(String),
    /// Three consecutive transient read faults.
    #[error("sensor readings lost: {0}")]
    SensorsLost(#[source] SensorReadError),
    #[error(transparent)]
    Hardware(#[from] HardwareError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
