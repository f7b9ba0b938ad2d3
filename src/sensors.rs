//! Sensor aggregation: one consistent snapshot per tick.
//!
//! Wraps the probe bus and the humidity sensor, validates sensor presence at
//! startup, and tracks consecutive read faults so the supervisor can tell a
//! glitch from a dead bus.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::SensorReadError;
use crate::hardware::{HumiditySensor, TemperatureProbes};
use crate::models::{HumidityReading, ProbeReading};

// ---

/// Consecutive transient read faults before the supervisor must give up.
pub const MAX_CONSECUTIVE_FAULTS: u32 = 3;

pub struct SensorAggregator<P: TemperatureProbes, H: HumiditySensor> {
    probes: P,
    humidity: H,
    consecutive_faults: u32,
}

impl<P: TemperatureProbes, H: HumiditySensor> SensorAggregator<P, H> {
    pub fn new(probes: P, humidity: H) -> Self {
        Self {
            probes,
            humidity,
            consecutive_faults: 0,
        }
    }

    /// Snapshot all responding temperature probes, ordered by probe id.
    /// An empty response counts as a read fault.
    pub fn read_probes(&mut self, now: DateTime<Utc>) -> Result<Vec<ProbeReading>, SensorReadError> {
        // ---
        let raw = match self.probes.read() {
            Ok(raw) if raw.is_empty() => return self.register_fault(SensorReadError::NoReadings),
            Ok(raw) => raw,
            Err(e) => return self.register_fault(e),
        };
        self.consecutive_faults = 0;

        let mut readings: Vec<ProbeReading> = raw
            .into_iter()
            .map(|(id, temp)| ProbeReading::new(id, temp, now))
            .collect();
        readings.sort_by(|a, b| a.probe_id.cmp(&b.probe_id));

        let temp_text: Vec<String> = readings
            .iter()
            .map(|r| format!("{}°C", r.temperature_c))
            .collect();
        info!("Probe temps: {}.", temp_text.join(", "));

        Ok(readings)
    }

    /// Snapshot the humidity sensor.
    pub fn read_humidity(&mut self, now: DateTime<Utc>) -> Result<HumidityReading, SensorReadError> {
        // ---
        match self.humidity.read() {
            Ok((temp, humid)) => {
                self.consecutive_faults = 0;
                Ok(HumidityReading::new(temp, humid, now))
            }
            Err(e) => self.register_fault(e),
        }
    }

    /// How many reads in a row have failed.
    pub fn consecutive_faults(&self) -> u32 {
        self.consecutive_faults
    }

    /// Startup-only presence gate: do the expected sensors respond at all?
    /// Logs each discrepancy; the supervisor must abort initialization on
    /// `false` rather than enter the loop.
    pub fn sanity_check(&mut self, expected_probes: usize) -> bool {
        // ---
        let mut sane = true;

        match self.probes.read() {
            Ok(raw) if raw.len() == expected_probes => {}
            Ok(raw) => {
                warn!(
                    "Missing temperature probes, expected {expected_probes}, found {}.",
                    raw.len()
                );
                sane = false;
            }
            Err(e) => {
                warn!("Temperature probe bus did not respond: {e}");
                sane = false;
            }
        }

        if let Err(e) = self.humidity.read() {
            warn!("Missing humidity sensor: {e}");
            sane = false;
        }

        sane
    }

    fn register_fault<T>(&mut self, fault: SensorReadError) -> Result<T, SensorReadError> {
        self.consecutive_faults += 1;
        Err(fault)
    }
}
