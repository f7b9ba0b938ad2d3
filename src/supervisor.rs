//! The fixed-cadence control loop.
//!
//! Checks the heater every 15 seconds and takes a full measurement (probes +
//! humidity, persisted) once a minute. Ticks land on the 0/15/30/45-second
//! marks of each wall-clock minute rather than 15 seconds after the previous
//! tick, so logged times stay legible and do not drift.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Timelike, Utc};
use tracing::{error, info, warn};

use crate::error::{ControlError, SensorReadError};
use crate::hardware::{HumiditySensor, RelayOutput, TemperatureProbes};
use crate::sensors::{SensorAggregator, MAX_CONSECUTIVE_FAULTS};
use crate::store::Store;
use crate::thermostat::ThermostatController;

// ---

/// Seconds between heater checks.
pub const TICK_SECS: u32 = 15;
/// Full measurements happen every this many ticks (once per minute).
pub const MEASURE_EVERY_TICKS: u32 = 4;
/// Mandatory wait after shutdown before the fan relay is released.
pub const COOLDOWN_SECS: u64 = 30;

pub struct Supervisor<P, Hu, H, F>
where
    P: TemperatureProbes,
    Hu: HumiditySensor,
    H: RelayOutput,
    F: RelayOutput,
{
    sensors: SensorAggregator<P, Hu>,
    thermostat: ThermostatController<H, F>,
    store: Store,
    expected_probes: usize,
    humidity_alert_floor: f64,
}

impl<P, Hu, H, F> Supervisor<P, Hu, H, F>
where
    P: TemperatureProbes,
    Hu: HumiditySensor,
    H: RelayOutput,
    F: RelayOutput,
{
    pub fn new(
        sensors: SensorAggregator<P, Hu>,
        thermostat: ThermostatController<H, F>,
        store: Store,
        expected_probes: usize,
        humidity_alert_floor: f64,
    ) -> Self {
        Self {
            sensors,
            thermostat,
            store,
            expected_probes,
            humidity_alert_floor,
        }
    }

    /// Run the control loop until an interrupt or a fatal fault.
    ///
    /// The caller must invoke [`Supervisor::shutdown_and_cooldown`]
    /// afterwards regardless of the outcome; this method never touches the
    /// relays on the way out.
    pub async fn run(&mut self) -> Result<(), ControlError> {
        // ---
        self.thermostat.initialize()?;

        if !self.sensors.sanity_check(self.expected_probes) {
            return Err(ControlError::SensorFault(format!(
                "expected {} temperature probes and a humidity sensor",
                self.expected_probes
            )));
        }

        info!("Sensors verified, entering control loop.");

        let mut loop_counter: u32 = 0;
        loop {
            let delay = delay_to_next_tick(Utc::now());
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Program interrupted.");
                    return Ok(());
                }
                _ = tokio::time::sleep(delay) => {}
            }

            loop_counter += 1;
            let full_measurement = loop_counter == MEASURE_EVERY_TICKS;
            if full_measurement {
                loop_counter = 0; // Once per minute suffices
            }

            self.tick(full_measurement).await?;
        }
    }

    /// One tick: probe snapshot, heater decision, and on measurement ticks
    /// the persisted humidity/temperature log plus the low-humidity alert
    /// decision.
    async fn tick(&mut self, full_measurement: bool) -> Result<(), ControlError> {
        // ---
        let now = Utc::now();

        let readings = match self.sensors.read_probes(now) {
            Ok(readings) => readings,
            Err(fault) => return self.absorb_read_fault(fault),
        };

        self.thermostat.tick(&readings, now).await?;

        if full_measurement {
            let humidity = match self.sensors.read_humidity(now) {
                Ok(humidity) => humidity,
                Err(fault) => return self.absorb_read_fault(fault),
            };

            if humidity.relative_humidity < self.humidity_alert_floor {
                warn!(
                    "Humidity too low: {:.1}%, floor is {:.1}%.",
                    humidity.relative_humidity, self.humidity_alert_floor
                );
            }

            // Dropped log writes cost history, not control: relay readback
            // stays authoritative, so warn and move on.
            if let Err(e) = self.store.write_temperatures(&readings).await {
                warn!("Failed to log temperatures: {e}");
            }
            if let Err(e) = self.store.write_humidity(&humidity).await {
                warn!("Failed to log humidity: {e}");
            }
        }

        Ok(())
    }

    /// Transient sensor faults skip the tick; three in a row are fatal.
    fn absorb_read_fault(&self, fault: SensorReadError) -> Result<(), ControlError> {
        // ---
        if self.sensors.consecutive_faults() >= MAX_CONSECUTIVE_FAULTS {
            error!("Sensor read failed {MAX_CONSECUTIVE_FAULTS} times in a row: {fault}");
            Err(ControlError::SensorsLost(fault))
        } else {
            warn!("Sensor read failed, skipping tick: {fault}");
            Ok(())
        }
    }

    /// The safety tail of every run, normal or faulted: heater off (final
    /// session recorded), fans on, and a cooldown wait before the relays are
    /// released. The wait deliberately ignores further interrupts; a second
    /// Ctrl-C must not leave the coil hot with the fans off.
    pub async fn shutdown_and_cooldown(&mut self) {
        // ---
        let now = Utc::now();
        match self.thermostat.shutdown(now).await {
            Ok(true) => {
                info!("Please wait {COOLDOWN_SECS}s for the heating coil to cool down.");
                tokio::time::sleep(StdDuration::from_secs(COOLDOWN_SECS)).await;
            }
            Ok(false) => {}
            Err(e) => error!("Relay handling during shutdown failed: {e}"),
        }

        if let Err(e) = self.thermostat.release() {
            error!("Failed to release fan relay: {e}");
        }
        info!("Cleanup executed.");
    }
}

/// Time until the next 0/15/30/45-second mark of the wall-clock minute.
/// Landing exactly on a mark rolls over to the next one so two ticks never
/// share a boundary.
pub fn delay_to_next_tick(now: DateTime<Utc>) -> StdDuration {
    // ---
    let tick = f64::from(TICK_SECS);
    let in_minute = f64::from(now.second()) + f64::from(now.nanosecond()) / 1e9;
    let mut next = (in_minute / tick).ceil() * tick;
    if next - in_minute < 1e-6 {
        next += tick;
    }
    StdDuration::from_secs_f64(next - in_minute)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;

    fn at(sec: u32, milli: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 26, 12, 0, sec).unwrap()
            + chrono::Duration::milliseconds(i64::from(milli))
    }

    #[test]
    fn delay_targets_quarter_minute_marks() {
        // ---
        assert_eq!(delay_to_next_tick(at(7, 0)).as_secs_f64(), 8.0);
        assert_eq!(delay_to_next_tick(at(16, 500)).as_secs_f64(), 13.5);
        assert_eq!(delay_to_next_tick(at(59, 0)).as_secs_f64(), 1.0);
    }

    #[test]
    fn on_boundary_rolls_to_the_next_mark() {
        // ---
        let delay = delay_to_next_tick(at(45, 0));
        assert!((delay.as_secs_f64() - 15.0).abs() < 1e-6);
    }

    #[test]
    fn delay_never_exceeds_one_tick() {
        // ---
        for sec in 0..60 {
            for milli in [0, 1, 250, 999] {
                let delay = delay_to_next_tick(at(sec, milli)).as_secs_f64();
                assert!(delay > 0.0 && delay <= 15.0, "sec={sec} milli={milli}");
            }
        }
    }
}
