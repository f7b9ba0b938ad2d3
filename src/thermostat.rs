//! Heater hysteresis state machine.
//!
//! Two probes, one heater relay. While heating, the *hottest* probe decides
//! when to stop; while idle, the *coldest* probe decides when to start. The
//! heater therefore runs until every probe is warm enough and will not
//! re-trigger until every probe has cooled, trading slight per-probe
//! overshoot for uniform heating. Readings strictly inside the band never
//! change state, which is what keeps the relay from chattering.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::ControlError;
use crate::fans::FanController;
use crate::hardware::RelayOutput;
use crate::models::{ProbeReading, RelayState, Thresholds};
use crate::runtime::RuntimeAccumulator;

// ---

/// Outcome of one evaluation of the probe snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// Probes straddle both thresholds at once: the thermal field is not
    /// trustworthy. Heater off, fans on, skip hysteresis.
    Divergence,
    TurnOn,
    TurnOff,
    Hold,
}

/// Pure decision function for one tick.
///
/// The divergence override requires `lo` below the band AND `hi` above it
/// simultaneously; a single probe out of band on its own is normal
/// hysteresis territory. Whether the box's owner in fact wants the override
/// on the single-probe case too is unconfirmed; this implements the
/// conjunction.
pub fn decide(heater: RelayState, lo: f64, hi: f64, thresholds: &Thresholds) -> Decision {
    // ---
    if lo < thresholds.min_temp && hi > thresholds.max_temp {
        return Decision::Divergence;
    }

    match heater {
        RelayState::On if hi >= thresholds.max_temp => Decision::TurnOff,
        RelayState::Off if lo <= thresholds.min_temp => Decision::TurnOn,
        _ => Decision::Hold,
    }
}

pub struct ThermostatController<H: RelayOutput, F: RelayOutput> {
    thresholds: Thresholds,
    heater: H,
    fans: FanController<F>,
    accumulator: RuntimeAccumulator,
    /// Timestamp of the last heater transition in either direction.
    heater_ts: DateTime<Utc>,
}

impl<H: RelayOutput, F: RelayOutput> ThermostatController<H, F> {
    pub fn new(
        thresholds: Thresholds,
        heater: H,
        fans: FanController<F>,
        accumulator: RuntimeAccumulator,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            thresholds,
            heater,
            fans,
            accumulator,
            heater_ts: now,
        }
    }

    /// Force both relays off without bookkeeping. Called once before the
    /// loop starts so a relay left latched by a previous crash drops out.
    pub fn initialize(&mut self) -> Result<(), ControlError> {
        // ---
        self.heater.set(RelayState::Off)?;
        self.fans.force_off()?;
        Ok(())
    }

    pub fn heater_state(&self) -> Result<RelayState, ControlError> {
        Ok(self.heater.get()?)
    }

    /// Run one control decision over a fresh probe snapshot.
    ///
    /// Snapshot order is irrelevant; only min and max matter. An empty
    /// snapshot must be filtered out by the caller before this point.
    pub async fn tick(
        &mut self,
        readings: &[ProbeReading],
        now: DateTime<Utc>,
    ) -> Result<(), ControlError> {
        // ---
        let lo = readings
            .iter()
            .map(|r| r.temperature_c)
            .fold(f64::INFINITY, f64::min);
        let hi = readings
            .iter()
            .map(|r| r.temperature_c)
            .fold(f64::NEG_INFINITY, f64::max);

        match decide(self.heater.get()?, lo, hi, &self.thresholds) {
            Decision::Divergence => {
                warn!(lo, hi, "Both probes outside of range, min:{lo}, max: {hi}.");
                self.set_heater(RelayState::Off, now).await?;
                self.fans.force_on()?;
                return Ok(());
            }
            Decision::TurnOn => self.set_heater(RelayState::On, now).await?,
            Decision::TurnOff => self.set_heater(RelayState::Off, now).await?,
            Decision::Hold => {}
        }

        self.fans.settle(self.heater.get()?, self.heater_ts, now)?;
        Ok(())
    }

    /// Shutdown half of the safety contract: force the heater off (recording
    /// the final session like any other off transition) and the fans on.
    /// Returns whether the heater was running, so the caller knows a
    /// cooldown wait is due.
    pub async fn shutdown(&mut self, now: DateTime<Utc>) -> Result<bool, ControlError> {
        // ---
        if self.heater.get()? == RelayState::Off {
            return Ok(false);
        }

        self.set_heater(RelayState::Off, now).await?;
        self.fans.force_on()?;
        Ok(true)
    }

    /// Release the fan relay after the cooldown has elapsed.
    pub fn release(&mut self) -> Result<(), ControlError> {
        Ok(self.fans.force_off()?)
    }

    /// Drive the heater relay to `desired`, a no-op when the readback
    /// already matches. Off transitions forward the session duration to the
    /// accumulator; a failed accounting write is logged and survived, since
    /// relay readback stays authoritative either way.
    async fn set_heater(
        &mut self,
        desired: RelayState,
        now: DateTime<Utc>,
    ) -> Result<(), ControlError> {
        // ---
        if self.heater.get()? == desired {
            return Ok(());
        }

        match desired {
            RelayState::On => {
                info!("Turn on heating.");
                self.heater.set(RelayState::On)?;
            }
            RelayState::Off => {
                info!("Turn off heating.");
                self.heater.set(RelayState::Off)?;
                let on_for = now - self.heater_ts;
                if let Err(e) = self.accumulator.record_duration(on_for, now).await {
                    warn!("Failed to record heating time: {e}");
                }
            }
        }

        self.heater_ts = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn band() -> Thresholds {
        Thresholds::new(67.5, 72.5).unwrap()
    }

    #[test]
    fn cold_box_turns_heater_on() {
        // ---
        // Readings [65.0, 70.0] while off: lo = 65.0 <= 67.5
        let d = decide(RelayState::Off, 65.0, 70.0, &band());
        assert_eq!(d, Decision::TurnOn);
    }

    #[test]
    fn hot_probe_turns_heater_off() {
        // ---
        // Readings [68.0, 73.0] while on: hi = 73.0 >= 72.5
        let d = decide(RelayState::On, 68.0, 73.0, &band());
        assert_eq!(d, Decision::TurnOff);
    }

    #[test]
    fn divergence_overrides_regardless_of_state() {
        // ---
        assert_eq!(
            decide(RelayState::Off, 60.0, 80.0, &band()),
            Decision::Divergence
        );
        assert_eq!(
            decide(RelayState::On, 60.0, 80.0, &band()),
            Decision::Divergence
        );
    }

    #[test]
    fn single_probe_out_of_band_is_not_divergence() {
        // ---
        // Only the low side is out: plain hysteresis applies.
        assert_eq!(
            decide(RelayState::Off, 60.0, 70.0, &band()),
            Decision::TurnOn
        );
        // Only the high side is out while off: hold, not divergence.
        assert_eq!(decide(RelayState::Off, 68.0, 80.0, &band()), Decision::Hold);
    }

    #[test]
    fn readings_inside_the_band_never_change_state() {
        // ---
        assert_eq!(decide(RelayState::On, 68.0, 72.0, &band()), Decision::Hold);
        assert_eq!(decide(RelayState::Off, 68.0, 72.0, &band()), Decision::Hold);
    }

    #[test]
    fn heating_uses_hottest_probe_idle_uses_coldest() {
        // ---
        // While on, the cold probe being below min does not stop heating.
        assert_eq!(decide(RelayState::On, 60.0, 70.0, &band()), Decision::Hold);
        // While off, the cold probe at the threshold triggers heating even
        // though the other probe reads warm.
        assert_eq!(decide(RelayState::Off, 67.5, 72.0, &band()), Decision::TurnOn);
    }

    #[test]
    fn no_chatter_on_monotonic_rise() {
        // ---
        // Heater on, temperatures climbing toward the threshold from below:
        // state changes at most once over the whole sweep.
        let th = band();
        let mut state = RelayState::On;
        let mut transitions = 0;
        for step in 0..50 {
            let base = 68.0 + step as f64 * 0.1;
            let (lo, hi) = (base, base + 0.5);
            match decide(state, lo, hi, &th) {
                Decision::TurnOff => {
                    state = RelayState::Off;
                    transitions += 1;
                }
                Decision::TurnOn => {
                    state = RelayState::On;
                    transitions += 1;
                }
                _ => {}
            }
        }
        assert_eq!(state, RelayState::Off);
        assert_eq!(transitions, 1);
    }

    #[test]
    fn threshold_boundaries_are_inclusive() {
        // ---
        let th = band();
        assert_eq!(decide(RelayState::On, 70.0, 72.5, &th), Decision::TurnOff);
        assert_eq!(decide(RelayState::Off, 67.5, 70.0, &th), Decision::TurnOn);
        // Just inside the band on both ends: hold.
        assert_eq!(decide(RelayState::On, 70.0, 72.4, &th), Decision::Hold);
        assert_eq!(decide(RelayState::Off, 67.6, 70.0, &th), Decision::Hold);
    }
}
