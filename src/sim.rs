//! Bench-top simulated enclosure.
//!
//! A first-order thermal model behind the hardware traits, so the full
//! control loop can run on a desk without the curing box attached. Probe 2
//! sits closer to the heating coil than probe 1, giving the min/max logic
//! something realistic to chew on.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::error::{HardwareError, SensorReadError};
use crate::hardware::{HumiditySensor, RelayOutput, TemperatureProbes};
use crate::models::RelayState;

// ---

/// Heating rate with the coil energized, °C per second.
const HEAT_RATE: f64 = 0.02;
/// Fraction of the box/ambient temperature difference lost per second.
const LOSS_RATE: f64 = 0.001;
/// Temperature spread between the two probes, °C.
const PROBE_SPREAD: f64 = 1.2;

#[derive(Debug)]
struct SimState {
    box_temp: f64,
    ambient_temp: f64,
    heater: RelayState,
    fans: RelayState,
    last_advanced: DateTime<Utc>,
}

impl SimState {
    /// Step the thermal model forward to `now`.
    fn advance(&mut self, now: DateTime<Utc>) {
        let dt = (now - self.last_advanced).num_milliseconds() as f64 / 1000.0;
        if dt <= 0.0 {
            return;
        }
        if self.heater.is_on() {
            self.box_temp += HEAT_RATE * dt;
        }
        self.box_temp -= (self.box_temp - self.ambient_temp) * LOSS_RATE * dt;
        self.last_advanced = now;
    }
}

/// Shared simulated enclosure. Cloning hands out another handle onto the same
/// box; `heater_relay()` and friends return trait objects wired to it.
#[derive(Debug, Clone)]
pub struct SimulatedBox {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedBox {
    pub fn new(start_temp: f64, ambient_temp: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                box_temp: start_temp,
                ambient_temp,
                heater: RelayState::Off,
                fans: RelayState::Off,
                last_advanced: Utc::now(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // Single control thread; a poisoned lock still holds coherent state.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn heater_relay(&self) -> SimRelay {
        SimRelay {
            sim: self.clone(),
            channel: Channel::Heater,
        }
    }

    pub fn fan_relay(&self) -> SimRelay {
        SimRelay {
            sim: self.clone(),
            channel: Channel::Fans,
        }
    }

    pub fn probes(&self) -> SimProbes {
        SimProbes { sim: self.clone() }
    }

    pub fn humidity_sensor(&self) -> SimHumidity {
        SimHumidity { sim: self.clone() }
    }
}

#[derive(Debug, Clone, Copy)]
enum Channel {
    Heater,
    Fans,
}

#[derive(Debug)]
pub struct SimRelay {
    sim: SimulatedBox,
    channel: Channel,
}

impl RelayOutput for SimRelay {
    fn set(&mut self, level: RelayState) -> Result<(), HardwareError> {
        let mut state = self.sim.lock();
        state.advance(Utc::now());
        match self.channel {
            Channel::Heater => state.heater = level,
            Channel::Fans => state.fans = level,
        }
        Ok(())
    }

    fn get(&self) -> Result<RelayState, HardwareError> {
        let state = self.sim.lock();
        Ok(match self.channel {
            Channel::Heater => state.heater,
            Channel::Fans => state.fans,
        })
    }
}

#[derive(Debug)]
pub struct SimProbes {
    sim: SimulatedBox,
}

impl TemperatureProbes for SimProbes {
    fn read(&mut self) -> Result<Vec<(String, f64)>, SensorReadError> {
        let mut state = self.sim.lock();
        state.advance(Utc::now());
        Ok(vec![
            ("probe_1".to_string(), state.box_temp - PROBE_SPREAD / 2.0),
            ("probe_2".to_string(), state.box_temp + PROBE_SPREAD / 2.0),
        ])
    }
}

#[derive(Debug)]
pub struct SimHumidity {
    sim: SimulatedBox,
}

impl HumiditySensor for SimHumidity {
    fn read(&mut self) -> Result<(f64, f64), SensorReadError> {
        let mut state = self.sim.lock();
        state.advance(Utc::now());
        // Warm air holds more moisture; crude but good enough for the bench.
        let humidity = (90.0 - state.box_temp * 0.8).clamp(5.0, 95.0);
        Ok((state.box_temp, humidity))
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::Duration;

    #[test]
    fn heater_raises_box_temperature() {
        // ---
        let sim = SimulatedBox::new(20.0, 20.0);
        sim.heater_relay().set(RelayState::On).unwrap();

        {
            let mut state = sim.lock();
            let later = state.last_advanced + Duration::seconds(100);
            state.advance(later);
        }

        let temps = sim.probes().read().unwrap();
        assert!(temps.iter().all(|(_, t)| *t > 20.0));
    }

    #[test]
    fn relays_read_back_what_was_set() {
        // ---
        let sim = SimulatedBox::new(20.0, 20.0);
        let mut heater = sim.heater_relay();
        let fans = sim.fan_relay();

        assert_eq!(heater.get().unwrap(), RelayState::Off);
        heater.set(RelayState::On).unwrap();
        assert_eq!(heater.get().unwrap(), RelayState::On);
        // Channels are independent.
        assert_eq!(fans.get().unwrap(), RelayState::Off);
    }
}
