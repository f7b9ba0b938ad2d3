//! Hardware capability traits.
//!
//! The control logic never touches GPIO directly; it talks to these traits so
//! the state machine runs unchanged against physical drivers, the bench
//! simulator in [`crate::sim`], or scripted test doubles. Physical DS18B20 /
//! DHT20 / relay drivers live outside this crate and implement these traits.

use crate::error::{HardwareError, SensorReadError};
use crate::models::RelayState;

// ---

/// A single digital relay output.
///
/// `get()` is authoritative: callers read the level back instead of caching
/// it, so logical and physical state cannot diverge.
pub trait RelayOutput {
    fn set(&mut self, level: RelayState) -> Result<(), HardwareError>;
    fn get(&self) -> Result<RelayState, HardwareError>;
}

/// The temperature probe bus. One read returns every responding probe as a
/// `(probe_id, temperature °C)` pair; dropout shows up as missing entries.
pub trait TemperatureProbes {
    fn read(&mut self) -> Result<Vec<(String, f64)>, SensorReadError>;
}

/// The combined temperature/humidity sensor, returning
/// `(temperature °C, relative humidity %)`.
pub trait HumiditySensor {
    fn read(&mut self) -> Result<(f64, f64), SensorReadError>;
}

/// In-memory relay with perfect readback. Backs the unit tests and any
/// composition that needs a relay without hardware attached.
#[derive(Debug)]
pub struct MemoryRelay {
    level: RelayState,
}

impl MemoryRelay {
    pub fn new() -> Self {
        Self {
            level: RelayState::Off,
        }
    }
}

impl Default for MemoryRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayOutput for MemoryRelay {
    fn set(&mut self, level: RelayState) -> Result<(), HardwareError> {
        self.level = level;
        Ok(())
    }

    fn get(&self) -> Result<RelayState, HardwareError> {
        Ok(self.level)
    }
}
