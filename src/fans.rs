//! Fan relay control.
//!
//! Fans follow the heater, then keep running for a grace period after it
//! turns off to spread the residual coil heat through the box.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::HardwareError;
use crate::hardware::RelayOutput;
use crate::models::RelayState;

// ---

/// How long fans keep running after the heater turns off.
pub const FAN_GRACE_SECS: i64 = 60;

pub struct FanController<F: RelayOutput> {
    relay: F,
}

impl<F: RelayOutput> FanController<F> {
    pub fn new(relay: F) -> Self {
        Self { relay }
    }

    /// Settle the fan relay against the heater state.
    ///
    /// Heater on: fans on. Heater off: fans stay on until `FAN_GRACE_SECS`
    /// have elapsed since the last heater transition, then turn off. Already
    /// matching relay levels are left untouched.
    pub fn settle(
        &mut self,
        heater: RelayState,
        heater_ts: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), HardwareError> {
        // ---
        let fans = self.relay.get()?;
        match (heater, fans) {
            (RelayState::On, RelayState::Off) => {
                info!("Turn on fans.");
                self.relay.set(RelayState::On)
            }
            (RelayState::Off, RelayState::On) => {
                if (now - heater_ts).num_seconds() >= FAN_GRACE_SECS {
                    info!("Fans have run for a minute, turn off.");
                    self.relay.set(RelayState::Off)
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }

    /// Unconditionally ensure the fans are running (divergence override and
    /// shutdown cooldown). No-op if already on.
    pub fn force_on(&mut self) -> Result<(), HardwareError> {
        // ---
        if self.relay.get()? == RelayState::On {
            return Ok(());
        }
        info!("Turn on fans.");
        self.relay.set(RelayState::On)
    }

    /// Drop the fan relay, used when initializing and releasing hardware.
    pub fn force_off(&mut self) -> Result<(), HardwareError> {
        // ---
        if self.relay.get()? == RelayState::Off {
            return Ok(());
        }
        self.relay.set(RelayState::Off)
    }

    pub fn state(&self) -> Result<RelayState, HardwareError> {
        self.relay.get()
    }
}
