//! Closed-loop temperature controller for a garlic curing box.
//!
//! Two DS18B20-class probes and one humidity sensor feed a hysteresis state
//! machine driving a heater relay and a fan relay. The crate's correctness
//! is measured in hardware terms: no relay chatter, the heater is never left
//! on unattended, and sensor dropout degrades gracefully instead of
//! destabilizing the outputs.
//!
//! Physical drivers are external: the control logic talks to the capability
//! traits in [`hardware`], with [`sim`] providing a bench-top stand-in.

pub mod config;
pub mod error;
pub mod fans;
pub mod hardware;
pub mod models;
pub mod runtime;
pub mod schema;
pub mod sensors;
pub mod sim;
pub mod store;
pub mod supervisor;
pub mod thermostat;

pub use config::Config;
pub use error::ControlError;
pub use models::{DutyCycle, HumidityReading, ProbeReading, RelayState, Thresholds};
