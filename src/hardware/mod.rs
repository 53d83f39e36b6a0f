// src/hardware/mod.rs - Hardware trait seams and errors
pub mod serial;

use thiserror::Error;

use crate::control::ActuatorState;

/// Upper bound on a probe conversion at the configured resolution. Reads
/// arriving before readiness return cached data instead of waiting.
pub const MAX_CONVERSION_MS: u64 = 1_000;

#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("temperature probe not found")]
    ProbeNotFound,
    #[error("probe bus error: {0}")]
    Bus(String),
    #[error("actuator output error: {0}")]
    Output(String),
    #[error("host link error: {0}")]
    Link(String),
}

/// Two-phase, non-blocking temperature probe. A conversion is requested, then
/// polled for readiness; there is no cancellation, a request either completes
/// or is superseded by the next one.
pub trait TemperatureProbe: Send {
    fn request_conversion(&mut self) -> Result<(), HardwareError>;

    /// The completed raw reading in degrees C, or None while still converting.
    /// Raw values are unvalidated; envelope checks live in the sensor reader.
    fn try_complete(&mut self) -> Option<f64>;
}

/// Heating/cooling output pair. `apply` is idempotent and must be atomic from
/// the caller's perspective: the opposing output is cleared alongside the new
/// assertion, with no observable both-active intermediate state.
pub trait ActuatorOutputs: Send {
    fn apply(&mut self, state: ActuatorState) -> Result<(), HardwareError>;
}
