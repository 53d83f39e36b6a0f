//! FermaSense: closed-loop fermentation vessel temperature control.
//!
//! A hysteresis-banded bang-bang controller driving a heating/cooling
//! actuator pair, with a line-oriented host command protocol, equalization
//! time instrumentation and a small two-line status display. Hardware access
//! goes through traits so the control core runs unchanged against the
//! bundled vessel simulation or a real probe/output backend.

pub mod clock;
pub mod config;
pub mod control;
pub mod controller;
pub mod display;
pub mod equalize;
pub mod hardware;
pub mod protocol;
pub mod sensor;
pub mod simulator;

pub use control::{ActuatorState, ControlParams, Mode, decide};
pub use controller::{Controller, ControllerError};
pub use sensor::SensorReading;
