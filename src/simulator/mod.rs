// src/simulator/mod.rs - Vessel thermal model and simulated hardware backends
use std::sync::{Arc, Mutex};

use rand::Rng;

use crate::clock::Clock;
use crate::control::ActuatorState;
use crate::hardware::{ActuatorOutputs, HardwareError, TemperatureProbe};
use crate::sensor::FAULT_SENTINEL;

/// First-order vessel physics: exponential drift toward ambient plus a
/// constant rate while an actuator output is asserted.
#[derive(Debug)]
pub struct VesselModel {
    pub temperature_c: f64,
    pub ambient_c: f64,
    pub heat_rate_c_per_s: f64,
    pub cool_rate_c_per_s: f64,
    /// Fraction of the vessel/ambient delta lost per second.
    pub loss_coefficient: f64,
    pub probe_connected: bool,
    actuator: ActuatorState,
}

impl VesselModel {
    pub fn new(start_temp_c: f64, ambient_c: f64) -> Self {
        Self {
            temperature_c: start_temp_c,
            ambient_c,
            heat_rate_c_per_s: 0.05,
            cool_rate_c_per_s: 0.05,
            loss_coefficient: 0.001,
            probe_connected: true,
            actuator: ActuatorState::Idle,
        }
    }

    pub fn set_actuator(&mut self, state: ActuatorState) {
        self.actuator = state;
    }

    pub fn actuator(&self) -> ActuatorState {
        self.actuator
    }

    /// Advance the physics by `dt_s` seconds.
    pub fn step(&mut self, dt_s: f64) {
        self.temperature_c += (self.ambient_c - self.temperature_c) * self.loss_coefficient * dt_s;
        match self.actuator {
            ActuatorState::Heating => self.temperature_c += self.heat_rate_c_per_s * dt_s,
            ActuatorState::Cooling => self.temperature_c -= self.cool_rate_c_per_s * dt_s,
            ActuatorState::Idle => {}
        }
    }
}

pub type SharedVessel = Arc<Mutex<VesselModel>>;

pub fn shared_vessel(model: VesselModel) -> SharedVessel {
    Arc::new(Mutex::new(model))
}

/// Simulated digital probe with DS18B20-like conversion latency. A
/// disconnected probe completes with the -127 sentinel, the same thing the
/// real part reports on a dead bus.
pub struct SimulatedProbe {
    vessel: SharedVessel,
    clock: Arc<dyn Clock>,
    conversion_ms: u64,
    noise_c: f64,
    started_at_ms: Option<u64>,
}

impl SimulatedProbe {
    pub fn new(vessel: SharedVessel, clock: Arc<dyn Clock>, conversion_ms: u64, noise_c: f64) -> Self {
        Self {
            vessel,
            clock,
            conversion_ms,
            noise_c,
            started_at_ms: None,
        }
    }
}

impl TemperatureProbe for SimulatedProbe {
    fn request_conversion(&mut self) -> Result<(), HardwareError> {
        self.started_at_ms = Some(self.clock.uptime_ms());
        Ok(())
    }

    fn try_complete(&mut self) -> Option<f64> {
        let started = self.started_at_ms?;
        if self.clock.uptime_ms().saturating_sub(started) < self.conversion_ms {
            return None;
        }
        self.started_at_ms = None;
        let vessel = self.vessel.lock().unwrap();
        if !vessel.probe_connected {
            return Some(FAULT_SENTINEL);
        }
        let noise = if self.noise_c > 0.0 {
            rand::rng().random_range(-self.noise_c..self.noise_c)
        } else {
            0.0
        };
        Some(vessel.temperature_c + noise)
    }
}

/// Simulated heat/cool output pair. Both pins are written in one apply call
/// and every written pair is recorded so tests can assert the
/// mutual-exclusion invariant over a whole run.
pub struct SimulatedOutputs {
    vessel: SharedVessel,
    history: Arc<Mutex<Vec<(bool, bool)>>>,
}

impl SimulatedOutputs {
    pub fn new(vessel: SharedVessel) -> Self {
        Self {
            vessel,
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the recorded (heat_on, cool_on) pairs.
    pub fn history(&self) -> Arc<Mutex<Vec<(bool, bool)>>> {
        self.history.clone()
    }
}

impl ActuatorOutputs for SimulatedOutputs {
    fn apply(&mut self, state: ActuatorState) -> Result<(), HardwareError> {
        let (heat_on, cool_on) = match state {
            ActuatorState::Heating => (true, false),
            ActuatorState::Cooling => (false, true),
            ActuatorState::Idle => (false, false),
        };
        self.history.lock().unwrap().push((heat_on, cool_on));
        self.vessel.lock().unwrap().set_actuator(state);
        Ok(())
    }
}
