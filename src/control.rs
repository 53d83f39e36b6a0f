// src/control.rs - Hysteresis-banded bang-bang control policy
use std::fmt;

use crate::sensor::SensorReading;

pub const MIN_SETTABLE_TEMP: f64 = 4.0;
pub const MAX_SETTABLE_TEMP: f64 = 50.0;
pub const MIN_READ_INTERVAL_MS: u64 = 1_000;
pub const MAX_READ_INTERVAL_MS: u64 = 600_000;

/// Actuator output. Mutually exclusive: at most one of the heat/cool outputs
/// is active at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorState {
    Idle,
    Heating,
    Cooling,
}

impl ActuatorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActuatorState::Idle => "IDLE",
            ActuatorState::Heating => "HEATING",
            ActuatorState::Cooling => "COOLING",
        }
    }
}

impl fmt::Display for ActuatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Auto,
    Manual,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Auto => "AUTO",
            Mode::Manual => "MANUAL",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared control parameters. Owned by the controller context; mutated only
/// through accepted commands.
#[derive(Debug, Clone)]
pub struct ControlParams {
    pub target_min: f64,
    pub target_max: f64,
    pub hysteresis: f64,
    pub read_interval_ms: u64,
    pub mode: Mode,
    pub manual_override: ActuatorState,
}

impl ControlParams {
    pub fn new(target_min: f64, target_max: f64, hysteresis: f64, read_interval_ms: u64) -> Self {
        Self {
            target_min,
            target_max,
            hysteresis,
            read_interval_ms,
            mode: Mode::Auto,
            manual_override: ActuatorState::Idle,
        }
    }
}

/// Pure control decision, evaluated once per control tick and after any
/// state-affecting command.
///
/// Priority order:
/// 1. a faulted reading forces IDLE regardless of mode,
/// 2. MANUAL mode outputs the operator override verbatim,
/// 3. AUTO applies the two-sided hysteresis window around the target range.
///
/// Inside the dead zones (min-h, min) and (max, max+h) the previous state is
/// held so the actuator never chatters at a band edge.
pub fn decide(reading: SensorReading, params: &ControlParams, prev: ActuatorState) -> ActuatorState {
    let temp = match reading {
        SensorReading::Valid(t) => t,
        SensorReading::Fault => return ActuatorState::Idle,
    };

    if params.mode == Mode::Manual {
        return params.manual_override;
    }

    if temp < params.target_min - params.hysteresis {
        ActuatorState::Heating
    } else if temp > params.target_max + params.hysteresis {
        ActuatorState::Cooling
    } else if temp >= params.target_min && temp <= params.target_max {
        ActuatorState::Idle
    } else {
        prev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(min: f64, max: f64, h: f64) -> ControlParams {
        ControlParams::new(min, max, h, 5_000)
    }

    #[test]
    fn walkthrough_24_26_band() {
        let p = params(24.0, 26.0, 0.25);
        let mut state = ActuatorState::Idle;

        state = decide(SensorReading::Valid(23.5), &p, state);
        assert_eq!(state, ActuatorState::Heating);

        // dead zone between min-h and min: keep heating
        state = decide(SensorReading::Valid(23.9), &p, state);
        assert_eq!(state, ActuatorState::Heating);

        state = decide(SensorReading::Valid(24.0), &p, state);
        assert_eq!(state, ActuatorState::Idle);

        state = decide(SensorReading::Valid(26.3), &p, state);
        assert_eq!(state, ActuatorState::Cooling);

        state = decide(SensorReading::Valid(26.0), &p, state);
        assert_eq!(state, ActuatorState::Idle);
    }

    #[test]
    fn dead_zone_holds_across_repeated_evaluations() {
        let p = params(24.0, 26.0, 0.25);
        for prev in [ActuatorState::Idle, ActuatorState::Heating, ActuatorState::Cooling] {
            for temp in [23.8, 23.99, 26.01, 26.2] {
                let mut state = prev;
                for _ in 0..10 {
                    state = decide(SensorReading::Valid(temp), &p, state);
                    assert_eq!(state, prev, "chatter at {temp} from {prev:?}");
                }
            }
        }
    }

    #[test]
    fn fault_forces_idle_even_in_manual() {
        let mut p = params(20.0, 22.0, 0.25);
        p.mode = Mode::Manual;
        p.manual_override = ActuatorState::Heating;
        assert_eq!(
            decide(SensorReading::Fault, &p, ActuatorState::Heating),
            ActuatorState::Idle
        );
    }

    #[test]
    fn manual_override_is_verbatim() {
        let mut p = params(20.0, 22.0, 0.25);
        p.mode = Mode::Manual;
        for wanted in [ActuatorState::Idle, ActuatorState::Heating, ActuatorState::Cooling] {
            p.manual_override = wanted;
            // temperature is ignored in manual mode
            assert_eq!(decide(SensorReading::Valid(40.0), &p, ActuatorState::Idle), wanted);
        }
    }

    #[test]
    fn band_edges_are_idle() {
        let p = params(24.0, 26.0, 0.25);
        assert_eq!(
            decide(SensorReading::Valid(24.0), &p, ActuatorState::Heating),
            ActuatorState::Idle
        );
        assert_eq!(
            decide(SensorReading::Valid(26.0), &p, ActuatorState::Cooling),
            ActuatorState::Idle
        );
    }
}
