// src/display.rs - Two-line local status panel
use std::sync::{Arc, Mutex};

use crate::control::{ActuatorState, ControlParams};
use crate::sensor::SensorReading;

/// The two-line summary shown on the local display: mode + actuator state,
/// then current temperature + target range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFrame {
    pub line1: String,
    pub line2: String,
}

pub fn render_frame(
    params: &ControlParams,
    state: ActuatorState,
    reading: SensorReading,
) -> DisplayFrame {
    let line1 = format!("{} {}", params.mode, state);
    let line2 = match reading {
        SensorReading::Valid(t) => format!(
            "{:.1}C [{:.1}-{:.1}]",
            t, params.target_min, params.target_max
        ),
        SensorReading::Fault => format!(
            "PROBE FAULT [{:.1}-{:.1}]",
            params.target_min, params.target_max
        ),
    };
    DisplayFrame { line1, line2 }
}

pub trait StatusDisplay: Send {
    fn render(&mut self, frame: &DisplayFrame);
}

/// Logs the panel content; stands in for a physical two-line display.
pub struct ConsoleDisplay;

impl StatusDisplay for ConsoleDisplay {
    fn render(&mut self, frame: &DisplayFrame) {
        tracing::info!(target: "display", "{} | {}", frame.line1, frame.line2);
    }
}

/// Records every rendered frame; used by tests to assert refresh behavior.
#[derive(Default)]
pub struct CapturingDisplay {
    frames: Arc<Mutex<Vec<DisplayFrame>>>,
}

impl CapturingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Arc<Mutex<Vec<DisplayFrame>>> {
        self.frames.clone()
    }
}

impl StatusDisplay for CapturingDisplay {
    fn render(&mut self, frame: &DisplayFrame) {
        self.frames.lock().unwrap().push(frame.clone());
    }
}
