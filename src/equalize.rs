// src/equalize.rs - Settle-time measurement after setpoint changes
use crate::control::ActuatorState;
use crate::sensor::SensorReading;

/// Range moves smaller than this are floating-point noise, not a new setpoint.
pub const RANGE_CHANGE_TOLERANCE_C: f64 = 0.05;

/// Completed equalization episode, ready to be reported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equalized {
    pub target_min: f64,
    pub target_max: f64,
    pub duration_s: f64,
}

#[derive(Debug, Clone, Copy)]
struct Episode {
    target_min: f64,
    target_max: f64,
    started_ms: u64,
}

/// Measures wall-clock time from a setpoint change until the vessel is back
/// inside the target band with the controller idle. At most one episode at a
/// time; a new trigger overwrites the current one.
#[derive(Debug, Default)]
pub struct EqualizationTracker {
    episode: Option<Episode>,
}

impl EqualizationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.episode.is_some()
    }

    pub fn started_ms(&self) -> Option<u64> {
        self.episode.map(|e| e.started_ms)
    }

    /// Accepted range change while in AUTO mode. Starts (or restarts) timing
    /// when the range actually moved or the vessel sits outside the new
    /// hysteresis window.
    pub fn on_range_change(
        &mut self,
        old: (f64, f64),
        new: (f64, f64),
        reading: SensorReading,
        hysteresis: f64,
        now_ms: u64,
    ) {
        let moved = (new.0 - old.0).abs() > RANGE_CHANGE_TOLERANCE_C
            || (new.1 - old.1).abs() > RANGE_CHANGE_TOLERANCE_C;
        if moved || out_of_window(reading, new, hysteresis) {
            self.start(new, now_ms);
        }
    }

    /// MANUAL -> AUTO transition: time the settle only if the vessel is
    /// actually outside the window. An in-band vessel has nothing to measure.
    pub fn on_auto_resume(
        &mut self,
        range: (f64, f64),
        reading: SensorReading,
        hysteresis: f64,
        now_ms: u64,
    ) {
        if out_of_window(reading, range, hysteresis) {
            self.start(range, now_ms);
        }
    }

    /// Manual operator control invalidates the measurement; no record emitted.
    pub fn cancel(&mut self) {
        if self.episode.take().is_some() {
            tracing::debug!("equalization tracking cancelled");
        }
    }

    /// Checked once per control tick. Completes when a valid reading is inside
    /// the target band and the actuator is idle.
    pub fn check(
        &mut self,
        reading: SensorReading,
        state: ActuatorState,
        now_ms: u64,
    ) -> Option<Equalized> {
        let ep = self.episode?;
        let temp = match reading {
            SensorReading::Valid(t) => t,
            SensorReading::Fault => return None,
        };
        if state == ActuatorState::Idle && temp >= ep.target_min && temp <= ep.target_max {
            self.episode = None;
            return Some(Equalized {
                target_min: ep.target_min,
                target_max: ep.target_max,
                duration_s: now_ms.saturating_sub(ep.started_ms) as f64 / 1000.0,
            });
        }
        None
    }

    fn start(&mut self, range: (f64, f64), now_ms: u64) {
        tracing::info!(
            "equalization timing started for {:.2}-{:.2}C",
            range.0,
            range.1
        );
        self.episode = Some(Episode {
            target_min: range.0,
            target_max: range.1,
            started_ms: now_ms,
        });
    }
}

fn out_of_window(reading: SensorReading, range: (f64, f64), hysteresis: f64) -> bool {
    match reading {
        SensorReading::Valid(t) => t < range.0 - hysteresis || t > range.1 + hysteresis,
        SensorReading::Fault => false,
    }
}
