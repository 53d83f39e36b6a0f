// src/controller.rs - Controller context and cooperative control loop
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Duration;

use crate::clock::Clock;
use crate::control::{self, ActuatorState, ControlParams, Mode};
use crate::display::{StatusDisplay, render_frame};
use crate::equalize::EqualizationTracker;
use crate::hardware::{ActuatorOutputs, HardwareError, TemperatureProbe};
use crate::protocol::{self, Command, TelemetrySnapshot};
use crate::sensor::{SensorReader, SensorReading};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("hardware error: {0}")]
    Hardware(#[from] HardwareError),
    #[error("host link closed")]
    LinkClosed,
}

/// Explicit context owning every piece of mutable control state. All
/// mutation happens from the single loop task, so a command's effects are
/// atomic relative to the next tick by construction.
pub struct Controller<P: TemperatureProbe, A: ActuatorOutputs, D: StatusDisplay> {
    params: ControlParams,
    state: ActuatorState,
    reader: SensorReader<P>,
    outputs: A,
    display: D,
    tracker: EqualizationTracker,
    clock: Arc<dyn Clock>,
    line_tx: mpsc::UnboundedSender<String>,
    last_tick_ms: Option<u64>,
    last_reading: SensorReading,
}

impl<P: TemperatureProbe, A: ActuatorOutputs, D: StatusDisplay> Controller<P, A, D> {
    pub fn new(
        params: ControlParams,
        probe: P,
        outputs: A,
        display: D,
        clock: Arc<dyn Clock>,
        line_tx: mpsc::UnboundedSender<String>,
    ) -> Self {
        Self {
            params,
            state: ActuatorState::Idle,
            reader: SensorReader::new(probe),
            outputs,
            display,
            tracker: EqualizationTracker::new(),
            clock,
            line_tx,
            last_tick_ms: None,
            last_reading: SensorReading::Fault,
        }
    }

    /// Boot: detect the probe, force outputs idle, draw the first frame. A
    /// missing probe is unrecoverable without physical intervention.
    pub async fn initialize(&mut self) -> Result<(), ControllerError> {
        if let Err(e) = self.reader.initialize().await {
            self.emit(protocol::error_line("DS18B20_NOT_FOUND", None));
            tracing::error!("temperature probe not detected, halting: {}", e);
            return Err(e.into());
        }
        self.last_reading = self.reader.last();
        self.outputs.apply(ActuatorState::Idle)?;
        self.refresh_display();
        tracing::info!("probe detected, controller initialized");
        Ok(())
    }

    /// One inbound host line: echo, parse, validate, apply. Accepted mutating
    /// commands re-evaluate the state machine and refresh the display before
    /// returning, so they are never invisible until the next scheduled tick.
    pub fn handle_line(&mut self, raw: &str) -> Result<(), ControllerError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(());
        }
        self.emit(protocol::cmd_recv_line(raw));
        match protocol::parse_command(raw) {
            Ok(cmd) => self.apply_command(cmd)?,
            Err(e) => {
                tracing::warn!("rejected command '{}': {}", raw, e.code());
                self.emit(protocol::error_line(e.code(), e.details()));
            }
        }
        Ok(())
    }

    fn apply_command(&mut self, cmd: Command) -> Result<(), ControllerError> {
        let now = self.clock.uptime_ms();
        match cmd {
            Command::SetTempRange { min, max } => {
                let old = (self.params.target_min, self.params.target_max);
                self.params.target_min = min;
                self.params.target_max = max;
                self.emit(protocol::info_line(&format!(
                    "Temperature range set to {min:.2}-{max:.2}C"
                )));
                if self.params.mode == Mode::Auto {
                    self.tracker.on_range_change(
                        old,
                        (min, max),
                        self.last_reading,
                        self.params.hysteresis,
                        now,
                    );
                }
            }
            Command::SetFreq { interval_ms } => {
                self.params.read_interval_ms = interval_ms;
                self.emit(protocol::info_line(&format!(
                    "Read interval set to {interval_ms} ms"
                )));
            }
            Command::ModeAuto => {
                if self.params.mode != Mode::Auto {
                    self.params.mode = Mode::Auto;
                    self.tracker.on_auto_resume(
                        (self.params.target_min, self.params.target_max),
                        self.last_reading,
                        self.params.hysteresis,
                        now,
                    );
                }
                self.emit(protocol::info_line("Mode set to AUTO"));
            }
            Command::ModeManual => {
                self.params.mode = Mode::Manual;
                self.params.manual_override = ActuatorState::Idle;
                self.tracker.cancel();
                self.emit(protocol::info_line("Mode set to MANUAL, output IDLE"));
            }
            Command::ManualHeat | Command::ManualCool | Command::ManualIdle => {
                let (name, wanted) = match cmd {
                    Command::ManualHeat => ("MANUAL_HEAT", ActuatorState::Heating),
                    Command::ManualCool => ("MANUAL_COOL", ActuatorState::Cooling),
                    _ => ("MANUAL_IDLE", ActuatorState::Idle),
                };
                if self.params.mode != Mode::Manual {
                    self.emit(protocol::error_line(
                        "MANUAL_CMD_INVALID",
                        Some(&format!("{name} only valid in MANUAL mode")),
                    ));
                    return Ok(());
                }
                self.params.manual_override = wanted;
                self.emit(protocol::info_line(&format!("Manual override set to {wanted}")));
            }
            Command::GetStatus => {
                self.emit(self.status_line());
                self.refresh_display();
                return Ok(());
            }
            Command::Reinit => return self.reinit(),
        }
        self.reevaluate()
    }

    /// Reset to AUTO/IDLE and re-arm the probe; answers with STATUS. Target
    /// range and read interval are operator configuration and survive.
    fn reinit(&mut self) -> Result<(), ControllerError> {
        tracing::info!("reinitializing controller");
        self.params.mode = Mode::Auto;
        self.params.manual_override = ActuatorState::Idle;
        self.tracker.cancel();
        self.apply_state(ActuatorState::Idle)?;
        self.reader.rearm()?;
        self.emit(protocol::info_line("Reinitialized"));
        self.emit(self.status_line());
        self.refresh_display();
        Ok(())
    }

    /// Whether a control tick is due under the configured read interval.
    pub fn tick_due(&self) -> bool {
        match self.last_tick_ms {
            None => true,
            Some(t) => self.clock.uptime_ms().saturating_sub(t) >= self.params.read_interval_ms,
        }
    }

    /// One control tick: poll the sensor, decide, apply, report.
    pub fn tick(&mut self) -> Result<(), ControllerError> {
        let now = self.clock.uptime_ms();
        self.last_tick_ms = Some(now);

        let reading = self.reader.poll_and_read();
        self.last_reading = reading;
        if reading.is_fault() {
            // fail-safe is applied below; retried every cycle
            self.emit(protocol::error_line("TEMP_SENSOR_READ_FAILED", None));
        }

        let next = control::decide(reading, &self.params, self.state);
        self.apply_state(next)?;

        self.emit(protocol::data_line(&self.snapshot()));

        if let Some(eq) = self.tracker.check(reading, self.state, now) {
            tracing::info!(
                "equalized to {:.2}-{:.2}C in {:.2}s",
                eq.target_min,
                eq.target_max,
                eq.duration_s
            );
            self.emit(protocol::equalized_line(&eq));
        }

        self.refresh_display();
        Ok(())
    }

    /// Cooperative loop: at most one host line per iteration, interleaved
    /// with timer-gated control ticks. No locks; this task is the sole writer
    /// of all control state.
    pub async fn run(
        &mut self,
        mut line_rx: mpsc::UnboundedReceiver<String>,
    ) -> Result<(), ControllerError> {
        loop {
            let now = self.clock.uptime_ms();
            let wait_ms = match self.last_tick_ms {
                None => 0,
                Some(t) => self
                    .params
                    .read_interval_ms
                    .saturating_sub(now.saturating_sub(t)),
            };

            tokio::select! {
                line = line_rx.recv() => {
                    match line {
                        Some(line) => self.handle_line(&line)?,
                        None => return Err(ControllerError::LinkClosed),
                    }
                }
                _ = tokio::time::sleep(Duration::from_millis(wait_ms)) => {
                    if self.tick_due() {
                        self.tick()?;
                    }
                }
            }
        }
    }

    fn reevaluate(&mut self) -> Result<(), ControllerError> {
        let next = control::decide(self.last_reading, &self.params, self.state);
        self.apply_state(next)?;
        self.refresh_display();
        Ok(())
    }

    fn apply_state(&mut self, next: ActuatorState) -> Result<(), ControllerError> {
        if next != self.state {
            tracing::info!("actuator {} -> {}", self.state, next);
        }
        // idempotent; opposing output cleared within the same apply
        self.outputs.apply(next)?;
        self.state = next;
        Ok(())
    }

    fn refresh_display(&mut self) {
        let frame = render_frame(&self.params, self.state, self.last_reading);
        self.display.render(&frame);
    }

    fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            uptime_s: self.clock.uptime_ms() as f64 / 1000.0,
            reading: self.last_reading,
            target_min: self.params.target_min,
            target_max: self.params.target_max,
            state: self.state,
            mode: self.params.mode,
            read_interval_ms: self.params.read_interval_ms,
            eq_active: self.tracker.is_active(),
            eq_started_s: self
                .tracker
                .started_ms()
                .map(|ms| ms as f64 / 1000.0)
                .unwrap_or(0.0),
        }
    }

    fn status_line(&self) -> String {
        protocol::status_line(&self.snapshot())
    }

    fn emit(&self, line: String) {
        if self.line_tx.send(line).is_err() {
            tracing::warn!("host link receiver dropped, emission lost");
        }
    }

    pub fn params(&self) -> &ControlParams {
        &self.params
    }

    pub fn state(&self) -> ActuatorState {
        self.state
    }

    pub fn equalization_active(&self) -> bool {
        self.tracker.is_active()
    }
}
