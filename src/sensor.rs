// src/sensor.rs - Non-blocking sensor reader over the two-phase probe protocol
use crate::hardware::{HardwareError, MAX_CONVERSION_MS, TemperatureProbe};
use tokio::time::{Duration, Instant, sleep};

/// Wire sentinel the downstream dashboard understands for a failed reading.
pub const FAULT_SENTINEL: f64 = -127.0;

/// Physical envelope of the probe. Anything outside is a fault, including the
/// -127 sentinel a disconnected DS18B20 reports.
pub const PROBE_MIN_C: f64 = -50.0;
pub const PROBE_MAX_C: f64 = 120.0;

/// A temperature reading. Fault is a valid return variant, not an error path;
/// it persists until a successful read replaces it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorReading {
    Valid(f64),
    Fault,
}

impl SensorReading {
    pub fn is_fault(&self) -> bool {
        matches!(self, SensorReading::Fault)
    }

    /// Value as printed on the wire.
    pub fn wire_value(&self) -> f64 {
        match self {
            SensorReading::Valid(t) => *t,
            SensorReading::Fault => FAULT_SENTINEL,
        }
    }
}

/// Polls the probe without ever blocking the control loop. A conversion is
/// always in flight: completing one immediately re-issues the next, so probe
/// latency is hidden from the tick cadence and early polls return the cached
/// last-known-good value.
pub struct SensorReader<P: TemperatureProbe> {
    probe: P,
    cached: SensorReading,
}

impl<P: TemperatureProbe> SensorReader<P> {
    pub fn new(probe: P) -> Self {
        Self {
            probe,
            cached: SensorReading::Fault,
        }
    }

    /// Boot-time probe detection: wait up to the conversion ceiling for one
    /// completed, in-envelope reading. Firmware startup halts on failure.
    pub async fn initialize(&mut self) -> Result<(), HardwareError> {
        self.probe.request_conversion()?;
        let deadline = Instant::now() + Duration::from_millis(MAX_CONVERSION_MS);
        loop {
            if let Some(raw) = self.probe.try_complete() {
                self.cached = validate(raw);
                if self.cached.is_fault() {
                    return Err(HardwareError::ProbeNotFound);
                }
                self.probe.request_conversion()?;
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(HardwareError::ProbeNotFound);
            }
            sleep(Duration::from_millis(10)).await;
        }
    }

    /// Returns immediately. If the in-flight conversion has completed, the
    /// result is validated, cached and a new conversion is started; otherwise
    /// the previous cached reading is returned.
    pub fn poll_and_read(&mut self) -> SensorReading {
        if let Some(raw) = self.probe.try_complete() {
            self.cached = validate(raw);
            if let Err(e) = self.probe.request_conversion() {
                tracing::warn!("failed to restart conversion: {}", e);
                self.cached = SensorReading::Fault;
            }
        }
        self.cached
    }

    /// Last cached reading without touching the probe.
    pub fn last(&self) -> SensorReading {
        self.cached
    }

    /// Re-arm the probe with a fresh conversion request (REINIT path). The
    /// cached reading stays valid until the new conversion completes.
    pub fn rearm(&mut self) -> Result<(), HardwareError> {
        self.probe.request_conversion()
    }
}

fn validate(raw: f64) -> SensorReading {
    if raw < PROBE_MIN_C || raw > PROBE_MAX_C || !raw.is_finite() {
        SensorReading::Fault
    } else {
        SensorReading::Valid(raw)
    }
}
