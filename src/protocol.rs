// src/protocol.rs - Line-oriented host command grammar and wire emissions
//
// One ASCII command or response per newline-terminated line. Parsing is pure:
// malformed input never touches controller state.
use thiserror::Error;

use crate::control::{
    ActuatorState, MAX_READ_INTERVAL_MS, MAX_SETTABLE_TEMP, MIN_READ_INTERVAL_MS,
    MIN_SETTABLE_TEMP, Mode,
};
use crate::equalize::Equalized;
use crate::sensor::SensorReading;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetTempRange { min: f64, max: f64 },
    SetFreq { interval_ms: u64 },
    ModeAuto,
    ModeManual,
    ManualHeat,
    ManualCool,
    ManualIdle,
    GetStatus,
    Reinit,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CommandError {
    /// Arity, numeric parse or bounds violation of SET_TEMP_RANGE. Accept
    /// condition: MIN_SETTABLE_TEMP <= min <= max <= MAX_SETTABLE_TEMP.
    #[error("SET_TEMP_RANGE_INVALID")]
    SetTempRangeInvalid,
    /// SET_FREQ outside [1000, 600000] ms or not an integer.
    #[error("SET_FREQ_OUT_OF_RANGE")]
    SetFreqOutOfRange,
    #[error("UNKNOWN_COMMAND")]
    Unknown(String),
}

impl CommandError {
    pub fn code(&self) -> &'static str {
        match self {
            CommandError::SetTempRangeInvalid => "SET_TEMP_RANGE_INVALID",
            CommandError::SetFreqOutOfRange => "SET_FREQ_OUT_OF_RANGE",
            CommandError::Unknown(_) => "UNKNOWN_COMMAND",
        }
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            CommandError::Unknown(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

/// Parse one received line. Split on `=`, then `,`; arity and numeric parse
/// are checked before bounds so the caller sees the specific violated
/// constraint, never a generic failure.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let (name, args) = match line.split_once('=') {
        Some((name, args)) => (name, Some(args)),
        None => (line, None),
    };

    match (name, args) {
        ("SET_TEMP_RANGE", Some(args)) => {
            let mut parts = args.split(',');
            let min = parse_float(parts.next()).ok_or(CommandError::SetTempRangeInvalid)?;
            let max = parse_float(parts.next()).ok_or(CommandError::SetTempRangeInvalid)?;
            if parts.next().is_some() {
                return Err(CommandError::SetTempRangeInvalid);
            }
            if !(MIN_SETTABLE_TEMP..=MAX_SETTABLE_TEMP).contains(&min)
                || !(MIN_SETTABLE_TEMP..=MAX_SETTABLE_TEMP).contains(&max)
                || min > max
            {
                return Err(CommandError::SetTempRangeInvalid);
            }
            Ok(Command::SetTempRange { min, max })
        }
        ("SET_FREQ", Some(args)) => {
            let interval_ms = args
                .trim()
                .parse::<u64>()
                .map_err(|_| CommandError::SetFreqOutOfRange)?;
            if !(MIN_READ_INTERVAL_MS..=MAX_READ_INTERVAL_MS).contains(&interval_ms) {
                return Err(CommandError::SetFreqOutOfRange);
            }
            Ok(Command::SetFreq { interval_ms })
        }
        ("MODE_AUTO", None) => Ok(Command::ModeAuto),
        ("MODE_MANUAL", None) => Ok(Command::ModeManual),
        ("MANUAL_HEAT", None) => Ok(Command::ManualHeat),
        ("MANUAL_COOL", None) => Ok(Command::ManualCool),
        ("MANUAL_IDLE", None) => Ok(Command::ManualIdle),
        ("GET_STATUS", None) => Ok(Command::GetStatus),
        ("REINIT", None) => Ok(Command::Reinit),
        _ => Err(CommandError::Unknown(line.to_string())),
    }
}

fn parse_float(field: Option<&str>) -> Option<f64> {
    field?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Read-only projection of controller state used to format DATA and STATUS
/// lines. Emitted, never retained.
#[derive(Debug, Clone, Copy)]
pub struct TelemetrySnapshot {
    pub uptime_s: f64,
    pub reading: SensorReading,
    pub target_min: f64,
    pub target_max: f64,
    pub state: ActuatorState,
    pub mode: Mode,
    pub read_interval_ms: u64,
    pub eq_active: bool,
    pub eq_started_s: f64,
}

pub fn cmd_recv_line(raw: &str) -> String {
    format!("CMD_RECV,{raw}")
}

pub fn info_line(message: &str) -> String {
    format!("INFO,{message}")
}

pub fn error_line(code: &str, details: Option<&str>) -> String {
    match details {
        Some(details) => format!("ERROR,{code},{details}"),
        None => format!("ERROR,{code}"),
    }
}

pub fn data_line(s: &TelemetrySnapshot) -> String {
    format!(
        "DATA,{:.2},{:.2},{:.2},{:.2},{},{}",
        s.uptime_s,
        s.reading.wire_value(),
        s.target_min,
        s.target_max,
        s.state,
        s.mode
    )
}

pub fn status_line(s: &TelemetrySnapshot) -> String {
    format!(
        "STATUS,{:.2},{:.2},{:.2},{:.2},{},{},{},{},{:.2}",
        s.uptime_s,
        s.reading.wire_value(),
        s.target_min,
        s.target_max,
        s.state,
        s.mode,
        s.read_interval_ms,
        if s.eq_active { "TIMING_EQ" } else { "NOT_TIMING_EQ" },
        s.eq_started_s
    )
}

pub fn equalized_line(e: &Equalized) -> String {
    format!(
        "EQUALIZED,{:.2},{:.2},{:.2}",
        e.target_min, e.target_max, e.duration_s
    )
}
