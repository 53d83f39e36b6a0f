// src/config/mod.rs - TOML configuration
use serde::{Deserialize, Serialize};
use std::fs;
use thiserror::Error;

use crate::control::{
    ControlParams, MAX_READ_INTERVAL_MS, MAX_SETTABLE_TEMP, MIN_READ_INTERVAL_MS,
    MIN_SETTABLE_TEMP,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub controller: ControllerConfig,

    #[serde(default)]
    pub control: ControlConfig,

    #[serde(default)]
    pub link: LinkConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ControllerConfig {
    #[serde(default)]
    pub name: String,
}

/// Default control parameters applied at boot; the host changes them at
/// runtime over the command protocol.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlConfig {
    #[serde(default = "default_target_min")]
    pub target_min: f64,

    #[serde(default = "default_target_max")]
    pub target_max: f64,

    #[serde(default = "default_hysteresis")]
    pub hysteresis: f64,

    #[serde(default = "default_read_interval_ms")]
    pub read_interval_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            target_min: default_target_min(),
            target_max: default_target_max(),
            hysteresis: default_hysteresis(),
            read_interval_ms: default_read_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LinkConfig {
    #[serde(default = "default_serial")]
    pub serial: String,

    #[serde(default = "default_baud")]
    pub baud: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            serial: default_serial(),
            baud: default_baud(),
        }
    }
}

/// Vessel model parameters for the bundled simulation backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    #[serde(default = "default_start_temp")]
    pub start_temp_c: f64,

    #[serde(default = "default_ambient")]
    pub ambient_c: f64,

    #[serde(default = "default_rate")]
    pub heat_rate_c_per_s: f64,

    #[serde(default = "default_rate")]
    pub cool_rate_c_per_s: f64,

    #[serde(default = "default_loss")]
    pub loss_coefficient: f64,

    #[serde(default = "default_noise")]
    pub noise_c: f64,

    #[serde(default = "default_conversion_ms")]
    pub conversion_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_temp_c: default_start_temp(),
            ambient_c: default_ambient(),
            heat_rate_c_per_s: default_rate(),
            cool_rate_c_per_s: default_rate(),
            loss_coefficient: default_loss(),
            noise_c: default_noise(),
            conversion_ms: default_conversion_ms(),
        }
    }
}

fn default_target_min() -> f64 {
    19.0
}

fn default_target_max() -> f64 {
    21.0
}

fn default_hysteresis() -> f64 {
    0.25
}

fn default_read_interval_ms() -> u64 {
    5_000
}

fn default_serial() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baud() -> u32 {
    115_200
}

fn default_start_temp() -> f64 {
    20.0
}

fn default_ambient() -> f64 {
    18.0
}

fn default_rate() -> f64 {
    0.05
}

fn default_loss() -> f64 {
    0.001
}

fn default_noise() -> f64 {
    0.05
}

fn default_conversion_ms() -> u64 {
    750
}

pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let raw = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&raw)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.control;
        if !(MIN_SETTABLE_TEMP..=MAX_SETTABLE_TEMP).contains(&c.target_min)
            || !(MIN_SETTABLE_TEMP..=MAX_SETTABLE_TEMP).contains(&c.target_max)
        {
            return Err(ConfigError::Invalid(format!(
                "target range must lie within {MIN_SETTABLE_TEMP}-{MAX_SETTABLE_TEMP}C"
            )));
        }
        if c.target_min > c.target_max {
            return Err(ConfigError::Invalid(
                "target_min must not exceed target_max".to_string(),
            ));
        }
        if c.hysteresis <= 0.0 {
            return Err(ConfigError::Invalid("hysteresis must be positive".to_string()));
        }
        if !(MIN_READ_INTERVAL_MS..=MAX_READ_INTERVAL_MS).contains(&c.read_interval_ms) {
            return Err(ConfigError::Invalid(format!(
                "read_interval_ms must lie within {MIN_READ_INTERVAL_MS}-{MAX_READ_INTERVAL_MS}"
            )));
        }
        if self.link.serial.is_empty() {
            return Err(ConfigError::Invalid("link serial port must be specified".to_string()));
        }
        if self.link.baud == 0 {
            return Err(ConfigError::Invalid("link baud rate must be positive".to_string()));
        }
        Ok(())
    }

    /// Boot-time control parameters.
    pub fn control_params(&self) -> ControlParams {
        ControlParams::new(
            self.control.target_min,
            self.control.target_max,
            self.control.hysteresis,
            self.control.read_interval_ms,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.control.read_interval_ms, 5_000);
        assert_eq!(config.link.baud, 115_200);
    }

    #[test]
    fn parses_toml_sections() {
        let raw = r#"
[controller]
name = "ferment-cellar"

[control]
target_min = 24.0
target_max = 26.0
hysteresis = 0.25
read_interval_ms = 2000

[link]
serial = "/dev/ttyACM0"
baud = 115200

[simulation]
start_temp_c = 30.0
ambient_c = 22.0
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.controller.name, "ferment-cellar");
        assert_eq!(config.control.target_min, 24.0);
        assert_eq!(config.link.serial, "/dev/ttyACM0");
        assert_eq!(config.simulation.start_temp_c, 30.0);
        // unspecified fields fall back to defaults
        assert_eq!(config.simulation.conversion_ms, 750);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        let mut config = Config::default();
        config.control.target_min = 30.0;
        config.control.target_max = 20.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.control.target_max = 80.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.control.read_interval_ms = 500;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.control.hysteresis = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_config_round_trips_through_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[control]\ntarget_min = 18.0\ntarget_max = 20.0\nread_interval_ms = 60000"
        )
        .unwrap();
        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.control.target_min, 18.0);
        assert_eq!(config.control.read_interval_ms, 60_000);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            load_config("/nonexistent/fermasense.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
