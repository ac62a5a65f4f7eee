use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::thresholds::ThresholdMode;
use crate::types::{MAX_ERROR, THROTTLE_MS, WINDOW_SIZE};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid window size {size}: needs at least 2 samples")]
    InvalidWindowSize { size: usize },

    #[error("Invalid max error {value}: must be finite and non-negative")]
    InvalidMaxError { value: f32 },

    #[error("Invalid {axis} threshold {value}: must be finite and positive")]
    InvalidThreshold { axis: &'static str, value: f32 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Cómo se mide el error de convergencia de una ventana
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMetric {
    /// max(avg - oldest) por eje, con signo. Los umbrales están ajustados a este.
    #[default]
    SignedMax,
    /// max(|avg - oldest|) por eje
    AbsoluteMax,
}

/// Hacia dónde gira la persona entre la calibración izquierda/derecha
/// y la de arriba/abajo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnDirection {
    /// Pie izquierdo sobre Up, derecho sobre Down
    #[default]
    Clockwise,
    /// Pie derecho sobre Up, izquierdo sobre Down
    CounterClockwise,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PisadasConfig {
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Muestras por pie en la ventana de promedio
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Tolerancia por eje, en metros
    #[serde(default = "default_max_error")]
    pub max_error: f32,
    #[serde(default)]
    pub error_metric: ErrorMetric,
    #[serde(default)]
    pub turn: TurnDirection,
    /// Pausa entre las dos calibraciones (ms)
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub thresholds: ThresholdMode,
    /// Espera mínima entre clasificaciones (ms)
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
}

fn default_window_size() -> usize {
    WINDOW_SIZE
}

fn default_max_error() -> f32 {
    MAX_ERROR
}

fn default_settle_ms() -> u64 {
    2500
}

fn default_throttle_ms() -> u64 {
    THROTTLE_MS
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            max_error: default_max_error(),
            error_metric: ErrorMetric::default(),
            turn: TurnDirection::default(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            thresholds: ThresholdMode::default(),
            throttle_ms: default_throttle_ms(),
        }
    }
}

impl CalibrationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // El contador de influencia arranca en 2
        if self.window_size < 2 {
            return Err(ConfigError::InvalidWindowSize {
                size: self.window_size,
            });
        }
        if !self.max_error.is_finite() || self.max_error < 0.0 {
            return Err(ConfigError::InvalidMaxError {
                value: self.max_error,
            });
        }
        Ok(())
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds.validate()
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

impl PisadasConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.calibration.validate()?;
        self.runtime.validate()
    }

    /// Carga y valida la configuración desde un JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: PisadasConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}
