use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::types::{Point3D, ReferenceSet, FIXED_HORIZONTAL_THRESHOLD, FIXED_VERTICAL_THRESHOLD};

/// Distancia en el plano x/y
pub fn horizontal_distance(a: Point3D, b: Point3D) -> f32 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

pub fn vertical_distance(a: Point3D, b: Point3D) -> f32 {
    (a.y - b.y).abs()
}

/// Distancias máximas para considerar un pie "sobre" una zona
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub horizontal: f32,
    pub vertical: f32,
}

impl Thresholds {
    pub fn new(horizontal: f32, vertical: f32) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    /// Umbrales derivados de la geometría del pad calibrado
    pub fn compute(up: Point3D, right: Point3D, down: Point3D, left: Point3D) -> Self {
        let from_up = horizontal_distance(up, right).min(horizontal_distance(up, left));
        let from_down = horizontal_distance(down, right).min(horizontal_distance(down, left));
        let horizontal = from_up.min(from_down).abs();

        let vertical = vertical_distance(up, down).min(vertical_distance(left, right)) / 4.0;

        Self {
            horizontal,
            vertical,
        }
    }

    pub fn from_references(refs: &ReferenceSet) -> Self {
        Self::compute(refs.up, refs.right, refs.down, refs.left)
    }
}

/// Política de umbrales en tiempo de ejecución
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Calculados a partir de los puntos de referencia
    Derived,
    /// Valores fijos; empíricamente más fiables que los derivados
    Fixed { horizontal: f32, vertical: f32 },
}

impl Default for ThresholdMode {
    fn default() -> Self {
        ThresholdMode::Fixed {
            horizontal: FIXED_HORIZONTAL_THRESHOLD,
            vertical: FIXED_VERTICAL_THRESHOLD,
        }
    }
}

impl ThresholdMode {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let ThresholdMode::Fixed {
            horizontal,
            vertical,
        } = *self
        {
            for (axis, value) in [("horizontal", horizontal), ("vertical", vertical)] {
                if !value.is_finite() || value <= 0.0 {
                    return Err(ConfigError::InvalidThreshold { axis, value });
                }
            }
        }
        Ok(())
    }

    pub fn resolve(&self, refs: &ReferenceSet) -> Thresholds {
        match *self {
            ThresholdMode::Derived => Thresholds::from_references(refs),
            ThresholdMode::Fixed {
                horizontal,
                vertical,
            } => Thresholds::new(horizontal, vertical),
        }
    }
}
