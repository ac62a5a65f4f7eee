use tracing::{debug, info};

use crate::calibration_window::CalibrationWindow;
use crate::config::{CalibrationConfig, ConfigError, ErrorMetric};
use crate::types::Point3D;

/// Posiciones promediadas de ambos pies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FootPair {
    pub left: Point3D,
    pub right: Point3D,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationResult {
    /// La ventana todavía se está llenando
    Pending,
    Converged(FootPair),
    /// Demasiado error: se descartó la mitad de ambas ventanas
    Diverged,
}

/// Promedia la posición de cada pie hasta que se estabiliza
pub struct FootPointCalibrator {
    left: CalibrationWindow,
    right: CalibrationWindow,
    max_error: f32,
    metric: ErrorMetric,
}

impl FootPointCalibrator {
    pub fn new(config: &CalibrationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            left: CalibrationWindow::new(config.window_size),
            right: CalibrationWindow::new(config.window_size),
            max_error: config.max_error,
            metric: config.error_metric,
        })
    }

    pub fn ingest(&mut self, left_foot: Point3D, right_foot: Point3D) -> CalibrationResult {
        if !self.left.is_full() || !self.right.is_full() {
            self.left.push(left_foot);
            self.right.push(right_foot);
        }

        if !self.left.is_full() {
            return CalibrationResult::Pending;
        }

        let left = match self.check_foot(Foot::Left) {
            Some(average) => average,
            None => return self.diverge(),
        };
        let right = match self.check_foot(Foot::Right) {
            Some(average) => average,
            None => return self.diverge(),
        };

        info!(
            "Calibración convergida: izq=({:.3}, {:.3}, {:.3}) der=({:.3}, {:.3}, {:.3})",
            left.x, left.y, left.z, right.x, right.y, right.z
        );
        CalibrationResult::Converged(FootPair { left, right })
    }

    /// Media del pie si está dentro de tolerancia
    fn check_foot(&self, foot: Foot) -> Option<Point3D> {
        let window = match foot {
            Foot::Left => &self.left,
            Foot::Right => &self.right,
        };
        let (error, average) = window.error(self.metric)?;
        // Un error NaN también es divergencia
        if error.is_nan() || error > self.max_error {
            let oldest = window.oldest().unwrap_or_default();
            debug!(
                foot = foot.label(),
                error,
                "Error de calibración: media=({}, {}, {}) más antigua=({}, {}, {})",
                average.x,
                average.y,
                average.z,
                oldest.x,
                oldest.y,
                oldest.z
            );
            return None;
        }
        Some(average)
    }

    fn diverge(&mut self) -> CalibrationResult {
        // Las dos ventanas se recortan a la vez para seguir sincronizadas
        let half = self.left.capacity() / 2;
        self.left.evict_oldest(half);
        self.right.evict_oldest(half);
        CalibrationResult::Diverged
    }

    pub fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
    }

    /// Muestras acumuladas (iguales para ambos pies)
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
enum Foot {
    Left,
    Right,
}

impl Foot {
    fn label(self) -> &'static str {
        match self {
            Foot::Left => "left",
            Foot::Right => "right",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn calibrator() -> FootPointCalibrator {
        FootPointCalibrator::new(&CalibrationConfig::default()).unwrap()
    }

    /// Ruido determinista de ±1 mm
    fn jitter(i: usize) -> f32 {
        ((i * 7919) % 21) as f32 * 0.0001 - 0.001
    }

    #[test]
    fn test_rejects_tiny_window() {
        let config = CalibrationConfig {
            window_size: 1,
            ..CalibrationConfig::default()
        };
        assert!(matches!(
            FootPointCalibrator::new(&config),
            Err(ConfigError::InvalidWindowSize { size: 1 })
        ));
    }

    #[test]
    fn test_identical_points_converge_after_exactly_n() {
        let mut cal = calibrator();
        let left = Point3D::new(-0.2, 0.1, 1.8);
        let right = Point3D::new(0.2, 0.1, 1.8);

        for _ in 0..149 {
            assert_eq!(cal.ingest(left, right), CalibrationResult::Pending);
        }
        match cal.ingest(left, right) {
            CalibrationResult::Converged(pair) => {
                assert_abs_diff_eq!(pair.left.x, left.x, epsilon = 1e-6);
                assert_abs_diff_eq!(pair.left.y, left.y, epsilon = 1e-6);
                assert_abs_diff_eq!(pair.left.z, left.z, epsilon = 1e-6);
                assert_abs_diff_eq!(pair.right.x, right.x, epsilon = 1e-6);
            }
            other => panic!("esperaba Converged, obtuvo {:?}", other),
        }
    }

    #[test]
    fn test_left_right_scenario_with_noise() {
        let mut cal = calibrator();
        let mut result = CalibrationResult::Pending;
        for i in 0..150 {
            let left = Point3D::new(-0.3 + jitter(i), jitter(i + 3), 2.0 + jitter(i + 5));
            let right = Point3D::new(0.3 + jitter(i + 1), jitter(i + 4), 2.0 + jitter(i + 2));
            result = cal.ingest(left, right);
        }
        let CalibrationResult::Converged(pair) = result else {
            panic!("esperaba Converged, obtuvo {:?}", result);
        };
        assert_abs_diff_eq!(pair.left.x, -0.3, epsilon = 0.002);
        assert_abs_diff_eq!(pair.left.y, 0.0, epsilon = 0.002);
        assert_abs_diff_eq!(pair.left.z, 2.0, epsilon = 0.002);
        assert_abs_diff_eq!(pair.right.x, 0.3, epsilon = 0.002);
        assert_abs_diff_eq!(pair.right.z, 2.0, epsilon = 0.002);
    }

    #[test]
    fn test_divergence_then_recovery() {
        let mut cal = calibrator();
        let stable = Point3D::new(0.0, 0.0, 2.0);
        let right = Point3D::new(0.3, 0.0, 2.0);

        for _ in 0..149 {
            cal.ingest(stable, right);
        }
        // Salto brusco en la última muestra de la ventana
        let jump = Point3D::new(5.0, 0.0, 2.0);
        assert_eq!(cal.ingest(jump, right), CalibrationResult::Diverged);
        assert_eq!(cal.len(), 75);

        let mut diverged = 1;
        let mut converged = None;
        for _ in 0..1000 {
            match cal.ingest(stable, right) {
                CalibrationResult::Diverged => diverged += 1,
                CalibrationResult::Converged(pair) => {
                    converged = Some(pair);
                    break;
                }
                CalibrationResult::Pending => {}
            }
        }
        assert!(diverged >= 1);
        let pair = converged.expect("la calibración debería converger al estabilizarse");
        assert_abs_diff_eq!(pair.left.x, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_right_foot_failure_trims_both_windows() {
        let mut cal = calibrator();
        let left = Point3D::new(-0.3, 0.0, 2.0);
        for i in 0..150 {
            // Pie derecho deslizándose en +x
            let right = Point3D::new(0.3 + i as f32 * 0.01, 0.0, 2.0);
            let result = cal.ingest(left, right);
            if i < 149 {
                assert_eq!(result, CalibrationResult::Pending);
            } else {
                assert_eq!(result, CalibrationResult::Diverged);
            }
        }
        assert_eq!(cal.len(), 75);
    }

    #[test]
    fn test_signed_metric_misses_negative_drift() {
        let drifting = |i: usize| Point3D::new(-0.3, 0.0, 2.0 - i as f32 * 0.01);
        let right = Point3D::new(0.3, 0.0, 2.0);

        let mut signed = calibrator();
        let mut absolute = FootPointCalibrator::new(&CalibrationConfig {
            error_metric: ErrorMetric::AbsoluteMax,
            ..CalibrationConfig::default()
        })
        .unwrap();

        let mut signed_result = CalibrationResult::Pending;
        let mut absolute_result = CalibrationResult::Pending;
        for i in 0..150 {
            signed_result = signed.ingest(drifting(i), right);
            absolute_result = absolute.ingest(drifting(i), right);
        }
        assert!(matches!(signed_result, CalibrationResult::Converged(_)));
        assert_eq!(absolute_result, CalibrationResult::Diverged);
    }

    #[test]
    fn test_reset_clears_progress() {
        let mut cal = calibrator();
        for _ in 0..80 {
            cal.ingest(Point3D::default(), Point3D::default());
        }
        assert_eq!(cal.len(), 80);
        cal.reset();
        assert!(cal.is_empty());
    }

    #[test]
    fn test_nan_sample_never_converges() {
        let mut cal = calibrator();
        let left = Point3D::new(-0.3, 0.0, 2.0);
        let right = Point3D::new(0.3, 0.0, 2.0);

        for i in 0..150 {
            let sample = if i == 10 {
                Point3D::new(f32::NAN, 0.0, 2.0)
            } else {
                left
            };
            let result = cal.ingest(sample, right);
            if i < 149 {
                assert_eq!(result, CalibrationResult::Pending);
            } else {
                assert_eq!(result, CalibrationResult::Diverged);
            }
        }
        // El NaN sale con la mitad descartada y la ventana vuelve a converger
        assert_eq!(cal.len(), 75);
        let mut result = CalibrationResult::Pending;
        for _ in 0..75 {
            result = cal.ingest(left, right);
        }
        let CalibrationResult::Converged(pair) = result else {
            panic!("esperaba Converged, obtuvo {:?}", result);
        };
        assert!(pair.left.is_finite());
        assert_abs_diff_eq!(pair.left.x, -0.3, epsilon = 1e-6);
    }
}
