use std::collections::VecDeque;

use crate::config::ErrorMetric;
use crate::types::Point3D;

/// Ventana FIFO acotada con las últimas posiciones de un pie
#[derive(Debug, Clone)]
pub struct CalibrationWindow {
    samples: VecDeque<Point3D>,
    capacity: usize,
}

impl CalibrationWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Añade una muestra. Devuelve false si la ventana ya estaba llena.
    pub fn push(&mut self, point: Point3D) -> bool {
        if self.is_full() {
            return false;
        }
        self.samples.push_back(point);
        true
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Primera muestra insertada que sigue en la ventana
    pub fn oldest(&self) -> Option<Point3D> {
        self.samples.front().copied()
    }

    /// Media incremental en orden de inserción: parte de la muestra más
    /// antigua y pliega cada siguiente con influencia 2, 3, 4...
    pub fn average(&self) -> Option<Point3D> {
        let mut iter = self.samples.iter();
        let mut average = *iter.next()?;
        for (influence, sample) in (2u32..).zip(iter) {
            average = average.fold_average(*sample, influence);
        }
        Some(average)
    }

    /// Error de la media respecto a la muestra más antigua
    pub fn error(&self, metric: ErrorMetric) -> Option<(f32, Point3D)> {
        let oldest = self.oldest()?;
        let average = self.average()?;
        let error = match metric {
            ErrorMetric::SignedMax => average.max_signed_difference(oldest),
            ErrorMetric::AbsoluteMax => average.max_abs_difference(oldest),
        };
        Some((error, average))
    }

    /// Descarta las `count` muestras más antiguas
    pub fn evict_oldest(&mut self, count: usize) {
        let count = count.min(self.samples.len());
        self.samples.drain(..count);
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_window_not_full_initially() {
        let window = CalibrationWindow::new(4);
        assert!(!window.is_full());
        assert!(window.average().is_none());
        assert!(window.error(ErrorMetric::SignedMax).is_none());
    }

    #[test]
    fn test_push_is_bounded() {
        let mut window = CalibrationWindow::new(3);
        for i in 0..3 {
            assert!(window.push(Point3D::new(i as f32, 0.0, 0.0)));
        }
        assert!(window.is_full());
        assert!(!window.push(Point3D::new(99.0, 0.0, 0.0)));
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn test_average_equals_mean() {
        let mut window = CalibrationWindow::new(4);
        for x in [1.0, 2.0, 3.0, 6.0] {
            window.push(Point3D::new(x, -x, 2.0));
        }
        let avg = window.average().unwrap();
        assert_relative_eq!(avg.x, 3.0, epsilon = 1e-6);
        assert_relative_eq!(avg.y, -3.0, epsilon = 1e-6);
        assert_relative_eq!(avg.z, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_evict_keeps_newest() {
        let mut window = CalibrationWindow::new(6);
        for i in 0..6 {
            window.push(Point3D::new(i as f32, 0.0, 0.0));
        }
        window.evict_oldest(3);
        assert_eq!(window.len(), 3);
        assert_eq!(window.oldest(), Some(Point3D::new(3.0, 0.0, 0.0)));

        window.evict_oldest(10);
        assert!(window.is_empty());
    }

    #[test]
    fn test_error_metrics() {
        let mut window = CalibrationWindow::new(2);
        // La media queda por debajo de la más antigua en x
        window.push(Point3D::new(1.0, 0.0, 0.0));
        window.push(Point3D::new(0.0, 0.0, 0.0));

        let (signed, _) = window.error(ErrorMetric::SignedMax).unwrap();
        let (absolute, avg) = window.error(ErrorMetric::AbsoluteMax).unwrap();
        assert_relative_eq!(avg.x, 0.5);
        assert_relative_eq!(signed, 0.0);
        assert_relative_eq!(absolute, 0.5);
    }
}
