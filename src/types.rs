use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::{Add, Div, Mul, Sub};

/// Número de cuerpos que el sensor reporta por frame
pub const BODY_COUNT: usize = 6;

/// Constantes del sistema
pub const WINDOW_SIZE: usize = 150; // muestras (~5 s a 30 fps)
pub const MAX_ERROR: f32 = 0.01; // metros por eje
pub const FIXED_HORIZONTAL_THRESHOLD: f32 = 0.075;
pub const FIXED_VERTICAL_THRESHOLD: f32 = 0.025;
pub const THROTTLE_MS: u64 = 10;

/// Posición en el espacio de la cámara, en metros
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3D {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Acerca `self` hacia `sample` con peso 1/influence.
    /// Con influence = 2, 3, 4... va acumulando la media incremental.
    pub fn fold_average(self, sample: Point3D, influence: u32) -> Self {
        self + (sample - self) / influence as f32
    }

    /// Máximo con signo de las diferencias por eje (self - other)
    pub fn max_signed_difference(self, other: Point3D) -> f32 {
        let d = self - other;
        d.x.max(d.y).max(d.z)
    }

    /// Máximo absoluto de las diferencias por eje
    pub fn max_abs_difference(self, other: Point3D) -> f32 {
        let d = self - other;
        d.x.abs().max(d.y.abs()).max(d.z.abs())
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn midpoint(self, other: Point3D) -> Self {
        (self + other) / 2.0
    }
}

impl Add for Point3D {
    type Output = Point3D;

    fn add(self, rhs: Point3D) -> Point3D {
        Point3D::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3D {
    type Output = Point3D;

    fn sub(self, rhs: Point3D) -> Point3D {
        Point3D::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Point3D {
    type Output = Point3D;

    fn mul(self, rhs: f32) -> Point3D {
        Point3D::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f32> for Point3D {
    type Output = Point3D;

    fn div(self, rhs: f32) -> Point3D {
        Point3D::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

/// Articulaciones del esqueleto que usa el sistema
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JointName {
    /// Base de la columna, usada como "centro" del cuerpo
    SpineBase,
    SpineMid,
    AnkleLeft,
    AnkleRight,
    FootLeft,
    FootRight,
}

/// Un cuerpo detectado por el sensor en un frame
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackedBody {
    pub id: u64,
    pub is_tracked: bool,
    pub joints: HashMap<JointName, Point3D>,
}

impl TrackedBody {
    pub fn new(id: u64, is_tracked: bool) -> Self {
        Self {
            id,
            is_tracked,
            joints: HashMap::new(),
        }
    }

    pub fn with_joint(mut self, joint: JointName, point: Point3D) -> Self {
        self.joints.insert(joint, point);
        self
    }

    pub fn joint(&self, joint: JointName) -> Option<Point3D> {
        self.joints.get(&joint).copied()
    }

    /// Posiciones (izquierdo, derecho) de los pies, si ambas están presentes
    /// y son finitas
    pub fn feet(&self) -> Option<(Point3D, Point3D)> {
        let left = self.joint(JointName::FootLeft)?;
        let right = self.joint(JointName::FootRight)?;
        (left.is_finite() && right.is_finite()).then_some((left, right))
    }
}

/// Contenido de una notificación del sensor: hasta BODY_COUNT cuerpos
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameSnapshot {
    pub bodies: Vec<TrackedBody>,
}

impl FrameSnapshot {
    pub fn new(bodies: Vec<TrackedBody>) -> Self {
        Self { bodies }
    }

    pub fn tracked_bodies(&self) -> impl Iterator<Item = &TrackedBody> {
        self.bodies.iter().filter(|body| body.is_tracked)
    }

    pub fn find_tracked(&self, id: u64) -> Option<&TrackedBody> {
        self.tracked_bodies().find(|body| body.id == id)
    }
}

/// Puntos de referencia del pad, fijos tras la calibración
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSet {
    pub up: Point3D,
    pub right: Point3D,
    pub down: Point3D,
    pub left: Point3D,
    pub center: Point3D,
}

impl ReferenceSet {
    /// Construye el set calculando el centro como la media de las 4 flechas
    pub fn new(up: Point3D, right: Point3D, down: Point3D, left: Point3D) -> Self {
        let center = up
            .fold_average(right, 2)
            .fold_average(down, 3)
            .fold_average(left, 4);
        Self {
            up,
            right,
            down,
            left,
            center,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fold_average_is_incremental_mean() {
        let a = Point3D::new(0.0, 0.0, 0.0);
        let b = Point3D::new(2.0, 4.0, 6.0);
        let c = Point3D::new(4.0, 2.0, 0.0);

        let avg = a.fold_average(b, 2).fold_average(c, 3);
        assert_relative_eq!(avg.x, 2.0);
        assert_relative_eq!(avg.y, 2.0);
        assert_relative_eq!(avg.z, 2.0);
    }

    #[test]
    fn test_signed_difference_ignores_negative_axes() {
        let avg = Point3D::new(0.0, 0.0, 0.0);
        let oldest = Point3D::new(0.5, 0.0, 0.0);

        assert_relative_eq!(avg.max_signed_difference(oldest), 0.0);
        assert_relative_eq!(avg.max_abs_difference(oldest), 0.5);
    }

    #[test]
    fn test_reference_center_is_mean_of_arrows() {
        let refs = ReferenceSet::new(
            Point3D::new(0.0, 0.0, 2.3),
            Point3D::new(0.3, 0.0, 2.0),
            Point3D::new(0.0, 0.0, 1.7),
            Point3D::new(-0.3, 0.0, 2.0),
        );
        assert_relative_eq!(refs.center.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(refs.center.z, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_tracked_bodies_filters_untracked() {
        let frame = FrameSnapshot::new(vec![
            TrackedBody::new(1, false),
            TrackedBody::new(2, true),
            TrackedBody::new(3, false),
        ]);
        let ids: Vec<u64> = frame.tracked_bodies().map(|b| b.id).collect();
        assert_eq!(ids, vec![2]);
        assert!(frame.find_tracked(1).is_none());
        assert!(frame.find_tracked(2).is_some());
    }

    #[test]
    fn test_feet_requires_both_joints() {
        let body = TrackedBody::new(7, true).with_joint(JointName::FootLeft, Point3D::default());
        assert!(body.feet().is_none());

        let body = body.with_joint(JointName::FootRight, Point3D::new(1.0, 0.0, 0.0));
        assert!(body.feet().is_some());
    }

    #[test]
    fn test_feet_rejects_non_finite_joints() {
        let body = TrackedBody::new(7, true)
            .with_joint(JointName::FootLeft, Point3D::new(f32::NAN, 0.0, 2.0))
            .with_joint(JointName::FootRight, Point3D::new(0.3, 0.0, 2.0));
        assert!(body.feet().is_none());

        let body = body.with_joint(JointName::FootLeft, Point3D::new(-0.3, 0.0, f32::INFINITY));
        assert!(body.feet().is_none());
    }
}
