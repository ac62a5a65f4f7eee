use crate::direction::{Direction, DirectionMask};
use crate::thresholds::{horizontal_distance, vertical_distance, Thresholds};
use crate::types::{Point3D, ReferenceSet};

/// Distancias de un pie a un punto de referencia
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneDistance {
    pub direction: Direction,
    pub horizontal: f32,
    pub vertical: f32,
}

fn reference_point(refs: &ReferenceSet, direction: Direction) -> Point3D {
    match direction {
        Direction::Up => refs.up,
        Direction::Right => refs.right,
        Direction::Down => refs.down,
        Direction::Left => refs.left,
    }
}

/// Distancias del pie a las 4 zonas, en orden de precedencia
pub fn zone_distances(refs: &ReferenceSet, foot: Point3D) -> [ZoneDistance; 4] {
    Direction::ALL.map(|direction| {
        let point = reference_point(refs, direction);
        ZoneDistance {
            direction,
            horizontal: horizontal_distance(point, foot),
            vertical: vertical_distance(point, foot),
        }
    })
}

/// Zona sobre la que está un pie, si la hay.
/// Entre candidatas gana la de menor distancia horizontal; los empates se
/// resuelven por orden Up, Right, Down, Left (orden de evaluación, no una
/// prioridad intencional).
pub fn foot_direction(refs: &ReferenceSet, foot: Point3D, thresholds: &Thresholds) -> Option<Direction> {
    let mut best: Option<ZoneDistance> = None;
    for zone in zone_distances(refs, foot) {
        // Comparación en positivo: un NaN nunca es candidato
        let inside = zone.horizontal < thresholds.horizontal && zone.vertical < thresholds.vertical;
        if !inside {
            continue;
        }
        match best {
            Some(current) if current.horizontal <= zone.horizontal => {}
            _ => best = Some(zone),
        }
    }
    best.map(|zone| zone.direction)
}

/// Zonas ocupadas por ambos pies en un frame. Función pura.
pub fn classify(
    refs: &ReferenceSet,
    left_foot: Point3D,
    right_foot: Point3D,
    thresholds: &Thresholds,
) -> DirectionMask {
    let mut mask = DirectionMask::empty();
    for foot in [left_foot, right_foot] {
        if let Some(direction) = foot_direction(refs, foot, thresholds) {
            mask |= direction.mask();
        }
    }
    mask
}

/// Clasificador con los puntos de referencia y umbrales ya fijados
#[derive(Debug, Clone, Copy)]
pub struct GestureClassifier {
    references: ReferenceSet,
    thresholds: Thresholds,
}

impl GestureClassifier {
    pub fn new(references: ReferenceSet, thresholds: Thresholds) -> Self {
        Self {
            references,
            thresholds,
        }
    }

    pub fn classify(&self, left_foot: Point3D, right_foot: Point3D) -> DirectionMask {
        classify(&self.references, left_foot, right_foot, &self.thresholds)
    }

    pub fn references(&self) -> &ReferenceSet {
        &self.references
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }
}
