use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Zonas del dance pad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    /// Orden de precedencia: desempata la clasificación y ordena los eventos
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    pub fn mask(self) -> DirectionMask {
        match self {
            Direction::Up => DirectionMask::UP,
            Direction::Right => DirectionMask::RIGHT,
            Direction::Down => DirectionMask::DOWN,
            Direction::Left => DirectionMask::LEFT,
        }
    }
}

bitflags! {
    /// Conjunto de zonas ocupadas en un frame
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DirectionMask: u8 {
        const UP    = 1 << 0;
        const RIGHT = 1 << 1;
        const DOWN  = 1 << 2;
        const LEFT  = 1 << 3;
    }
}

impl DirectionMask {
    /// Direcciones presentes, en orden de precedencia
    pub fn directions(self) -> impl Iterator<Item = Direction> {
        Direction::ALL
            .into_iter()
            .filter(move |direction| self.contains(direction.mask()))
    }
}

impl From<Direction> for DirectionMask {
    fn from(direction: Direction) -> Self {
        direction.mask()
    }
}

/// Evento lógico hacia el teclado virtual
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    KeyDown(Direction),
    KeyUp(Direction),
}
