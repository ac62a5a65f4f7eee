use crate::direction::{Direction, DirectionMask, KeyEvent};

/// Cambios de estado entre dos frames consecutivos
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub pressed: DirectionMask,
    pub released: DirectionMask,
}

impl Default for Transition {
    fn default() -> Self {
        Self {
            pressed: DirectionMask::empty(),
            released: DirectionMask::empty(),
        }
    }
}

impl Transition {
    pub fn is_empty(&self) -> bool {
        self.pressed.is_empty() && self.released.is_empty()
    }

    /// Un KeyDown por bit pulsado y un KeyUp por bit soltado,
    /// en orden Up, Right, Down, Left
    pub fn events(&self) -> impl Iterator<Item = KeyEvent> + '_ {
        Direction::ALL.into_iter().filter_map(move |direction| {
            let bit = direction.mask();
            if self.pressed.contains(bit) {
                Some(KeyEvent::KeyDown(direction))
            } else if self.released.contains(bit) {
                Some(KeyEvent::KeyUp(direction))
            } else {
                None
            }
        })
    }
}

/// Emite eventos solo en los flancos, para no inundar de repeticiones
#[derive(Debug)]
pub struct EdgeDebouncer {
    previous: DirectionMask,
}

impl Default for EdgeDebouncer {
    fn default() -> Self {
        Self::new()
    }
}

impl EdgeDebouncer {
    pub fn new() -> Self {
        Self {
            previous: DirectionMask::empty(),
        }
    }

    pub fn update(&mut self, current: DirectionMask) -> Transition {
        let transition = Transition {
            pressed: current & !self.previous,
            released: self.previous & !current,
        };
        self.previous = current;
        transition
    }

    /// Suelta todo lo que estuviera pulsado
    pub fn release_all(&mut self) -> Transition {
        self.update(DirectionMask::empty())
    }

    pub fn previous(&self) -> DirectionMask {
        self.previous
    }
}
