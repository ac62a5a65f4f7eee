use tracing::{debug, info};

use crate::types::{FrameSnapshot, TrackedBody};

/// Estados de la sesión de seguimiento
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingState {
    /// Sin cuerpo activo
    #[default]
    Idle,
    /// Se acaba de asignar el id en este frame
    Acquiring,
    /// El cuerpo activo sigue presente
    Tracking,
    /// El cuerpo activo desapareció en este frame
    Lost,
}

/// Resultado de pasar un frame por la sesión
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionUpdate<'a> {
    /// Ningún cuerpo seguido en el frame
    NoBody,
    /// Varios cuerpos seguidos sin id activo: no se elige ninguno
    Ambiguous,
    /// El cuerpo a procesar en este frame
    Active(&'a TrackedBody),
    /// Se perdió el cuerpo activo; hay que descartar el progreso acumulado
    Lost { previous_id: u64 },
}

/// Mantiene un único cuerpo "activo" entre frames
#[derive(Debug, Default)]
pub struct TrackingSessionManager {
    active_id: Option<u64>,
    state: TrackingState,
}

impl TrackingSessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update<'a>(&mut self, frame: &'a FrameSnapshot) -> SessionUpdate<'a> {
        match self.active_id {
            None => self.acquire(frame),
            Some(id) => match frame.find_tracked(id) {
                Some(body) => {
                    self.state = TrackingState::Tracking;
                    SessionUpdate::Active(body)
                }
                None => {
                    info!(tracking_id = id, "Seguimiento perdido");
                    self.active_id = None;
                    self.state = TrackingState::Lost;
                    SessionUpdate::Lost { previous_id: id }
                }
            },
        }
    }

    fn acquire<'a>(&mut self, frame: &'a FrameSnapshot) -> SessionUpdate<'a> {
        self.state = TrackingState::Idle;

        let mut tracked = frame.tracked_bodies();
        let Some(body) = tracked.next() else {
            return SessionUpdate::NoBody;
        };
        if tracked.next().is_some() {
            // Más de una persona delante del sensor: esperar a que quede una
            debug!("Varios cuerpos seguidos, esperando a uno solo");
            return SessionUpdate::Ambiguous;
        }

        info!(tracking_id = body.id, "Cuerpo adquirido");
        self.active_id = Some(body.id);
        self.state = TrackingState::Acquiring;
        SessionUpdate::Active(body)
    }

    pub fn active_id(&self) -> Option<u64> {
        self.active_id
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn reset(&mut self) {
        self.active_id = None;
        self.state = TrackingState::Idle;
    }
}
