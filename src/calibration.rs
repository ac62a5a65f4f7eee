//! Una pasada de calibración: une la sesión de seguimiento con el
//! calibrador de pies y avisa una sola vez cuando converge.

use crossbeam_channel::{bounded, select, Receiver, Sender};
use thiserror::Error;
use tracing::info;

use crate::config::{CalibrationConfig, ConfigError, TurnDirection};
use crate::foot_calibrator::{CalibrationResult, FootPair, FootPointCalibrator};
use crate::frame_source::{FrameSource, SourceError, Subscription};
use crate::tracking_session::{SessionUpdate, TrackingSessionManager, TrackingState};
use crate::types::{FrameSnapshot, JointName, Point3D, ReferenceSet};

#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("Invalid calibration config: {0}")]
    Config(#[from] ConfigError),

    #[error("Frame source error: {0}")]
    Source(#[from] SourceError),
}

/// Resultado de una pasada: un punto por pie más el centro del cuerpo
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FootCalibration {
    pub left: Point3D,
    pub right: Point3D,
    /// SpineBase en el frame de convergencia
    pub center: Point3D,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationOutcome {
    Calibrated(FootCalibration),
    /// Se disparó la señal de cancelación
    Cancelled,
    /// El origen dejó de entregar frames antes de converger
    SourceClosed,
}

/// Señal de finalización de una pasada (un solo valor)
pub struct Completion {
    rx: Receiver<FootCalibration>,
}

impl Completion {
    /// Bloquea sin timeout hasta que la pasada converja o llegue `cancel`.
    /// Soltar el emisor de `cancel` también cuenta como cancelación;
    /// para esperar sin cancelación usar `crossbeam_channel::never()`.
    pub fn wait(&self, cancel: &Receiver<()>) -> CalibrationOutcome {
        select! {
            recv(self.rx) -> msg => match msg {
                Ok(calibration) => CalibrationOutcome::Calibrated(calibration),
                Err(_) => CalibrationOutcome::SourceClosed,
            },
            recv(cancel) -> _ => CalibrationOutcome::Cancelled,
        }
    }

    pub fn try_get(&self) -> Option<FootCalibration> {
        self.rx.try_recv().ok()
    }
}

/// Estado exclusivo de una pasada de calibración
pub struct CalibrationRun {
    session: TrackingSessionManager,
    calibrator: FootPointCalibrator,
    frame_no: u32,
    completion: Option<Sender<FootCalibration>>,
    result: Option<FootCalibration>,
}

impl CalibrationRun {
    pub fn new(config: &CalibrationConfig) -> Result<(Self, Completion), ConfigError> {
        let calibrator = FootPointCalibrator::new(config)?;
        let (tx, rx) = bounded(1);
        let run = Self {
            session: TrackingSessionManager::new(),
            calibrator,
            frame_no: 0,
            completion: Some(tx),
            result: None,
        };
        Ok((run, Completion { rx }))
    }

    /// Punto de entrada por frame. Tras converger, los frames se ignoran.
    pub fn ingest_frame(&mut self, frame: Option<&FrameSnapshot>) -> CalibrationResult {
        if let Some(done) = self.result {
            return CalibrationResult::Converged(FootPair {
                left: done.left,
                right: done.right,
            });
        }
        let Some(frame) = frame else {
            return CalibrationResult::Pending;
        };

        let body = match self.session.update(frame) {
            SessionUpdate::NoBody | SessionUpdate::Ambiguous => return CalibrationResult::Pending,
            SessionUpdate::Lost { previous_id } => {
                info!(
                    tracking_id = previous_id,
                    frames = self.frame_no,
                    "Cuerpo perdido, reiniciando calibración"
                );
                self.frame_no = 0;
                self.calibrator.reset();
                return CalibrationResult::Pending;
            }
            SessionUpdate::Active(body) => body,
        };

        let Some((left_foot, right_foot)) = body.feet() else {
            return CalibrationResult::Pending;
        };
        self.frame_no += 1;

        let result = self.calibrator.ingest(left_foot, right_foot);
        if let CalibrationResult::Converged(pair) = result {
            let center = body
                .joint(JointName::SpineBase)
                .unwrap_or_else(|| pair.left.midpoint(pair.right));
            self.finish(FootCalibration {
                left: pair.left,
                right: pair.right,
                center,
            });
        }
        result
    }

    fn finish(&mut self, calibration: FootCalibration) {
        self.result = Some(calibration);
        if let Some(tx) = self.completion.take() {
            let _ = tx.send(calibration);
        }
    }

    /// Frames del cuerpo activo desde el último reinicio
    pub fn frame_no(&self) -> u32 {
        self.frame_no
    }

    pub fn samples(&self) -> usize {
        self.calibrator.len()
    }

    pub fn tracking_state(&self) -> TrackingState {
        self.session.state()
    }

    pub fn result(&self) -> Option<FootCalibration> {
        self.result
    }
}

/// Calibra contra un origen de frames y bloquea hasta converger o cancelar.
/// La suscripción se suelta al salir, sea cual sea el resultado.
pub fn calibrate<S: FrameSource + ?Sized>(
    source: &mut S,
    config: &CalibrationConfig,
    cancel: &Receiver<()>,
) -> Result<CalibrationOutcome, CalibrationError> {
    let (mut run, completion) = CalibrationRun::new(config)?;
    let _subscription = Subscription::attach(source, move |frame: Option<&FrameSnapshot>| {
        run.ingest_frame(frame);
    })?;

    let outcome = completion.wait(cancel);
    match outcome {
        CalibrationOutcome::Calibrated(_) => info!("Pasada de calibración completada"),
        CalibrationOutcome::Cancelled => info!("Calibración cancelada"),
        CalibrationOutcome::SourceClosed => info!("El origen de frames se cerró antes de converger"),
    }
    Ok(outcome)
}

impl ReferenceSet {
    /// Combina la pasada izquierda/derecha con la de arriba/abajo.
    /// En la segunda la persona está girada 90°, así que sus pies caen
    /// sobre Up y Down según el sentido del giro.
    pub fn from_runs(
        left_right: &FootCalibration,
        up_down: &FootCalibration,
        turn: TurnDirection,
    ) -> Self {
        let (up, down) = match turn {
            TurnDirection::Clockwise => (up_down.left, up_down.right),
            TurnDirection::CounterClockwise => (up_down.right, up_down.left),
        };
        ReferenceSet::new(up, left_right.right, down, left_right.left)
    }
}
