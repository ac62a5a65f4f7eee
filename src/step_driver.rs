//! Modo de juego: frames → máscara de zonas → flancos → teclas

use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{ConfigError, RuntimeConfig};
use crate::debouncer::{EdgeDebouncer, Transition};
use crate::direction::DirectionMask;
use crate::gesture_classifier::GestureClassifier;
use crate::hid::InputSink;
use crate::tracking_session::{SessionUpdate, TrackingSessionManager};
use crate::types::{FrameSnapshot, ReferenceSet};

pub struct StepDriver<S: InputSink> {
    session: TrackingSessionManager,
    classifier: GestureClassifier,
    debouncer: EdgeDebouncer,
    sink: S,
    throttle: Duration,
    frames_processed: u64,
    sink_errors: u64,
}

impl<S: InputSink> StepDriver<S> {
    pub fn new(references: ReferenceSet, config: &RuntimeConfig, sink: S) -> Result<Self, ConfigError> {
        config.validate()?;
        let thresholds = config.thresholds.resolve(&references);
        debug!(
            horizontal = thresholds.horizontal,
            vertical = thresholds.vertical,
            "Umbrales de juego"
        );

        Ok(Self {
            session: TrackingSessionManager::new(),
            classifier: GestureClassifier::new(references, thresholds),
            debouncer: EdgeDebouncer::new(),
            sink,
            throttle: config.throttle(),
            frames_processed: 0,
            sink_errors: 0,
        })
    }

    /// Procesa un frame y envía al sink los eventos resultantes.
    /// Los fallos del sink se registran y no detienen el procesamiento.
    pub fn ingest_frame(&mut self, frame: Option<&FrameSnapshot>) -> Transition {
        let Some(frame) = frame else {
            return Transition::default();
        };

        let transition = match self.session.update(frame) {
            SessionUpdate::Active(body) => {
                let Some((left_foot, right_foot)) = body.feet() else {
                    return Transition::default();
                };
                let mask = self.classifier.classify(left_foot, right_foot);
                self.debouncer.update(mask)
            }
            // Sin cuerpo no quedan teclas pegadas
            SessionUpdate::Lost { .. } => self.debouncer.release_all(),
            SessionUpdate::NoBody | SessionUpdate::Ambiguous => return Transition::default(),
        };
        self.frames_processed += 1;
        self.dispatch(&transition);

        if !self.throttle.is_zero() {
            std::thread::sleep(self.throttle);
        }
        transition
    }

    /// Direcciones que el driver considera pulsadas ahora mismo
    pub fn held(&self) -> DirectionMask {
        self.debouncer.previous()
    }

    pub fn classifier(&self) -> &GestureClassifier {
        &self.classifier
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn sink_errors(&self) -> u64 {
        self.sink_errors
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Suelta todo lo pulsado, como si el cuerpo se hubiera perdido
    pub fn release_all(&mut self) -> Transition {
        let transition = self.debouncer.release_all();
        self.dispatch(&transition);
        transition
    }

    fn dispatch(&mut self, transition: &Transition) {
        for event in transition.events() {
            if let Err(e) = self.sink.send(event) {
                self.sink_errors += 1;
                warn!("Error enviando {:?}: {}", event, e);
            }
        }
    }
}

impl<S: InputSink> Drop for StepDriver<S> {
    fn drop(&mut self) {
        // No dejar teclas pegadas al terminar
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::{Direction, KeyEvent};
    use crate::hid::{ChannelSink, RecordingSink};
    use crate::thresholds::{ThresholdMode, Thresholds};
    use crate::types::{JointName, Point3D, TrackedBody};

    /// Las distancias horizontales se miden en x/y
    fn pad() -> ReferenceSet {
        ReferenceSet::new(
            Point3D::new(0.0, 0.2, 2.0),
            Point3D::new(0.3, 0.0, 2.0),
            Point3D::new(0.0, -0.2, 2.0),
            Point3D::new(-0.3, 0.0, 2.0),
        )
    }

    fn config() -> RuntimeConfig {
        RuntimeConfig {
            thresholds: ThresholdMode::default(),
            throttle_ms: 0,
        }
    }

    fn driver() -> StepDriver<RecordingSink> {
        StepDriver::new(pad(), &config(), RecordingSink::default()).unwrap()
    }

    fn frame(id: u64, left: Point3D, right: Point3D) -> FrameSnapshot {
        FrameSnapshot::new(vec![TrackedBody::new(id, true)
            .with_joint(JointName::FootLeft, left)
            .with_joint(JointName::FootRight, right)])
    }

    const NEUTRAL: Point3D = Point3D::new(0.0, 0.0, 2.0);

    #[test]
    fn test_press_then_release_up() {
        let mut driver = driver();
        let refs = pad();

        driver.ingest_frame(Some(&frame(1, NEUTRAL, NEUTRAL)));
        let t = driver.ingest_frame(Some(&frame(1, refs.up, NEUTRAL)));
        assert_eq!(t.pressed, DirectionMask::UP);
        let t = driver.ingest_frame(Some(&frame(1, NEUTRAL, NEUTRAL)));
        assert_eq!(t.released, DirectionMask::UP);

        assert_eq!(
            driver.sink().events,
            vec![KeyEvent::KeyDown(Direction::Up), KeyEvent::KeyUp(Direction::Up)]
        );
    }

    #[test]
    fn test_held_zone_does_not_repeat() {
        let mut driver = driver();
        let refs = pad();
        for _ in 0..20 {
            driver.ingest_frame(Some(&frame(1, refs.left, refs.right)));
        }
        assert_eq!(driver.held(), DirectionMask::LEFT | DirectionMask::RIGHT);
        assert_eq!(
            driver.sink().events,
            vec![KeyEvent::KeyDown(Direction::Right), KeyEvent::KeyDown(Direction::Left)]
        );
    }

    #[test]
    fn test_losing_body_releases_held_keys() {
        let mut driver = driver();
        let refs = pad();
        driver.ingest_frame(Some(&frame(1, refs.down, NEUTRAL)));
        assert_eq!(driver.held(), DirectionMask::DOWN);

        let t = driver.ingest_frame(Some(&FrameSnapshot::default()));
        assert_eq!(t.released, DirectionMask::DOWN);
        assert!(driver.held().is_empty());

        // Otra persona toma el relevo sin heredar nada
        let t = driver.ingest_frame(Some(&frame(2, NEUTRAL, NEUTRAL)));
        assert!(t.is_empty());
        assert_eq!(
            driver.sink().events,
            vec![KeyEvent::KeyDown(Direction::Down), KeyEvent::KeyUp(Direction::Down)]
        );
    }

    #[test]
    fn test_unusable_frames_change_nothing() {
        let mut driver = driver();
        let refs = pad();
        driver.ingest_frame(Some(&frame(1, refs.up, NEUTRAL)));

        assert!(driver.ingest_frame(None).is_empty());
        assert_eq!(driver.held(), DirectionMask::UP);
        assert_eq!(driver.frames_processed(), 1);
    }

    #[test]
    fn test_sink_failure_keeps_driving() {
        let sink = RecordingSink {
            failing: true,
            ..RecordingSink::default()
        };
        let mut driver = StepDriver::new(pad(), &config(), sink).unwrap();
        let refs = pad();

        driver.ingest_frame(Some(&frame(1, refs.up, NEUTRAL)));
        driver.ingest_frame(Some(&frame(1, NEUTRAL, NEUTRAL)));
        assert_eq!(driver.sink_errors(), 2);
        assert_eq!(driver.frames_processed(), 2);
        assert!(driver.held().is_empty());
    }

    #[test]
    fn test_derived_thresholds_are_resolved() {
        let config = RuntimeConfig {
            thresholds: ThresholdMode::Derived,
            throttle_ms: 0,
        };
        let driver = StepDriver::new(pad(), &config, RecordingSink::default()).unwrap();
        assert_eq!(
            driver.classifier().thresholds(),
            Thresholds::from_references(&pad())
        );
    }

    #[test]
    fn test_release_all_sends_key_ups() {
        let mut driver = driver();
        let refs = pad();
        driver.ingest_frame(Some(&frame(1, refs.up, refs.left)));
        let t = driver.release_all();
        assert_eq!(t.released, DirectionMask::UP | DirectionMask::LEFT);
        assert_eq!(
            driver.sink().events[2..],
            [KeyEvent::KeyUp(Direction::Up), KeyEvent::KeyUp(Direction::Left)]
        );
        assert!(driver.release_all().is_empty());
    }

    #[test]
    fn test_drop_releases_held_keys() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut driver = StepDriver::new(pad(), &config(), ChannelSink::new(tx)).unwrap();
        let refs = pad();
        driver.ingest_frame(Some(&frame(1, refs.right, NEUTRAL)));
        drop(driver);

        assert_eq!(
            rx.try_iter().collect::<Vec<_>>(),
            vec![KeyEvent::KeyDown(Direction::Right), KeyEvent::KeyUp(Direction::Right)]
        );
    }
}
