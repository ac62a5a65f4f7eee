use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::types::FrameSnapshot;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Frame source already has a subscriber")]
    AlreadySubscribed,

    #[error("Could not start frame delivery: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Callback por frame. `None` = frame inutilizable.
pub type FrameHandler = Box<dyn FnMut(Option<&FrameSnapshot>) + Send>;

/// Origen de frames del sensor de cuerpos.
/// Llama al handler en serie desde su propio hilo de entrega.
pub trait FrameSource {
    fn subscribe(&mut self, handler: FrameHandler) -> Result<(), SourceError>;

    /// Detiene la entrega. Al volver, el handler ya no se llamará más.
    fn unsubscribe(&mut self);
}

/// Suscripción con alcance: al soltarse, se da de baja del origen
pub struct Subscription<'a, S: FrameSource + ?Sized> {
    source: &'a mut S,
}

impl<'a, S: FrameSource + ?Sized> Subscription<'a, S> {
    pub fn attach<F>(source: &'a mut S, handler: F) -> Result<Self, SourceError>
    where
        F: FnMut(Option<&FrameSnapshot>) + Send + 'static,
    {
        source.subscribe(Box::new(handler))?;
        Ok(Self { source })
    }
}

impl<S: FrameSource + ?Sized> Drop for Subscription<'_, S> {
    fn drop(&mut self) {
        self.source.unsubscribe();
    }
}

/// Estadísticas de entrega
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub delivered: u32,
    pub unusable: u32,
}

#[derive(Default)]
struct Counters {
    delivered: AtomicU32,
    unusable: AtomicU32,
}

/// Reproduce una grabación frame a frame en un hilo de fondo.
/// El cursor se conserva entre suscripciones, así una misma grabación
/// alimenta las dos calibraciones y luego el modo de juego.
pub struct ReplaySource {
    frames: Arc<Vec<Option<FrameSnapshot>>>,
    cursor: Arc<AtomicUsize>,
    interval: Duration,
    stop: Arc<AtomicBool>,
    counters: Arc<Counters>,
    worker: Option<JoinHandle<()>>,
}

impl ReplaySource {
    pub fn new(frames: Vec<Option<FrameSnapshot>>, interval: Duration) -> Self {
        Self {
            frames: Arc::new(frames),
            cursor: Arc::new(AtomicUsize::new(0)),
            interval,
            stop: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(Counters::default()),
            worker: None,
        }
    }

    /// Intervalo a partir de una tasa de frames (0 = sin espera)
    pub fn frame_interval(fps: f32) -> Duration {
        if fps > 0.0 {
            Duration::from_secs_f32(1.0 / fps)
        } else {
            Duration::ZERO
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn position(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    pub fn is_exhausted(&self) -> bool {
        self.position() >= self.frames.len()
    }

    pub fn is_subscribed(&self) -> bool {
        self.worker.is_some()
    }

    pub fn stats(&self) -> ReplayStats {
        ReplayStats {
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            unusable: self.counters.unusable.load(Ordering::Relaxed),
        }
    }

    /// Espera a que la grabación termine sin cortar la entrega
    pub fn wait_finished(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("El hilo de reproducción terminó con pánico");
            }
        }
    }
}

impl FrameSource for ReplaySource {
    fn subscribe(&mut self, mut handler: FrameHandler) -> Result<(), SourceError> {
        if self.worker.is_some() {
            return Err(SourceError::AlreadySubscribed);
        }
        self.stop.store(false, Ordering::Release);

        let frames = Arc::clone(&self.frames);
        let cursor = Arc::clone(&self.cursor);
        let stop = Arc::clone(&self.stop);
        let counters = Arc::clone(&self.counters);
        let interval = self.interval;

        let worker = std::thread::Builder::new()
            .name("frame-replay".to_string())
            .spawn(move || {
                while !stop.load(Ordering::Acquire) {
                    let idx = cursor.load(Ordering::Acquire);
                    let Some(frame) = frames.get(idx) else {
                        debug!("Fin de la grabación");
                        break;
                    };

                    handler(frame.as_ref());
                    cursor.store(idx + 1, Ordering::Release);

                    counters.delivered.fetch_add(1, Ordering::Relaxed);
                    if frame.is_none() {
                        counters.unusable.fetch_add(1, Ordering::Relaxed);
                    }

                    if !interval.is_zero() {
                        std::thread::sleep(interval);
                    }
                }
            })?;

        self.worker = Some(worker);
        Ok(())
    }

    fn unsubscribe(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.wait_finished();
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
