use crossbeam_channel::Sender;
use thiserror::Error;
use tracing::info;

use crate::direction::{Direction, KeyEvent};

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Input device error: {0}")]
    Device(String),

    #[error("Event channel disconnected")]
    Disconnected,
}

/// Destino de las pulsaciones lógicas (teclado virtual, log, tests...)
pub trait InputSink {
    fn key_down(&mut self, direction: Direction) -> Result<(), SinkError>;

    fn key_up(&mut self, direction: Direction) -> Result<(), SinkError>;

    fn send(&mut self, event: KeyEvent) -> Result<(), SinkError> {
        match event {
            KeyEvent::KeyDown(direction) => self.key_down(direction),
            KeyEvent::KeyUp(direction) => self.key_up(direction),
        }
    }
}

impl<S: InputSink + ?Sized> InputSink for Box<S> {
    fn key_down(&mut self, direction: Direction) -> Result<(), SinkError> {
        (**self).key_down(direction)
    }

    fn key_up(&mut self, direction: Direction) -> Result<(), SinkError> {
        (**self).key_up(direction)
    }
}

/// Solo registra los eventos, sin tocar ningún dispositivo
#[derive(Debug, Default)]
pub struct LogSink;

impl InputSink for LogSink {
    fn key_down(&mut self, direction: Direction) -> Result<(), SinkError> {
        info!("⬇️  KeyDown {:?}", direction);
        Ok(())
    }

    fn key_up(&mut self, direction: Direction) -> Result<(), SinkError> {
        info!("⬆️  KeyUp {:?}", direction);
        Ok(())
    }
}

/// Reenvía los eventos por un canal al hilo que posee el dispositivo real
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<KeyEvent>,
}

impl ChannelSink {
    pub fn new(tx: Sender<KeyEvent>) -> Self {
        Self { tx }
    }
}

impl InputSink for ChannelSink {
    fn key_down(&mut self, direction: Direction) -> Result<(), SinkError> {
        self.send(KeyEvent::KeyDown(direction))
    }

    fn key_up(&mut self, direction: Direction) -> Result<(), SinkError> {
        self.send(KeyEvent::KeyUp(direction))
    }

    fn send(&mut self, event: KeyEvent) -> Result<(), SinkError> {
        self.tx.send(event).map_err(|_| SinkError::Disconnected)
    }
}

/// Teclado virtual en /dev/uinput con las cuatro flechas
#[cfg(feature = "hid")]
pub struct HidOutput {
    dev: uinput::device::Device,
}

#[cfg(feature = "hid")]
fn device_error(err: uinput::Error) -> SinkError {
    SinkError::Device(err.to_string())
}

#[cfg(feature = "hid")]
impl HidOutput {
    pub fn new() -> Result<Self, SinkError> {
        let dev = Self::create().map_err(device_error)?;
        Ok(HidOutput { dev })
    }

    fn create() -> Result<uinput::device::Device, uinput::Error> {
        uinput::default()?
            .name("pisadas-dance-pad")?
            .event(uinput::event::Keyboard::All)?
            .create()
    }

    fn key(direction: Direction) -> uinput::event::keyboard::Key {
        use uinput::event::keyboard::Key;
        match direction {
            Direction::Up => Key::Up,
            Direction::Right => Key::Right,
            Direction::Down => Key::Down,
            Direction::Left => Key::Left,
        }
    }
}

#[cfg(feature = "hid")]
impl InputSink for HidOutput {
    fn key_down(&mut self, direction: Direction) -> Result<(), SinkError> {
        use uinput::event::keyboard::Keyboard;
        self.dev
            .press(&Keyboard::Key(Self::key(direction)))
            .and_then(|_| self.dev.synchronize())
            .map_err(device_error)
    }

    fn key_up(&mut self, direction: Direction) -> Result<(), SinkError> {
        use uinput::event::keyboard::Keyboard;
        self.dev
            .release(&Keyboard::Key(Self::key(direction)))
            .and_then(|_| self.dev.synchronize())
            .map_err(device_error)
    }
}

/// Guarda los eventos recibidos, para tests
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<KeyEvent>,
    /// Si está activo, cada envío falla
    pub failing: bool,
}

#[cfg(test)]
impl InputSink for RecordingSink {
    fn key_down(&mut self, direction: Direction) -> Result<(), SinkError> {
        if self.failing {
            return Err(SinkError::Device("desconectado".to_string()));
        }
        self.events.push(KeyEvent::KeyDown(direction));
        Ok(())
    }

    fn key_up(&mut self, direction: Direction) -> Result<(), SinkError> {
        if self.failing {
            return Err(SinkError::Device("desconectado".to_string()));
        }
        self.events.push(KeyEvent::KeyUp(direction));
        Ok(())
    }
}
