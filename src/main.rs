/*
Pisadas - dance pad virtual a partir de un sensor de cuerpo

1. Calibra las flechas izquierda/derecha con la persona de frente
2. Tras girar 90°, calibra arriba/abajo
3. En modo juego convierte cada pisada en una flecha del teclado

Reproduce una grabación CSV como si fuera el sensor:
    ./target/release/pisadas --recording sesion.csv --fps 30

Con teclado virtual (requiere acceso a /dev/uinput):
    cargo build --release --features hid
    sg input -c './target/release/pisadas --recording sesion.csv'

Escribir `q` + Enter cancela en cualquier momento.
*/

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pisadas::calibration::{calibrate, CalibrationOutcome, FootCalibration};
use pisadas::config::{PisadasConfig, TurnDirection};
use pisadas::csv_loader::load_frames_from_csv;
use pisadas::frame_source::{ReplaySource, Subscription};
use pisadas::hid::{ChannelSink, InputSink};
use pisadas::step_driver::StepDriver;
use pisadas::types::{FrameSnapshot, ReferenceSet};

#[derive(Parser, Debug)]
#[command(name = "pisadas", about = "Dance pad virtual a partir de posiciones de pies")]
struct Args {
    /// Grabación CSV que hace de sensor
    #[arg(short, long)]
    recording: PathBuf,

    /// Configuración JSON (por defecto, valores de fábrica)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frames por segundo de la reproducción (0 = lo más rápido posible)
    #[arg(long, default_value_t = 30.0)]
    fps: f32,
}

fn load_config(path: Option<&PathBuf>) -> Result<PisadasConfig> {
    match path {
        Some(path) => PisadasConfig::load(path)
            .with_context(|| format!("No se pudo cargar la configuración {:?}", path)),
        None => Ok(PisadasConfig::default()),
    }
}

/// Reenvía cada `q` como cancelación. El canal es de capacidad 1:
/// pulsaciones repetidas no se acumulan para la pasada siguiente.
fn forward_cancels<R: BufRead>(input: R, tx: &Sender<()>) {
    for line in input.lines() {
        let Ok(line) = line else { break };
        if line.trim() == "q" {
            let _ = tx.try_send(());
        }
    }
}

/// Hilo de consola: `q` + Enter dispara la cancelación
fn spawn_cancel_listener(tx: Sender<()>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        forward_cancels(stdin.lock(), &tx);
    });
}

fn calibration_step(
    source: &mut ReplaySource,
    config: &PisadasConfig,
    cancel: &Receiver<()>,
) -> Result<Option<FootCalibration>> {
    match calibrate(source, &config.calibration, cancel)? {
        CalibrationOutcome::Calibrated(calibration) => {
            println!(
                "✅ Pies calibrados: izq=({:.3}, {:.3}, {:.3}) der=({:.3}, {:.3}, {:.3})",
                calibration.left.x,
                calibration.left.y,
                calibration.left.z,
                calibration.right.x,
                calibration.right.y,
                calibration.right.z,
            );
            Ok(Some(calibration))
        }
        CalibrationOutcome::Cancelled => {
            println!("🛑 Calibración cancelada");
            Ok(None)
        }
        CalibrationOutcome::SourceClosed => {
            bail!("La grabación terminó antes de completar la calibración")
        }
    }
}

fn print_references(refs: &ReferenceSet) {
    println!("\n🎯 Puntos de referencia:");
    for (name, point) in [
        ("Arriba", refs.up),
        ("Derecha", refs.right),
        ("Abajo", refs.down),
        ("Izquierda", refs.left),
        ("Centro", refs.center),
    ] {
        println!("  {:<10} ({:>7.3}, {:>7.3}, {:>7.3})", name, point.x, point.y, point.z);
    }
    println!();
}

#[cfg(feature = "hid")]
fn output_sink() -> Result<Box<dyn InputSink>> {
    let hid = pisadas::hid::HidOutput::new().context("No se pudo inicializar HID (/dev/uinput)")?;
    println!("✅ HID inicializado (/dev/uinput)");
    Ok(Box::new(hid))
}

#[cfg(not(feature = "hid"))]
fn output_sink() -> Result<Box<dyn InputSink>> {
    println!("ℹ️  Compilado sin la feature `hid`: los eventos solo se registran");
    Ok(Box::new(pisadas::hid::LogSink))
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = Args::parse();
    println!("💃 Pisadas - dance pad virtual\n");

    let config = load_config(args.config.as_ref())?;
    let frames = load_frames_from_csv(&args.recording)
        .with_context(|| format!("No se pudo leer la grabación {:?}", args.recording))?;
    info!(frames = frames.len(), fps = args.fps, "Grabación cargada");

    let mut source = ReplaySource::new(frames, ReplaySource::frame_interval(args.fps));
    // main conserva un emisor: cerrar stdin no debe contar como cancelación
    let (cancel_tx, cancel) = bounded(1);
    spawn_cancel_listener(cancel_tx.clone());

    // Primera pasada: de frente, pies sobre izquierda y derecha
    println!("🦶 Colócate con los pies sobre las flechas IZQUIERDA y DERECHA y no te muevas...");
    let Some(left_right) = calibration_step(&mut source, &config, &cancel)? else {
        return Ok(());
    };

    let turn = match config.calibration.turn {
        TurnDirection::Clockwise => "a la derecha",
        TurnDirection::CounterClockwise => "a la izquierda",
    };
    println!("↪️  Gira 90° {} para pisar ARRIBA y ABAJO...", turn);
    std::thread::sleep(config.calibration.settle());

    // Segunda pasada: girado, pies sobre arriba y abajo
    println!("🦶 Quieto sobre las flechas ARRIBA y ABAJO...");
    let Some(up_down) = calibration_step(&mut source, &config, &cancel)? else {
        return Ok(());
    };

    let refs = ReferenceSet::from_runs(&left_right, &up_down, config.calibration.turn);
    print_references(&refs);

    let mut sink = output_sink()?;
    let (tx_events, rx_events) = unbounded();
    let mut driver = StepDriver::new(refs, &config.runtime, ChannelSink::new(tx_events))?;
    let thresholds = driver.classifier().thresholds();
    println!(
        "🎮 Modo juego (umbral horizontal {:.3} m, vertical {:.3} m). `q` para salir",
        thresholds.horizontal, thresholds.vertical
    );

    {
        let _subscription = Subscription::attach(&mut source, move |frame: Option<&FrameSnapshot>| {
            driver.ingest_frame(frame);
        })?;

        // El canal se cierra cuando el hilo de reproducción suelta el driver
        loop {
            select! {
                recv(rx_events) -> event => match event {
                    Ok(event) => {
                        if let Err(e) = sink.send(event) {
                            warn!("Error enviando {:?}: {}", event, e);
                        }
                    }
                    Err(_) => {
                        println!("🏁 Fin de la grabación");
                        break;
                    }
                },
                recv(cancel) -> _ => {
                    println!("🛑 Cancelado");
                    break;
                }
            }
        }
    }

    // Teclas soltadas por el driver al cerrarse la suscripción
    for event in rx_events.try_iter() {
        if let Err(e) = sink.send(event) {
            warn!("Error enviando {:?}: {}", event, e);
        }
    }

    let stats = source.stats();
    println!(
        "📊 Frames entregados: {} (inutilizables: {})",
        stats.delivered, stats.unusable
    );
    drop(cancel_tx);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_q_queues_a_single_cancel() {
        let (tx, rx) = bounded(1);
        forward_cancels("q\nq\n  q  \nhola\n".as_bytes(), &tx);
        assert_eq!(rx.try_iter().count(), 1);

        // Consumida la primera, la siguiente pasada no arranca cancelada
        assert!(rx.try_recv().is_err());
        forward_cancels("x\n".as_bytes(), &tx);
        assert!(rx.try_recv().is_err());
    }
}
