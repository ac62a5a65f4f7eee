use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pisadas::calibration::CalibrationRun;
use pisadas::config::{ErrorMetric, PisadasConfig};
use pisadas::csv_loader::load_frames_from_csv;
use pisadas::foot_calibrator::CalibrationResult;

/// Ejecuta una pasada de calibración sobre una grabación, frame a frame
#[derive(Parser, Debug)]
#[command(name = "calibrate_csv")]
struct Args {
    /// Grabación CSV
    recording: PathBuf,

    /// Configuración JSON
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Muestras por ventana (sobrescribe la configuración)
    #[arg(long)]
    window: Option<usize>,

    /// Usar el error absoluto en vez del error con signo
    #[arg(long)]
    absolute: bool,

    /// Mostrar cada divergencia
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = Args::parse();
    println!("🎞️  Calibrando desde {:?}", args.recording);

    let mut config = match &args.config {
        Some(path) => PisadasConfig::load(path)
            .with_context(|| format!("No se pudo cargar la configuración {:?}", path))?,
        None => PisadasConfig::default(),
    };
    if let Some(window) = args.window {
        config.calibration.window_size = window;
    }
    if args.absolute {
        config.calibration.error_metric = ErrorMetric::AbsoluteMax;
    }

    let frames = load_frames_from_csv(&args.recording)
        .with_context(|| format!("No se pudo leer la grabación {:?}", args.recording))?;
    let (mut run, _completion) = CalibrationRun::new(&config.calibration)?;

    let mut divergences = 0usize;
    let mut unusable = 0usize;
    let mut converged_at = None;

    for (idx, frame) in frames.iter().enumerate() {
        if frame.is_none() {
            unusable += 1;
        }
        match run.ingest_frame(frame.as_ref()) {
            CalibrationResult::Pending => {}
            CalibrationResult::Diverged => {
                divergences += 1;
                if args.verbose {
                    println!("  ↩️  Frame {:>5}: divergencia, quedan {} muestras", idx, run.samples());
                }
            }
            CalibrationResult::Converged(_) => {
                converged_at = Some(idx);
                break;
            }
        }
    }

    println!("\n📊 Frames leídos: {} (inutilizables: {})", frames.len(), unusable);
    println!("↩️  Divergencias: {}", divergences);

    match (converged_at, run.result()) {
        (Some(idx), Some(calibration)) => {
            println!("\n🥇 Convergencia en el frame {} ({} frames del cuerpo activo)", idx, run.frame_no());
            for (name, point) in [
                ("Pie izq.", calibration.left),
                ("Pie der.", calibration.right),
                ("Centro", calibration.center),
            ] {
                println!("  {:<9} ({:>7.3}, {:>7.3}, {:>7.3})", name, point.x, point.y, point.z);
            }
        }
        _ => {
            println!(
                "\n❌ Sin convergencia: {} muestras acumuladas, estado {:?}",
                run.samples(),
                run.tracking_state()
            );
        }
    }

    Ok(())
}
