use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use pisadas::csv_loader::write_frames;
use pisadas::direction::Direction;
use pisadas::types::{FrameSnapshot, JointName, Point3D, TrackedBody};

/// Genera una sesión sintética: calibración de frente, giro, calibración
/// girada y una serie de pisadas sobre las cuatro flechas
#[derive(Parser, Debug)]
#[command(name = "synth_session")]
struct Args {
    /// CSV de salida
    output: PathBuf,

    /// Frames quieto en cada calibración
    #[arg(long, default_value_t = 300)]
    hold: usize,

    /// Número de pisadas tras calibrar
    #[arg(long, default_value_t = 12)]
    steps: usize,

    /// Amplitud del temblor de los pies (m)
    #[arg(long, default_value_t = 0.002)]
    jitter: f32,
}

const TRACKING_ID: u64 = 72057594037927936;
const SPINE: Point3D = Point3D::new(0.0, 0.9, 2.0);

// Pad visto desde el sensor
const LEFT: Point3D = Point3D::new(-0.3, 0.0, 2.0);
const RIGHT: Point3D = Point3D::new(0.3, 0.0, 2.0);
const UP: Point3D = Point3D::new(-0.05, 0.0, 2.3);
const DOWN: Point3D = Point3D::new(0.05, 0.0, 1.7);
const NEUTRAL: Point3D = Point3D::new(0.0, 0.1, 2.0);

struct Session {
    frames: Vec<Option<FrameSnapshot>>,
    jitter: f32,
}

impl Session {
    fn wobble(&self, point: Point3D, phase: f32) -> Point3D {
        let t = self.frames.len() as f32 + phase;
        Point3D::new(
            point.x + self.jitter * (t * 1.7).sin(),
            point.y + self.jitter * (t * 2.3).cos(),
            point.z + self.jitter * (t * 0.9).sin(),
        )
    }

    fn stand(&mut self, left: Point3D, right: Point3D, frames: usize) {
        for _ in 0..frames {
            let body = TrackedBody::new(TRACKING_ID, true)
                .with_joint(JointName::FootLeft, self.wobble(left, 0.0))
                .with_joint(JointName::FootRight, self.wobble(right, 0.5))
                .with_joint(JointName::SpineBase, SPINE);
            self.frames.push(Some(FrameSnapshot::new(vec![body])));
        }
    }

    /// Pies interpolados linealmente entre dos posturas
    fn walk(&mut self, from: (Point3D, Point3D), to: (Point3D, Point3D), frames: usize) {
        for i in 0..frames {
            let k = (i + 1) as f32 / frames as f32;
            let lerp = |a: Point3D, b: Point3D| a + (b - a) * k;
            self.stand(lerp(from.0, to.0), lerp(from.1, to.1), 1);
        }
    }

    fn empty(&mut self, frames: usize) {
        for _ in 0..frames {
            self.frames.push(Some(FrameSnapshot::default()));
        }
    }

    fn dropouts(&mut self, frames: usize) {
        self.frames.extend(std::iter::repeat_with(|| None).take(frames));
    }
}

fn arrow(direction: Direction) -> Point3D {
    match direction {
        Direction::Up => UP,
        Direction::Right => RIGHT,
        Direction::Down => DOWN,
        Direction::Left => LEFT,
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut session = Session {
        frames: Vec::new(),
        jitter: args.jitter,
    };

    // Nadie delante, luego de frente sobre izquierda/derecha
    session.empty(15);
    session.stand(LEFT, RIGHT, args.hold);

    // Giro de 90° en sentido horario: izquierdo a Up, derecho a Down
    session.walk((LEFT, RIGHT), (UP, DOWN), 30);
    session.dropouts(3);
    session.stand(UP, DOWN, args.hold);

    // Vuelta al centro y pisadas
    session.walk((UP, DOWN), (NEUTRAL, NEUTRAL), 15);
    for step in 0..args.steps {
        let direction = Direction::ALL[step % Direction::ALL.len()];
        session.stand(arrow(direction), NEUTRAL, 20);
        session.stand(NEUTRAL, NEUTRAL, 10);
    }

    let file = File::create(&args.output)
        .with_context(|| format!("No se pudo crear {:?}", args.output))?;
    write_frames(BufWriter::new(file), &session.frames)?;

    println!(
        "💾 Sesión sintética guardada en {:?} ({} frames)",
        args.output,
        session.frames.len()
    );
    Ok(())
}
