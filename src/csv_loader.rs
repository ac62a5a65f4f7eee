use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{FrameSnapshot, JointName, Point3D, TrackedBody, BODY_COUNT};

/// Índice de frame máximo admitido (~6 días a 30 fps)
pub const MAX_FRAMES: usize = 1 << 24;

#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Row {row}: frame {frame} out of range")]
    FrameOutOfRange { row: usize, frame: usize },

    #[error("Row {row}: slot {slot} out of range")]
    SlotOutOfRange { row: usize, slot: usize },

    #[error("Row {row}: missing {field}")]
    MissingField { row: usize, field: &'static str },

    #[error("Row {row}: slot {slot} changes tracking id within the same frame")]
    InconsistentBody { row: usize, slot: usize },
}

/// Una fila del CSV: frame,slot,tracking_id,tracked,joint,x,y,z
#[derive(Debug, Default, Serialize, Deserialize)]
struct JointRow {
    frame: usize,
    slot: Option<usize>,
    tracking_id: Option<u64>,
    tracked: Option<bool>,
    joint: Option<JointName>,
    x: Option<f32>,
    y: Option<f32>,
    z: Option<f32>,
}

fn required<T>(value: Option<T>, row: usize, field: &'static str) -> Result<T, RecordingError> {
    value.ok_or(RecordingError::MissingField { row, field })
}

/// Carga una grabación de frames. Los índices sin filas son frames
/// inutilizables (`None`).
pub fn load_frames_from_csv(path: impl AsRef<Path>) -> Result<Vec<Option<FrameSnapshot>>, RecordingError> {
    let file = File::open(path)?;
    load_frames_from_reader(file)
}

pub fn load_frames_from_reader<R: Read>(reader: R) -> Result<Vec<Option<FrameSnapshot>>, RecordingError> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

    // frame -> slot -> cuerpo
    let mut frames: BTreeMap<usize, BTreeMap<usize, TrackedBody>> = BTreeMap::new();

    for (idx, result) in reader.deserialize::<JointRow>().enumerate() {
        let row = idx + 1;
        let record = result?;
        if record.frame >= MAX_FRAMES {
            return Err(RecordingError::FrameOutOfRange {
                row,
                frame: record.frame,
            });
        }
        let bodies = frames.entry(record.frame).or_default();

        // Fila marcador: frame válido sin cuerpos
        let Some(slot) = record.slot else {
            continue;
        };
        if slot >= BODY_COUNT {
            return Err(RecordingError::SlotOutOfRange { row, slot });
        }

        let id = required(record.tracking_id, row, "tracking_id")?;
        let tracked = required(record.tracked, row, "tracked")?;
        let body = bodies
            .entry(slot)
            .or_insert_with(|| TrackedBody::new(id, tracked));
        if body.id != id {
            return Err(RecordingError::InconsistentBody { row, slot });
        }

        if let Some(joint) = record.joint {
            let point = Point3D::new(
                required(record.x, row, "x")?,
                required(record.y, row, "y")?,
                required(record.z, row, "z")?,
            );
            body.joints.insert(joint, point);
        }
    }

    let Some(&last) = frames.keys().next_back() else {
        return Ok(Vec::new());
    };

    let mut recording = Vec::with_capacity(last + 1);
    for frame_idx in 0..=last {
        recording.push(
            frames
                .remove(&frame_idx)
                .map(|bodies| FrameSnapshot::new(bodies.into_values().collect())),
        );
    }
    Ok(recording)
}

/// Escribe una grabación en el mismo formato que lee `load_frames_from_reader`
pub fn write_frames<W: Write>(writer: W, frames: &[Option<FrameSnapshot>]) -> Result<(), RecordingError> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);

    for (frame, snapshot) in frames.iter().enumerate() {
        let Some(snapshot) = snapshot else {
            continue;
        };
        if snapshot.bodies.is_empty() {
            writer.serialize(JointRow {
                frame,
                ..JointRow::default()
            })?;
            continue;
        }

        for (slot, body) in snapshot.bodies.iter().enumerate() {
            let body_row = || JointRow {
                frame,
                slot: Some(slot),
                tracking_id: Some(body.id),
                tracked: Some(body.is_tracked),
                ..JointRow::default()
            };
            if body.joints.is_empty() {
                writer.serialize(body_row())?;
                continue;
            }

            let mut joints: Vec<_> = body.joints.iter().collect();
            joints.sort_by_key(|(joint, _)| **joint);
            for (&joint, point) in joints {
                writer.serialize(JointRow {
                    joint: Some(joint),
                    x: Some(point.x),
                    y: Some(point.y),
                    z: Some(point.z),
                    ..body_row()
                })?;
            }
        }
    }

    writer.flush()?;
    Ok(())
}
