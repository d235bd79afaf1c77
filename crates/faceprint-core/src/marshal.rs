//! Marshaling of raw engine payloads into owned face records.
//!
//! The engine reports one image's worth of detections as three parallel
//! flat buffers plus a face count. This module decodes them into
//! [`Face`] records and imposes the public ordering guarantee: faces are
//! returned left-to-right by the minimum x-coordinate of their bounding
//! boxes, whatever order the engine produced.

use crate::engine::{RawFaces, RECT_STRIDE};
use crate::error::Error;
use crate::types::{Embedding, Face, Point, Rect, EMBEDDING_DIM};
use thiserror::Error as ThisError;

/// A raw payload whose buffer shapes contradict its face count. Always an
/// engine contract violation, surfaced as [`Error::Unknown`].
#[derive(Debug, ThisError)]
pub(crate) enum MarshalError {
    #[error("rectangle buffer holds {actual} values, expected {expected} for {faces} faces")]
    RectangleBuffer {
        faces: usize,
        expected: usize,
        actual: usize,
    },
    #[error("landmark buffer holds {actual} values, not an even multiple of {faces} faces")]
    LandmarkBuffer { faces: usize, actual: usize },
    #[error("embedding buffer holds {actual} values, expected {expected} for {faces} faces")]
    EmbeddingBuffer {
        faces: usize,
        expected: usize,
        actual: usize,
    },
}

impl From<MarshalError> for Error {
    fn from(err: MarshalError) -> Self {
        Error::Unknown(err.to_string())
    }
}

/// Decode a raw payload into owned, ordered face records.
///
/// A zero face count yields an empty vector without touching any buffer.
/// Every numeric value is copied out; the payload can be dropped (and a
/// native backend's foreign buffers released) as soon as this returns.
pub(crate) fn faces_from_raw(raw: &RawFaces) -> Result<Vec<Face>, MarshalError> {
    let n = raw.num_faces;
    if n == 0 {
        return Ok(Vec::new());
    }

    let expected_rect = n * RECT_STRIDE;
    if raw.rectangles.len() != expected_rect {
        return Err(MarshalError::RectangleBuffer {
            faces: n,
            expected: expected_rect,
            actual: raw.rectangles.len(),
        });
    }

    let points_per_face = raw.landmarks_per_face().ok_or(MarshalError::LandmarkBuffer {
        faces: n,
        actual: raw.landmarks.len(),
    })?;

    let expected_embed = n * EMBEDDING_DIM;
    if raw.embeddings.len() != expected_embed {
        return Err(MarshalError::EmbeddingBuffer {
            faces: n,
            expected: expected_embed,
            actual: raw.embeddings.len(),
        });
    }

    let mut faces = Vec::with_capacity(n);
    for i in 0..n {
        let r = &raw.rectangles[i * RECT_STRIDE..(i + 1) * RECT_STRIDE];
        let rectangle = Rect::new(r[0], r[1], r[2], r[3]);

        let run = 2 * points_per_face;
        let landmarks = raw.landmarks[i * run..(i + 1) * run]
            .chunks_exact(2)
            .map(|pair| Point::new(pair[0], pair[1]))
            .collect();

        // Length checked above, so the slice always converts.
        let descriptor: &[f32; EMBEDDING_DIM] = raw.embeddings
            [i * EMBEDDING_DIM..(i + 1) * EMBEDDING_DIM]
            .try_into()
            .map_err(|_| MarshalError::EmbeddingBuffer {
                faces: n,
                expected: expected_embed,
                actual: raw.embeddings.len(),
            })?;

        faces.push(Face {
            rectangle,
            landmarks,
            embedding: Embedding::from_f32(descriptor),
        });
    }

    // Public ordering guarantee: ascending minimum x. Stable, so faces
    // sharing a left edge keep the engine's relative order.
    faces.sort_by_key(|face| face.rectangle.left);
    Ok(faces)
}
