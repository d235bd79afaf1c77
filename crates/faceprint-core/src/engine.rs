//! Native engine boundary.
//!
//! The detector/embedder is an external computational engine. This module
//! defines the contract it must satisfy: one detect-and-embed operation
//! producing a flat raw payload, faults reported as an integer-coded
//! diagnostic, construction and release left to the implementation
//! (constructor and `Drop`).
//!
//! Everything downstream of this trait is engine-agnostic; the optional
//! dlib backend (feature `dlib`) and the scripted engines in the test
//! suite are both just implementations of it.

use thiserror::Error;

/// Integers per rectangle in the raw payload: x0, y0, x1, y1.
pub const RECT_STRIDE: usize = 4;

/// Boundary fault classes, keyed by the engine's integer error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultCode {
    /// Input bytes could not be decoded as a supported image.
    ImageLoad,
    /// A model file was missing, unreadable, or corrupt.
    Serialization,
    /// Anything the engine did not classify.
    Unknown,
}

impl FaultCode {
    /// Map a raw engine error code onto a fault class. Unrecognized codes
    /// collapse to [`FaultCode::Unknown`].
    pub fn from_code(code: i32) -> Self {
        match code {
            fault_code::IMAGE_LOAD => FaultCode::ImageLoad,
            fault_code::SERIALIZATION => FaultCode::Serialization,
            _ => FaultCode::Unknown,
        }
    }
}

/// Raw integer codes of the engine's error contract.
pub mod fault_code {
    pub const UNKNOWN: i32 = 1;
    pub const IMAGE_LOAD: i32 = 2;
    pub const SERIALIZATION: i32 = 3;
}

/// A fault reported across the engine boundary: the engine's diagnostic
/// string plus its classified code. Built exactly once from the raw
/// `(string, code)` pair; never re-parsed downstream.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct EngineFault {
    pub code: FaultCode,
    pub message: String,
}

impl EngineFault {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: FaultCode::from_code(code),
            message: message.into(),
        }
    }

    pub fn image_load(message: impl Into<String>) -> Self {
        Self {
            code: FaultCode::ImageLoad,
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self {
            code: FaultCode::Serialization,
            message: message.into(),
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            code: FaultCode::Unknown,
            message: message.into(),
        }
    }
}

/// Owned raw recognition payload: everything the engine reports for one
/// image, still in its flat wire shape.
///
/// Layout per face index `i`:
/// - `rectangles[i*4 .. i*4+4]` is `x0, y0, x1, y1`;
/// - `landmarks[i*2L .. (i+1)*2L]` is `L` consecutive `(x, y)` pairs,
///   where `L` is uniform across faces and may be zero;
/// - `embeddings[i*128 .. (i+1)*128]` is the face descriptor.
///
/// A backend bridging foreign memory must copy into these vectors before
/// releasing the foreign buffers; nothing here may alias engine memory.
#[derive(Debug, Clone, Default)]
pub struct RawFaces {
    pub num_faces: usize,
    pub rectangles: Vec<i64>,
    pub landmarks: Vec<i64>,
    pub embeddings: Vec<f32>,
}

impl RawFaces {
    /// Payload for an image with no detectable faces.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Landmark points per face, derived from the buffer shape. `None`
    /// when the buffer length is not an even multiple of the face count.
    pub fn landmarks_per_face(&self) -> Option<usize> {
        if self.num_faces == 0 {
            return Some(0);
        }
        let per_face = self.landmarks.len() / self.num_faces;
        if per_face * self.num_faces != self.landmarks.len() || per_face % 2 != 0 {
            return None;
        }
        Some(per_face / 2)
    }
}

/// Contract with the external detector/embedder.
///
/// Implementations must be safe to call from multiple threads at once;
/// any internal single-threaded stage (a non-reentrant detector, say) is
/// the implementation's job to serialize. Engine resources are released
/// by `Drop`.
pub trait Engine: Send + Sync {
    /// Detect every face in `image_data` and embed each one.
    ///
    /// `max_faces == 0` means unlimited; a positive value caps the count
    /// inside the engine, and which faces are dropped past the cap is the
    /// engine's choice — this layer does not re-derive that policy.
    /// `jitter` is the number of perturbed re-samples averaged per
    /// embedding; zero disables jittering.
    fn recognize(
        &self,
        image_data: &[u8],
        max_faces: usize,
        jitter: u32,
    ) -> Result<RawFaces, EngineFault>;
}
