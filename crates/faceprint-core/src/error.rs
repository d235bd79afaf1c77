//! Public error taxonomy.
//!
//! A closed set of failure classes: image decoding, model
//! deserialization, use-after-close, and an unclassified remainder.
//! Engine faults are mapped into it exactly once, at the boundary; file
//! I/O failures from the `*_file` variants pass through untranslated.

use crate::engine::{EngineFault, FaultCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Input bytes were empty or not decodable as a supported image.
    /// Carries the engine's diagnostic string.
    #[error("image load error: {0}")]
    ImageLoad(String),

    /// A model file was missing, unreadable, or corrupt at init time.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Operation attempted on a handle that has already been closed,
    /// including a second close.
    #[error("recognizer has been closed")]
    Closed,

    /// Engine failure not classified into the above.
    #[error("engine error: {0}")]
    Unknown(String),

    /// File I/O failure from a `*_file` variant, propagated verbatim.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<EngineFault> for Error {
    fn from(fault: EngineFault) -> Self {
        match fault.code {
            FaultCode::ImageLoad => Error::ImageLoad(fault.message),
            FaultCode::Serialization => Error::Serialization(fault.message),
            FaultCode::Unknown => Error::Unknown(fault.message),
        }
    }
}
