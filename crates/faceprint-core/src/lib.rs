//! faceprint-core — face recognition around an external detector/embedder.
//!
//! Feed image bytes to a [`Recognizer`] and get back detected faces, each
//! with a pixel bounding box, landmark points, and a 128-dimensional
//! identity embedding, ordered left-to-right. Embeddings can be compared
//! pairwise ([`Embedding::euclidean`], [`Embedding::probability`]) or
//! classified against a registered set of labeled samples.
//!
//! The neural engine itself is behind the [`Engine`] trait; the optional
//! `dlib` feature provides a native dlib-backed implementation.

pub mod engine;
pub mod error;
pub mod recognizer;
pub mod types;

mod marshal;
mod store;

#[cfg(feature = "dlib")]
pub mod dlib;

pub use engine::{Engine, EngineFault, FaultCode, RawFaces};
pub use error::Error;
pub use recognizer::Recognizer;
pub use types::{
    Embedding, Face, Point, Rect, EMBEDDING_DIM, SAME_PERSON_MAX_DISTANCE,
    SAME_PERSON_MIN_PROBABILITY,
};
