//! Face record model and distance metrics.
//!
//! A detected face is a pixel-space rectangle, an ordered set of landmark
//! points, and a 128-dimensional embedding describing identity. Embeddings
//! from the same person cluster tightly under Euclidean distance.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Dimensionality of a face embedding.
pub const EMBEDDING_DIM: usize = 128;

/// Conventional cutoff: two embeddings at most this far apart are most
/// likely the same person. Policy for callers; nothing here enforces it.
pub const SAME_PERSON_MAX_DISTANCE: f64 = 0.6;

/// Conventional cutoff: a pairwise [`Embedding::probability`] at or above
/// this is most likely the same person. Policy for callers.
pub const SAME_PERSON_MIN_PROBABILITY: f64 = 0.85;

/// Axis-aligned pixel bounding box. Always normalized: `left <= right`
/// and `top <= bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl Rect {
    /// Build a rectangle from two corner points, normalizing the corner
    /// order so the invariant holds for any input.
    pub fn new(x0: i64, y0: i64, x1: i64, y1: i64) -> Self {
        Self {
            left: x0.min(x1),
            top: y0.min(y1),
            right: x0.max(x1),
            bottom: y0.max(y1),
        }
    }

    pub fn width(&self) -> i64 {
        self.right - self.left
    }

    pub fn height(&self) -> i64 {
        self.bottom - self.top
    }
}

/// A single landmark point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// 128-dimensional face embedding.
///
/// The length is a type-level invariant: there is no way to construct an
/// `Embedding` of any other dimension. Values produced by the engine are
/// single-precision and widened losslessly to `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding([f64; EMBEDDING_DIM]);

impl Embedding {
    /// Embedding with every dimension zero.
    pub fn zeroed() -> Self {
        Self([0.0; EMBEDDING_DIM])
    }

    /// Widen a single-precision engine descriptor. `f32 -> f64` is exact
    /// for every value, so this never loses precision.
    pub fn from_f32(values: &[f32; EMBEDDING_DIM]) -> Self {
        let mut out = [0.0; EMBEDDING_DIM];
        for (dst, &src) in out.iter_mut().zip(values.iter()) {
            *dst = f64::from(src);
        }
        Self(out)
    }

    pub fn values(&self) -> &[f64; EMBEDDING_DIM] {
        &self.0
    }

    /// Narrow back to the engine's single-precision representation.
    pub fn to_f32(&self) -> [f32; EMBEDDING_DIM] {
        let mut out = [0.0f32; EMBEDDING_DIM];
        for (dst, &src) in out.iter_mut().zip(self.0.iter()) {
            *dst = src as f32;
        }
        out
    }

    /// Euclidean distance to another embedding.
    ///
    /// Symmetric, and zero exactly when the embeddings are elementwise
    /// equal. See [`SAME_PERSON_MAX_DISTANCE`] for the conventional
    /// interpretation threshold.
    pub fn euclidean(&self, other: &Embedding) -> f64 {
        self.squared_euclidean(other).sqrt()
    }

    /// Squared Euclidean distance. Preserves the distance ordering while
    /// skipping the square root; used by nearest-neighbor ranking.
    pub(crate) fn squared_euclidean(&self, other: &Embedding) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }

    /// Likelihood-style score that two embeddings belong to the same
    /// person: exactly `1 - euclidean / 4`.
    ///
    /// Monotonically decreasing in distance and not clamped, so the
    /// practical range is `(-inf, 1]`. See
    /// [`SAME_PERSON_MIN_PROBABILITY`].
    pub fn probability(&self, other: &Embedding) -> f64 {
        1.0 - self.euclidean(other) / 4.0
    }
}

impl From<[f64; EMBEDDING_DIM]> for Embedding {
    fn from(values: [f64; EMBEDDING_DIM]) -> Self {
        Self(values)
    }
}

impl TryFrom<Vec<f64>> for Embedding {
    type Error = Vec<f64>;

    /// Fails (returning the input) unless the vector has exactly
    /// [`EMBEDDING_DIM`] elements.
    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        let arr: [f64; EMBEDDING_DIM] = values.try_into()?;
        Ok(Self(arr))
    }
}

// Serialized as a plain 128-element sequence; any other length is
// rejected on the way back in.
impl Serialize for Embedding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

impl<'de> Deserialize<'de> for Embedding {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = Vec::<f64>::deserialize(deserializer)?;
        let len = values.len();
        Embedding::try_from(values)
            .map_err(|_| de::Error::invalid_length(len, &"an embedding of 128 values"))
    }
}

/// One detected face: bounding box, landmark points, identity embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub rectangle: Rect,
    /// Ordered facial keypoints. Empty when the engine was run without a
    /// landmark predictor.
    pub landmarks: Vec<Point>,
    pub embedding: Embedding,
}

impl Face {
    /// Face with the given box and embedding and no landmarks.
    pub fn new(rectangle: Rect, embedding: Embedding) -> Self {
        Self {
            rectangle,
            landmarks: Vec::new(),
            embedding,
        }
    }

    /// Euclidean distance between this face's embedding and another's.
    pub fn euclidean(&self, other: &Face) -> f64 {
        self.embedding.euclidean(&other.embedding)
    }

    /// Same-person score against another face; see
    /// [`Embedding::probability`].
    pub fn probability(&self, other: &Face) -> f64 {
        self.embedding.probability(&other.embedding)
    }
}
