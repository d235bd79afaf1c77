//! Recognizer handle: lifecycle, closed-state guard, and the public
//! operation surface.
//!
//! A `Recognizer` owns exactly one engine instance plus the classifier
//! store, both behind a shared/exclusive lock. Every operation acquires
//! the lock shared and fails with [`Error::Closed`] once the handle has
//! been closed; `close` acquires it exclusively, so the engine is
//! released only after every in-flight operation has drained. The closed
//! state is one-way.

use crate::engine::Engine;
use crate::error::Error;
use crate::marshal;
use crate::store::ClassifierStore;
use crate::types::{Embedding, Face};
use parking_lot::RwLock;
use std::fs;
use std::path::Path;

struct Inner {
    engine: Box<dyn Engine>,
    store: ClassifierStore,
}

/// Handle to an open face-recognition engine.
///
/// All operations are safe to invoke concurrently from multiple threads.
/// Dropping an unclosed handle still releases the engine; `close` exists
/// for callers that need release errors and use-after-close detection.
pub struct Recognizer {
    inner: RwLock<Option<Inner>>,
}

impl Recognizer {
    /// Wrap an already-initialized engine.
    ///
    /// This is the seam for injecting any [`Engine`] implementation; the
    /// native backend's `open` constructor delegates here.
    pub fn with_engine(engine: Box<dyn Engine>) -> Self {
        tracing::info!("recognizer opened");
        Self {
            inner: RwLock::new(Some(Inner {
                engine,
                store: ClassifierStore::new(),
            })),
        }
    }

    /// Initialize the native dlib engine from `model_dir` and wrap it.
    ///
    /// The directory must contain the engine's two model files,
    /// `shape_predictor_68_face_landmarks.dat` and
    /// `dlib_face_recognition_resnet_model_v1.dat` (filenames enforced by
    /// the engine). Fails with [`Error::Serialization`] when either is
    /// missing or corrupt.
    #[cfg(feature = "dlib")]
    pub fn open(model_dir: impl AsRef<Path>) -> Result<Self, Error> {
        let engine = crate::dlib::DlibEngine::init(model_dir.as_ref())?;
        Ok(Self::with_engine(Box::new(engine)))
    }

    /// Detect and embed every face in an encoded image.
    ///
    /// `max_faces == 0` means unlimited; a positive value caps the result
    /// inside the engine, which also decides which faces are dropped past
    /// the cap. `jitter` is the number of perturbed re-samples averaged
    /// per embedding. Faces come back ordered left-to-right by bounding
    /// box minimum x; an image with no faces is an empty, non-error
    /// result.
    pub fn recognize(
        &self,
        image_data: &[u8],
        max_faces: usize,
        jitter: u32,
    ) -> Result<Vec<Face>, Error> {
        let guard = self.inner.read();
        let inner = guard.as_ref().ok_or(Error::Closed)?;
        recognize_inner(inner, image_data, max_faces, jitter)
    }

    /// [`recognize`](Self::recognize) over the full contents of a file.
    ///
    /// I/O failures propagate as [`Error::Io`], untranslated.
    pub fn recognize_file(
        &self,
        image_path: impl AsRef<Path>,
        max_faces: usize,
        jitter: u32,
    ) -> Result<Vec<Face>, Error> {
        let guard = self.inner.read();
        let inner = guard.as_ref().ok_or(Error::Closed)?;
        let image_data = fs::read(image_path)?;
        recognize_inner(inner, &image_data, max_faces, jitter)
    }

    /// The face in an image known to contain one.
    ///
    /// Returns `Ok(None)` when the image holds zero or several faces;
    /// only a failure of the underlying recognition is an error.
    pub fn recognize_single(
        &self,
        image_data: &[u8],
        jitter: u32,
    ) -> Result<Option<Face>, Error> {
        let guard = self.inner.read();
        let inner = guard.as_ref().ok_or(Error::Closed)?;
        Ok(single(recognize_inner(inner, image_data, 1, jitter)?))
    }

    /// [`recognize_single`](Self::recognize_single) over the full
    /// contents of a file.
    pub fn recognize_single_file(
        &self,
        image_path: impl AsRef<Path>,
        jitter: u32,
    ) -> Result<Option<Face>, Error> {
        let guard = self.inner.read();
        let inner = guard.as_ref().ok_or(Error::Closed)?;
        let image_data = fs::read(image_path)?;
        Ok(single(recognize_inner(inner, &image_data, 1, jitter)?))
    }

    /// Replace the registered sample set used by [`classify`](Self::classify).
    ///
    /// `samples[i]` is labeled `categories[i]`. The set is replaced
    /// wholesale, never merged. An empty `samples` or a length mismatch
    /// between the two slices is a deliberate silent no-op: no error, no
    /// state change.
    pub fn set_samples(
        &self,
        samples: Vec<Embedding>,
        categories: Vec<i32>,
    ) -> Result<(), Error> {
        let guard = self.inner.read();
        let inner = guard.as_ref().ok_or(Error::Closed)?;
        if samples.is_empty() || samples.len() != categories.len() {
            // Lenient by contract: malformed sample input is ignored.
            return Ok(());
        }
        tracing::debug!(samples = samples.len(), "replacing sample set");
        inner.store.replace(samples, categories);
        Ok(())
    }

    /// Nearest-neighbor classification of `probe` against the registered
    /// samples.
    ///
    /// Returns the matching category id, or a negative value when no
    /// sample set has been registered or no sample is close enough.
    pub fn classify(&self, probe: &Embedding) -> Result<i32, Error> {
        let guard = self.inner.read();
        let inner = guard.as_ref().ok_or(Error::Closed)?;
        Ok(inner.store.classify(probe))
    }

    /// Release the engine and the sample set.
    ///
    /// Waits for in-flight operations to drain, then releases. Not
    /// idempotent: closing an already-closed handle is [`Error::Closed`],
    /// as is every other operation afterward.
    pub fn close(&self) -> Result<(), Error> {
        let mut guard = self.inner.write();
        match guard.take() {
            Some(inner) => {
                drop(inner);
                tracing::info!("recognizer closed");
                Ok(())
            }
            None => Err(Error::Closed),
        }
    }
}

fn recognize_inner(
    inner: &Inner,
    image_data: &[u8],
    max_faces: usize,
    jitter: u32,
) -> Result<Vec<Face>, Error> {
    if image_data.is_empty() {
        return Err(Error::ImageLoad("empty image data".to_string()));
    }
    let raw = inner.engine.recognize(image_data, max_faces, jitter)?;
    let faces = marshal::faces_from_raw(&raw)?;
    tracing::debug!(
        bytes = image_data.len(),
        max_faces,
        jitter,
        faces = faces.len(),
        "recognized image"
    );
    Ok(faces)
}

/// Exactly-one collapse used by the `*_single` variants.
fn single(mut faces: Vec<Face>) -> Option<Face> {
    if faces.len() == 1 {
        faces.pop()
    } else {
        None
    }
}
