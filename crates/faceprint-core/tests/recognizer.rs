//! End-to-end tests driving the public surface with a scripted engine.
//!
//! The engine is a deterministic stand-in for the native detector: it
//! "decodes" anything starting with the JPEG SOI marker, reports one
//! configured face per entry, and can be slowed down to expose the
//! close-versus-in-flight serialization.

use faceprint_core::{
    Embedding, Engine, EngineFault, Error, RawFaces, Recognizer, EMBEDDING_DIM,
    SAME_PERSON_MAX_DISTANCE, SAME_PERSON_MIN_PROBABILITY,
};
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

/// One scripted detection: a box at `left` and an embedding whose first
/// dimension carries `tag`.
#[derive(Clone, Copy)]
struct Scripted {
    left: i64,
    tag: f32,
}

#[derive(Default)]
struct FakeEngine {
    faces: Vec<Scripted>,
    delay: Duration,
    /// Bumped on entry, i.e. while the caller's shared lock is held.
    calls: Arc<AtomicUsize>,
    finished: Arc<AtomicBool>,
}

impl FakeEngine {
    fn with_faces(faces: Vec<Scripted>) -> Self {
        Self {
            faces,
            ..Self::default()
        }
    }

    fn scripted_embedding(tag: f32) -> Embedding {
        let mut values = [0.0f32; EMBEDDING_DIM];
        values[0] = tag;
        Embedding::from_f32(&values)
    }
}

impl Engine for FakeEngine {
    fn recognize(
        &self,
        image_data: &[u8],
        max_faces: usize,
        _jitter: u32,
    ) -> Result<RawFaces, EngineFault> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let result = if !image_data.starts_with(&[0xFF, 0xD8]) {
            Err(EngineFault::image_load(format!(
                "jpeg decode error: starts with {:#04x}",
                image_data[0]
            )))
        } else if max_faces > 0 && self.faces.len() > max_faces {
            // Engine-side cutoff.
            Ok(RawFaces::empty())
        } else {
            let mut raw = RawFaces {
                num_faces: self.faces.len(),
                ..RawFaces::default()
            };
            for face in &self.faces {
                let l = face.left;
                raw.rectangles.extend_from_slice(&[l, 20, l + 80, 120]);
                // Five landmark points, engine-relative to the box.
                for p in 0..5i64 {
                    raw.landmarks.extend_from_slice(&[l + 10 * p, 40 + p]);
                }
                let mut descriptor = [0.0f32; EMBEDDING_DIM];
                descriptor[0] = face.tag;
                raw.embeddings.extend_from_slice(&descriptor);
            }
            Ok(raw)
        };
        self.finished.store(true, Ordering::SeqCst);
        result
    }
}

fn open(engine: FakeEngine) -> Recognizer {
    Recognizer::with_engine(Box::new(engine))
}

#[test]
fn recognize_returns_every_face_sorted_left_to_right() {
    // Scripted out of order on purpose.
    let rec = open(FakeEngine::with_faces(vec![
        Scripted { left: 400, tag: 4.0 },
        Scripted { left: 100, tag: 1.0 },
        Scripted { left: 250, tag: 2.5 },
    ]));

    let faces = rec.recognize(JPEG, 0, 5).unwrap();
    assert_eq!(faces.len(), 3);

    let lefts: Vec<i64> = faces.iter().map(|f| f.rectangle.left).collect();
    assert_eq!(lefts, vec![100, 250, 400]);

    for face in &faces {
        assert_eq!(face.embedding.values().len(), EMBEDDING_DIM);
        assert_eq!(face.landmarks.len(), 5);
        // Embedding and landmarks still belong to their own rectangle.
        assert_eq!(face.embedding.values()[0] * 100.0, face.rectangle.left as f64);
        assert_eq!(face.landmarks[0].x, face.rectangle.left);
    }
}

#[test]
fn recognize_caps_are_engine_side() {
    let rec = open(FakeEngine::with_faces(vec![
        Scripted { left: 10, tag: 0.1 },
        Scripted { left: 90, tag: 0.9 },
    ]));
    // Cap below the count: the engine reports nothing rather than a
    // truncated list.
    assert!(rec.recognize(JPEG, 1, 0).unwrap().is_empty());
    assert_eq!(rec.recognize(JPEG, 2, 0).unwrap().len(), 2);
    assert_eq!(rec.recognize(JPEG, 0, 0).unwrap().len(), 2);
}

#[test]
fn file_variants_delegate_and_propagate_io() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(JPEG).unwrap();
    file.flush().unwrap();

    let rec = open(FakeEngine::with_faces(vec![Scripted { left: 30, tag: 3.0 }]));
    let faces = rec.recognize_file(file.path(), 0, 0).unwrap();
    assert_eq!(faces.len(), 1);
    assert_eq!(faces[0].rectangle.left, 30);

    let face = rec.recognize_single_file(file.path(), 0).unwrap();
    assert_eq!(face.unwrap().rectangle.left, 30);

    // Missing file: the I/O error comes through untranslated.
    match rec.recognize_file("/definitely/not/here.jpg", 0, 0) {
        Err(Error::Io(err)) => assert_eq!(err.kind(), std::io::ErrorKind::NotFound),
        other => panic!("expected Io error, got {other:?}"),
    }
}

#[test]
fn enrollment_then_classification_round_trip() {
    let rec = open(FakeEngine::with_faces(vec![
        Scripted { left: 0, tag: 0.0 },
        Scripted { left: 100, tag: 1.0 },
        Scripted { left: 200, tag: 2.0 },
    ]));

    let faces = rec.recognize(JPEG, 0, 5).unwrap();
    let samples: Vec<Embedding> = faces.iter().map(|f| f.embedding.clone()).collect();
    rec.set_samples(samples, vec![0, 1, 2]).unwrap();

    // Each enrolled face classifies as itself.
    for (i, face) in faces.iter().enumerate() {
        assert_eq!(rec.classify(&face.embedding).unwrap(), i as i32);
    }

    // A probe near an enrolled face matches it...
    let near = FakeEngine::scripted_embedding(1.01);
    assert_eq!(rec.classify(&near).unwrap(), 1);
    assert!(faces[1].embedding.euclidean(&near) <= SAME_PERSON_MAX_DISTANCE);
    assert!(faces[1].embedding.probability(&near) >= SAME_PERSON_MIN_PROBABILITY);

    // ...and a far one matches nothing.
    let far = FakeEngine::scripted_embedding(50.0);
    assert!(rec.classify(&far).unwrap() < 0);
}

#[test]
fn classify_before_any_samples_is_negative() {
    let rec = open(FakeEngine::with_faces(vec![]));
    assert!(rec.classify(&Embedding::zeroed()).unwrap() < 0);
    assert!(rec.classify(&FakeEngine::scripted_embedding(9.0)).unwrap() < 0);
}

#[test]
fn close_waits_for_in_flight_recognition() {
    let finished = Arc::new(AtomicBool::new(false));
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = FakeEngine {
        faces: vec![Scripted { left: 10, tag: 0.5 }],
        delay: Duration::from_millis(150),
        calls: Arc::clone(&calls),
        finished: Arc::clone(&finished),
    };
    let rec = Arc::new(open(engine));

    let in_flight = {
        let rec = Arc::clone(&rec);
        thread::spawn(move || rec.recognize(JPEG, 0, 0))
    };

    // Wait until the slow call is underway (the engine bumps the counter
    // under the operation's shared lock), then close.
    while calls.load(Ordering::SeqCst) == 0 {
        thread::yield_now();
    }
    rec.close().unwrap();

    // Close can only complete after the engine call returned.
    assert!(finished.load(Ordering::SeqCst));

    // The in-flight call got its real result, not a closed error.
    let faces = in_flight.join().unwrap().unwrap();
    assert_eq!(faces.len(), 1);

    // And the handle is now one-way closed.
    assert!(matches!(rec.recognize(JPEG, 0, 0), Err(Error::Closed)));
    assert!(matches!(rec.close(), Err(Error::Closed)));
}

#[test]
fn concurrent_sample_swaps_never_tear() {
    let rec = Arc::new(open(FakeEngine::with_faces(vec![])));
    let probe = FakeEngine::scripted_embedding(0.0);

    let gen_a = vec![
        FakeEngine::scripted_embedding(0.01),
        FakeEngine::scripted_embedding(0.02),
    ];
    let gen_b = vec![
        FakeEngine::scripted_embedding(0.03),
        FakeEngine::scripted_embedding(0.04),
    ];
    rec.set_samples(gen_a.clone(), vec![1, 1]).unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let writer = {
        let rec = Arc::clone(&rec);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut flip = false;
            while !stop.load(Ordering::Relaxed) {
                let (samples, category) = if flip { (&gen_a, 1) } else { (&gen_b, 2) };
                rec.set_samples(samples.clone(), vec![category, category]).unwrap();
                flip = !flip;
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let rec = Arc::clone(&rec);
            let probe = probe.clone();
            thread::spawn(move || {
                for _ in 0..2_000 {
                    let got = rec.classify(&probe).unwrap();
                    assert!(got == 1 || got == 2, "torn sample set produced {got}");
                }
            })
        })
        .collect();

    for reader in readers {
        reader.join().unwrap();
    }
    stop.store(true, Ordering::Relaxed);
    writer.join().unwrap();
}

#[test]
fn error_shapes_across_the_surface() {
    let rec = open(FakeEngine::with_faces(vec![Scripted { left: 1, tag: 0.1 }]));

    // Empty bytes never reach the engine.
    assert!(matches!(rec.recognize(&[], 0, 0), Err(Error::ImageLoad(_))));

    // Undecodable bytes surface the engine diagnostic.
    match rec.recognize(&[1, 2, 3], 0, 0) {
        Err(Error::ImageLoad(msg)) => assert!(msg.starts_with("jpeg decode error")),
        other => panic!("expected ImageLoad, got {other:?}"),
    }

    // recognize_single: an engine failure is an error, not a None.
    assert!(matches!(rec.recognize_single(&[1, 2, 3], 0), Err(Error::ImageLoad(_))));
}
