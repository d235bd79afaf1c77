//! Classifier store: labeled sample embeddings and nearest-neighbor
//! classification over them.
//!
//! The sample set is an immutable snapshot behind an atomically swapped
//! `Arc`. `replace` publishes a complete new set; `classify` pins the
//! current snapshot and ranks against it after dropping the lock. A
//! concurrent reader therefore sees the old set or the new set in full,
//! never a mix of the two.

use crate::types::{Embedding, SAME_PERSON_MAX_DISTANCE};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Nearest neighbors consulted per classification.
const NEIGHBORS: usize = 10;

/// Confidence cutoff: the winning category's nearest sample must be
/// within this Euclidean distance or the probe is reported unmatched.
const MATCH_MAX_DISTANCE: f64 = SAME_PERSON_MAX_DISTANCE;

/// One immutable generation of the sample set. `samples[i]` is labeled
/// `categories[i]`; the vectors are always the same length.
#[derive(Default)]
struct SampleSet {
    samples: Vec<Embedding>,
    categories: Vec<i32>,
}

pub(crate) struct ClassifierStore {
    snapshot: RwLock<Arc<SampleSet>>,
}

impl ClassifierStore {
    /// Empty store; classification reports no match until the first
    /// [`replace`](Self::replace).
    pub(crate) fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(SampleSet::default())),
        }
    }

    /// Publish a wholly new sample set, discarding the previous one.
    ///
    /// Callers have already validated that the slices are non-empty and
    /// of equal length.
    pub(crate) fn replace(&self, samples: Vec<Embedding>, categories: Vec<i32>) {
        debug_assert_eq!(samples.len(), categories.len());
        let next = Arc::new(SampleSet { samples, categories });
        *self.snapshot.write() = next;
    }

    /// Nearest-neighbor classification of `probe` against the current
    /// snapshot.
    ///
    /// Ranks every sample by squared Euclidean distance, lets the ten
    /// nearest vote by category (ties broken by the smaller nearest
    /// distance), and returns the winning category id. Returns `-1` when
    /// the store is empty or the winner's nearest sample is farther than
    /// the internal confidence cutoff.
    pub(crate) fn classify(&self, probe: &Embedding) -> i32 {
        // Pin the snapshot, then rank without holding the lock.
        let set = Arc::clone(&self.snapshot.read());
        if set.samples.is_empty() {
            return -1;
        }

        let mut distances: Vec<(usize, f64)> = set
            .samples
            .iter()
            .enumerate()
            .map(|(idx, sample)| (idx, sample.squared_euclidean(probe)))
            .collect();
        distances.sort_by(|a, b| a.1.total_cmp(&b.1));

        // Vote among the nearest neighbors. The recorded distance per
        // category is its nearest hit (first seen in ascending order).
        let mut hits_by_category: HashMap<i32, (usize, f64)> = HashMap::new();
        for &(idx, dist) in distances.iter().take(NEIGHBORS) {
            let category = set.categories[idx];
            hits_by_category
                .entry(category)
                .and_modify(|entry| entry.0 += 1)
                .or_insert((1, dist));
        }

        let winner = hits_by_category.iter().max_by(|a, b| {
            let (hits_a, dist_a) = *a.1;
            let (hits_b, dist_b) = *b.1;
            hits_a.cmp(&hits_b).then(dist_b.total_cmp(&dist_a))
        });

        match winner {
            Some((&category, &(_, nearest))) => {
                if nearest > MATCH_MAX_DISTANCE * MATCH_MAX_DISTANCE {
                    -1
                } else {
                    category
                }
            }
            None => -1,
        }
    }
}
