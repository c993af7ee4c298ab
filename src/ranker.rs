//! Similarity ranking: cosine scoring and bounded top-K selection.
//!
//! Candidate selection runs on every query and the window can be large, so
//! ranking never sorts the full candidate set. A min-heap of size `k` keeps
//! the best `k` seen so far; each remaining candidate is compared against
//! the current worst and either replaces it or is dropped.
//!
//! Ordering is total and deterministic: score descending, then publication
//! date descending (more recent wins), then `chunk_id` ascending.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::store::{CandidateWindow, ChunkRecord};

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`. Returns `0.0` for empty vectors or
/// vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

struct RankedEntry {
    score: f64,
    record: Arc<ChunkRecord>,
}

impl RankedEntry {
    /// Total order where `Greater` means "ranks higher".
    fn rank_cmp(&self, other: &Self) -> Ordering {
        self.score
            .partial_cmp(&other.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                self.record
                    .published_at()
                    .cmp(&other.record.published_at())
            })
            .then_with(|| other.record.chunk.chunk_id.cmp(&self.record.chunk.chunk_id))
    }
}

impl PartialEq for RankedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.rank_cmp(other) == Ordering::Equal
    }
}

impl Eq for RankedEntry {}

impl PartialOrd for RankedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.rank_cmp(other))
    }
}

impl Ord for RankedEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank_cmp(other)
    }
}

/// Score every candidate against `query_vec` and return the top `k`
/// `(record, score)` pairs, best first.
///
/// An empty window yields an empty result; fewer than `k` candidates yield
/// all of them, still sorted. Ties resolve by date descending, then
/// `chunk_id` ascending.
pub fn rank(
    query_vec: &[f32],
    candidates: &CandidateWindow,
    k: usize,
) -> Vec<(Arc<ChunkRecord>, f64)> {
    if k == 0 {
        return Vec::new();
    }

    // Reverse turns the max-heap into a min-heap: the root is the worst
    // entry currently kept.
    let mut heap: BinaryHeap<Reverse<RankedEntry>> = BinaryHeap::with_capacity(k + 1);

    for record in candidates.iter() {
        let score = cosine_similarity(query_vec, &record.chunk.embedding) as f64;
        let entry = RankedEntry {
            score,
            record: record.clone(),
        };

        if heap.len() < k {
            heap.push(Reverse(entry));
        } else if let Some(Reverse(worst)) = heap.peek() {
            if entry.rank_cmp(worst) == Ordering::Greater {
                heap.pop();
                heap.push(Reverse(entry));
            }
        }
    }

    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse(e)| (e.record, e.score))
        .collect()
}
