//! Low-threshold candidate filtering ahead of suppression

use super::decode::{Decoded, NUM_LANDMARKS};
use super::geometry::{BBox, Point};

/// One decoded prediction that survived the low threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Position of the originating anchor.
    pub anchor: usize,
    pub bbox: BBox,
    pub landmarks: [Point; NUM_LANDMARKS],
    pub score: f32,
}

/// Indices with `score > low_threshold`, best first, capped at `top_k`.
///
/// Equal scores keep the lower index first.
pub fn select(scores: &[f32], low_threshold: f32, top_k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len())
        .filter(|&i| scores[i] > low_threshold)
        .collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
    order.truncate(top_k);
    order
}

/// Apply [`select`] to a decoded prediction set and gather the survivors.
pub fn filter(decoded: &Decoded, scores: &[f32], low_threshold: f32, top_k: usize) -> Vec<Candidate> {
    select(scores, low_threshold, top_k)
        .into_iter()
        .map(|i| Candidate {
            anchor: i,
            bbox: decoded.boxes[i],
            landmarks: decoded.landmarks[i],
            score: scores[i],
        })
        .collect()
}
