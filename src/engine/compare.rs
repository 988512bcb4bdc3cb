//! Embedding comparison

use serde::Serialize;

use crate::error::{FaceError, Result};
use crate::utils::math::{dot, euclidean_distance, l2_norm};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Comparison {
    /// In [-1, 1].
    pub cosine: f32,
    pub euclidean: f32,
}

/// Cosine similarity and Euclidean distance between two raw vectors.
///
/// Inputs are not normalized. A zero-norm or non-finite vector is rejected
/// rather than allowed to turn the result into NaN.
pub fn compare(a: &[f32], b: &[f32]) -> Result<Comparison> {
    Ok(Comparison {
        cosine: cosine_similarity(a, b)?,
        euclidean: euclidean(a, b)?,
    })
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dims(a, b)?;
    let norm_a = checked_norm(a)?;
    let norm_b = checked_norm(b)?;

    let cosine = dot(a, b) / (norm_a * norm_b);
    finite(cosine.clamp(-1.0, 1.0), "cosine similarity")
}

pub fn euclidean(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dims(a, b)?;
    finite(euclidean_distance(a, b), "euclidean distance")
}

fn check_dims(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() != b.len() {
        return Err(FaceError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    if a.is_empty() {
        return Err(FaceError::InvalidEmbedding("empty vector".into()));
    }
    Ok(())
}

/// L2 norm of `v`, rejecting vectors no cosine can be computed against.
pub fn checked_norm(v: &[f32]) -> Result<f32> {
    let norm = l2_norm(v);
    if !norm.is_finite() {
        return Err(FaceError::InvalidEmbedding("non-finite norm".into()));
    }
    if norm == 0.0 {
        return Err(FaceError::InvalidEmbedding("zero-norm vector".into()));
    }
    Ok(norm)
}

fn finite(value: f32, what: &str) -> Result<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FaceError::InvalidEmbedding(format!("{} is not finite", what)))
    }
}
