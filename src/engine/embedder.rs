//! Face embedder
//!
//! Turns a cropped face into a fixed-length identity vector.

use std::sync::Arc;

use image::DynamicImage;

use crate::error::{FaceError, Result};

use super::compare::{self, Comparison};
use super::inference::{embedding_output, InferenceEngine};
use super::preprocess::preprocess_for_embedding;

/// Immutable embedding vector with finite components.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceEmbedding {
    vector: Vec<f32>,
}

impl FaceEmbedding {
    pub fn new(vector: Vec<f32>) -> Result<Self> {
        if vector.is_empty() {
            return Err(FaceError::InvalidEmbedding("empty vector".into()));
        }
        if let Some(i) = vector.iter().position(|v| !v.is_finite()) {
            return Err(FaceError::InvalidEmbedding(format!("component {} is not finite", i)));
        }
        Ok(Self { vector })
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.vector
    }

    pub fn dim(&self) -> usize {
        self.vector.len()
    }

    /// Unit-length copy. Fails on a zero vector.
    pub fn normalized(&self) -> Result<Self> {
        let norm = crate::utils::math::l2_norm(&self.vector);
        if norm == 0.0 || !norm.is_finite() {
            return Err(FaceError::InvalidEmbedding("cannot normalize zero-norm vector".into()));
        }
        let mut vector = self.vector.clone();
        crate::utils::math::l2_normalize(&mut vector);
        Ok(Self { vector })
    }

    pub fn compare(&self, other: &FaceEmbedding) -> Result<Comparison> {
        compare::compare(&self.vector, &other.vector)
    }
}

impl AsRef<[f32]> for FaceEmbedding {
    fn as_ref(&self) -> &[f32] {
        &self.vector
    }
}

pub struct FaceEmbedder {
    engine: Arc<dyn InferenceEngine>,
    embedding_dim: usize,
    input_size: u32,
}

impl FaceEmbedder {
    pub fn new(engine: Arc<dyn InferenceEngine>, embedding_dim: usize, input_size: u32) -> Self {
        Self {
            engine,
            embedding_dim,
            input_size,
        }
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    /// Extract an embedding from a cropped face.
    pub fn embed(&self, face: &DynamicImage) -> anyhow::Result<FaceEmbedding> {
        let input = preprocess_for_embedding(face, self.input_size);
        let outputs = self.engine.infer(&input)?;
        let vector = embedding_output(outputs, self.embedding_dim)?;
        Ok(FaceEmbedding::new(vector)?)
    }
}
