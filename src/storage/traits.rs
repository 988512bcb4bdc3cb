//! Similarity store abstraction
//!
//! The query contract the service issues against a vector store. Stores may
//! be approximate but must rank deterministically for identical contents.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::engine::FaceEmbedding;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Higher is better, in [-1, 1].
    Cosine,
    /// Lower is better.
    Euclidean,
}

/// One ranked hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub face_id: String,
    pub score: f32,
}

#[async_trait]
pub trait SimilarityStore: Send + Sync + 'static {
    /// Add an embedding. An existing id is replaced.
    async fn insert(&self, face_id: &str, embedding: FaceEmbedding) -> Result<()>;

    /// Remove an embedding, reporting whether it existed.
    async fn remove(&self, face_id: &str) -> Result<bool>;

    /// Up to `k` stored ids, best first. Ties keep insertion order.
    async fn query(&self, embedding: &FaceEmbedding, k: usize, metric: Metric) -> Result<Vec<SimilarityResult>>;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
