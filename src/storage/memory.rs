//! In-memory similarity store
//!
//! Exact brute-force ranking over every stored embedding. Suitable for tests
//! and small galleries; large deployments put an ANN index behind
//! [`SimilarityStore`] instead.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::engine::compare::{checked_norm, cosine_similarity, euclidean};
use crate::engine::FaceEmbedding;
use crate::error::{FaceError, Result};

use super::traits::{Metric, SimilarityResult, SimilarityStore};

struct Entry {
    face_id: String,
    embedding: FaceEmbedding,
}

#[derive(Default)]
pub struct MemoryStore {
    /// Kept in insertion order.
    entries: RwLock<Vec<Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SimilarityStore for MemoryStore {
    async fn insert(&self, face_id: &str, embedding: FaceEmbedding) -> Result<()> {
        // Anything stored must stay rankable against every later query
        checked_norm(embedding.as_slice())?;

        let mut entries = self.entries.write();
        if let Some(other) = entries.iter().find(|e| e.face_id != face_id) {
            if other.embedding.dim() != embedding.dim() {
                return Err(FaceError::DimensionMismatch {
                    left: other.embedding.dim(),
                    right: embedding.dim(),
                });
            }
        }
        entries.retain(|e| e.face_id != face_id);
        entries.push(Entry {
            face_id: face_id.to_string(),
            embedding,
        });
        debug!("Stored embedding {} ({} total)", face_id, entries.len());
        Ok(())
    }

    async fn remove(&self, face_id: &str) -> Result<bool> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.face_id != face_id);
        Ok(entries.len() < before)
    }

    async fn query(&self, embedding: &FaceEmbedding, k: usize, metric: Metric) -> Result<Vec<SimilarityResult>> {
        let entries = self.entries.read();
        let query = embedding.as_slice();

        let mut results = entries
            .iter()
            .map(|e| {
                let stored = e.embedding.as_slice();
                let score = match metric {
                    Metric::Cosine => cosine_similarity(query, stored)?,
                    Metric::Euclidean => euclidean(query, stored)?,
                };
                Ok(SimilarityResult {
                    face_id: e.face_id.clone(),
                    score,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // Stable sort keeps insertion order among equal scores
        match metric {
            Metric::Cosine => results.sort_by(|a, b| b.score.total_cmp(&a.score)),
            Metric::Euclidean => results.sort_by(|a, b| a.score.total_cmp(&b.score)),
        }
        results.truncate(k);

        Ok(results)
    }

    async fn len(&self) -> usize {
        self.entries.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(v: &[f32]) -> FaceEmbedding {
        FaceEmbedding::new(v.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_cosine_ranking() {
        let store = MemoryStore::new();
        store.insert("a", emb(&[1.0, 0.0])).await.unwrap();
        store.insert("b", emb(&[0.0, 1.0])).await.unwrap();
        store.insert("c", emb(&[1.0, 1.0])).await.unwrap();

        let results = store.query(&emb(&[1.0, 0.1]), 2, Metric::Cosine).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.face_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn test_euclidean_ranking_ascending() {
        let store = MemoryStore::new();
        store.insert("far", emb(&[10.0, 0.0])).await.unwrap();
        store.insert("near", emb(&[1.0, 0.0])).await.unwrap();

        let results = store.query(&emb(&[0.0, 0.0]), 5, Metric::Euclidean).await.unwrap();
        assert_eq!(results[0].face_id, "near");
        assert_eq!(results[0].score, 1.0);
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_ties_follow_insertion_order() {
        let store = MemoryStore::new();
        for id in ["x", "y", "z"] {
            store.insert(id, emb(&[2.0, 2.0])).await.unwrap();
        }

        let results = store.query(&emb(&[1.0, 1.0]), 3, Metric::Cosine).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.face_id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);

        // Re-inserting moves an id to the back
        store.insert("x", emb(&[2.0, 2.0])).await.unwrap();
        let results = store.query(&emb(&[1.0, 1.0]), 3, Metric::Cosine).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.face_id.as_str()).collect();
        assert_eq!(ids, vec!["y", "z", "x"]);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = MemoryStore::new();
        store.insert("a", emb(&[1.0, 0.0])).await.unwrap();

        assert!(store.remove("a").await.unwrap());
        assert!(!store.remove("a").await.unwrap());
        assert!(store.is_empty().await);
        assert!(store.query(&emb(&[1.0, 0.0]), 3, Metric::Cosine).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_surfaces() {
        let store = MemoryStore::new();
        store.insert("a", emb(&[1.0, 0.0, 0.0])).await.unwrap();

        let err = store.query(&emb(&[1.0, 0.0]), 1, Metric::Cosine).await.unwrap_err();
        assert!(matches!(err, FaceError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn test_insert_rejects_unrankable_embeddings() {
        let store = MemoryStore::new();
        store.insert("alice", emb(&[1.0, 0.0])).await.unwrap();

        let err = store.insert("blank", emb(&[0.0, 0.0])).await.unwrap_err();
        assert!(matches!(err, FaceError::InvalidEmbedding(_)));

        let err = store.insert("wide", emb(&[1.0, 0.0, 0.0])).await.unwrap_err();
        assert!(matches!(err, FaceError::DimensionMismatch { left: 2, right: 3 }));

        // Rejected inserts leave queries working
        assert_eq!(store.len().await, 1);
        let results = store.query(&emb(&[1.0, 0.0]), 5, Metric::Cosine).await.unwrap();
        assert_eq!(results[0].face_id, "alice");
    }

    #[tokio::test]
    async fn test_replacing_sole_entry_may_change_dimension() {
        let store = MemoryStore::new();
        store.insert("a", emb(&[1.0, 0.0])).await.unwrap();
        store.insert("a", emb(&[1.0, 0.0, 0.0])).await.unwrap();
        assert_eq!(store.len().await, 1);
    }
}
