//! Face Service - Core business logic
//!
//! Orchestrates detection, embedding, and similarity search. All model work
//! runs on the blocking thread pool so request handling is never stalled by
//! CPU-bound post-processing.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use image::DynamicImage;
use tracing::info;

use crate::config::Config;
use crate::engine::preprocess::crop_face;
use crate::engine::{Detection, FaceEmbedding, ModelContext};
use crate::error::FaceError;
use crate::storage::{Metric, SimilarityStore};

use super::types::*;

/// Face recognition service
pub struct FaceService<S: SimilarityStore> {
    context: Arc<ModelContext>,
    store: Arc<S>,
    config: Config,
}

impl<S: SimilarityStore> FaceService<S> {
    pub fn new(context: Arc<ModelContext>, store: Arc<S>, config: Config) -> Self {
        Self {
            context,
            store,
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Detect faces in an image
    pub async fn detect(&self, image: DynamicImage) -> Result<DetectionResult> {
        let start = Instant::now();
        let faces = self.detect_faces(Arc::new(image)).await?;

        Ok(DetectionResult {
            faces,
            inference_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Register the single face in `image` under `face_id`
    pub async fn register(&self, face_id: &str, image: DynamicImage) -> Result<RegisterResult> {
        let start = Instant::now();
        let image = Arc::new(image);

        let mut faces = self.detect_faces(image.clone()).await?;

        if faces.is_empty() {
            return Ok(RegisterResult {
                success: false,
                face_id: face_id.to_string(),
                message: "No face detected in the image".to_string(),
            });
        }

        if faces.len() > 1 {
            return Ok(RegisterResult {
                success: false,
                face_id: face_id.to_string(),
                message: format!(
                    "Multiple faces detected ({}). Please provide an image with a single face.",
                    faces.len()
                ),
            });
        }

        let face = faces.remove(0);
        let embedding = self.embed_face(image, face).await?;
        self.store.insert(face_id, embedding).await?;

        info!("Registered face {} in {}ms", face_id, start.elapsed().as_millis());

        Ok(RegisterResult {
            success: true,
            face_id: face_id.to_string(),
            message: "Face registered successfully".to_string(),
        })
    }

    /// Compare the largest face of each image
    pub async fn compare(&self, first: DynamicImage, second: DynamicImage) -> Result<CompareResult> {
        let start = Instant::now();

        let (a, b) = tokio::try_join!(
            self.extract_embedding(Arc::new(first)),
            self.extract_embedding(Arc::new(second)),
        )?;

        let comparison = a.compare(&b)?;
        let is_same_person = comparison.cosine >= self.config.recognition.similarity_threshold;

        Ok(CompareResult {
            cosine: comparison.cosine,
            euclidean: comparison.euclidean,
            is_same_person,
            inference_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Identify all faces in the image against the store
    pub async fn identify(
        &self,
        image: DynamicImage,
        top_k: Option<usize>,
        threshold: Option<f32>,
    ) -> Result<IdentifyResult> {
        let start = Instant::now();
        let image = Arc::new(image);

        let top_k = top_k.unwrap_or(self.config.recognition.search_limit);
        let threshold = threshold.unwrap_or(self.config.recognition.similarity_threshold);

        let detected = self.detect_faces(image.clone()).await?;

        let mut faces = Vec::with_capacity(detected.len());
        for face in detected {
            let embedding = self.embed_face(image.clone(), face.clone()).await?;

            let matches = self
                .store
                .query(&embedding, top_k, Metric::Cosine)
                .await?
                .into_iter()
                .filter(|r| r.score >= threshold)
                .map(|r| IdentifyMatch {
                    face_id: r.face_id,
                    similarity: r.score,
                })
                .collect();

            faces.push(FaceIdentification { face, matches });
        }

        Ok(IdentifyResult {
            faces,
            inference_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Remove a registered face
    pub async fn remove(&self, face_id: &str) -> Result<bool> {
        Ok(self.store.remove(face_id).await?)
    }

    async fn detect_faces(&self, image: Arc<DynamicImage>) -> Result<Vec<Detection>> {
        let context = self.context.clone();
        tokio::task::spawn_blocking(move || context.detector().detect(&image)).await?
    }

    async fn embed_face(&self, image: Arc<DynamicImage>, face: Detection) -> Result<FaceEmbedding> {
        let context = self.context.clone();
        let margin = self.config.recognition.crop_margin;

        tokio::task::spawn_blocking(move || {
            let crop = crop_face(&image, &face, margin)
                .ok_or_else(|| anyhow::anyhow!("Detected face has an empty crop"))?;
            context.embedder().embed(&crop)
        })
        .await?
    }

    /// Embedding of the largest face in the image
    async fn extract_embedding(&self, image: Arc<DynamicImage>) -> Result<FaceEmbedding> {
        let faces = self.detect_faces(image.clone()).await?;
        let face = faces.into_iter().next().ok_or(FaceError::NoFaceDetected)?;
        self.embed_face(image, face).await
    }
}
