//! Loaded model handles
//!
//! Built once at startup and shared read-only (behind an `Arc`) by every
//! request. Nothing in here is mutated after construction.

use std::sync::Arc;

use tracing::info;

use crate::config::Config;

use super::detector::FaceDetector;
use super::embedder::FaceEmbedder;
use super::inference::InferenceEngine;

/// Model types that can be loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelType {
    Detector,
    Embedder,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Detector => "detector",
            ModelType::Embedder => "embedder",
        }
    }
}

pub struct ModelContext {
    detector: FaceDetector,
    embedder: FaceEmbedder,
}

impl ModelContext {
    /// Wrap already-loaded engines.
    pub fn new(
        config: &Config,
        detector_engine: Arc<dyn InferenceEngine>,
        embedder_engine: Arc<dyn InferenceEngine>,
    ) -> anyhow::Result<Self> {
        let detector_config = config.detector.detector_config();
        info!(
            "Detector {} at {}x{}",
            detector_config.architecture.as_str(),
            detector_config.input_size,
            detector_config.input_size
        );

        let detector = FaceDetector::new(
            detector_engine,
            detector_config,
            config.detector.thresholds,
            config.detector.scores_are_logits,
        )?;
        let embedder = FaceEmbedder::new(
            embedder_engine,
            config.recognition.embedding_dim,
            config.recognition.input_size,
        );

        Ok(Self { detector, embedder })
    }

    /// Load both networks through OpenVINO.
    #[cfg(feature = "openvino")]
    pub fn load(config: &Config) -> anyhow::Result<Self> {
        use super::openvino::OpenVinoEngine;

        let device = config.inference.device.as_str();
        let detector = OpenVinoEngine::load(ModelType::Detector, &config.models.detector, device)?;
        let embedder = OpenVinoEngine::load(ModelType::Embedder, &config.models.embedder, device)?;

        Self::new(config, Arc::new(detector), Arc::new(embedder))
    }

    pub fn detector(&self) -> &FaceDetector {
        &self.detector
    }

    pub fn embedder(&self) -> &FaceEmbedder {
        &self.embedder
    }
}
