//! Anchor-based face detector
//!
//! Runs the network through an [`InferenceEngine`] and hands the raw
//! outputs to the [`DetectionPipeline`]. Outputs are bounding boxes and
//! 5-point landmarks in original-image pixels.

use std::sync::Arc;

use image::DynamicImage;

use crate::config::{DetectorConfig, Thresholds};

use super::inference::{InferenceEngine, RawOutputs};
use super::pipeline::{Detection, DetectionPipeline};
use super::preprocess::preprocess_for_detection;

pub struct FaceDetector {
    engine: Arc<dyn InferenceEngine>,
    pipeline: DetectionPipeline,
}

impl FaceDetector {
    pub fn new(
        engine: Arc<dyn InferenceEngine>,
        config: DetectorConfig,
        thresholds: Thresholds,
        scores_are_logits: bool,
    ) -> crate::error::Result<Self> {
        Ok(Self {
            engine,
            pipeline: DetectionPipeline::new(config, thresholds, scores_are_logits)?,
        })
    }

    pub fn pipeline(&self) -> &DetectionPipeline {
        &self.pipeline
    }

    /// Detect faces, largest first. An empty list means no face was found.
    pub fn detect(&self, image: &DynamicImage) -> anyhow::Result<Vec<Detection>> {
        let input = preprocess_for_detection(image, self.pipeline.config().input_size);

        let tensors = self.engine.infer(&input.tensor)?;
        let outputs = RawOutputs::identify(tensors)?;

        let detections = self.pipeline.run(&outputs, input.input, input.original)?;
        tracing::info!("Detected {} faces after NMS", detections.len());

        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Architecture;
    use crate::engine::anchors::anchor_count;
    use crate::engine::inference::OutputTensor;
    use image::{Rgb, RgbImage};
    use ndarray::Array4;

    /// Returns all-background outputs sized for the configured priors.
    struct BlankEngine {
        priors: usize,
    }

    impl InferenceEngine for BlankEngine {
        fn infer(&self, _input: &Array4<f32>) -> anyhow::Result<Vec<OutputTensor>> {
            let n = self.priors;
            Ok(vec![
                OutputTensor::new(vec![1, n, 2], [1.0, 0.0].repeat(n)),
                OutputTensor::new(vec![1, n, 10], vec![0.0; n * 10]),
                OutputTensor::new(vec![1, n, 4], vec![0.0; n * 4]),
            ])
        }
    }

    #[test]
    fn test_blank_image_yields_no_faces() {
        let mut config = DetectorConfig::for_architecture(Architecture::MobileNet025);
        config.input_size = 64;
        let priors = anchor_count(&config, 64, 64);

        let detector = FaceDetector::new(
            Arc::new(BlankEngine { priors }),
            config,
            Thresholds::default(),
            false,
        )
        .unwrap();

        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(320, 240, Rgb([0, 0, 0])));
        assert!(detector.detect(&image).unwrap().is_empty());
    }

    #[test]
    fn test_prior_count_mismatch_surfaces() {
        let mut config = DetectorConfig::for_architecture(Architecture::MobileNet025);
        config.input_size = 64;

        let detector = FaceDetector::new(
            Arc::new(BlankEngine { priors: 7 }),
            config,
            Thresholds::default(),
            false,
        )
        .unwrap();

        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([0, 0, 0])));
        let err = detector.detect(&image).unwrap_err();
        assert!(err.downcast_ref::<crate::error::FaceError>().is_some());
    }
}
