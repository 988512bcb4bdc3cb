//! Detection post-processing pipeline
//!
//! Raw detector tensors in, ordered [`Detection`] records out:
//! priors -> decode -> low threshold + top-k -> NMS -> visibility threshold
//! -> projection to original pixels -> largest face first.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{DetectorConfig, Thresholds};
use crate::error::Result;

use super::anchors::PriorCache;
use super::decode::{self, NUM_LANDMARKS};
use super::filter::{self, Candidate};
use super::geometry::{BBox, Point};
use super::inference::RawOutputs;
use super::nms;
use super::project::{project_box, project_point, ImageSize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LandmarkType {
    EyeLeft,
    EyeRight,
    Nose,
    MouthLeft,
    MouthRight,
}

impl LandmarkType {
    /// Order in which the detector emits its five points.
    pub const ORDER: [LandmarkType; NUM_LANDMARKS] = [
        LandmarkType::EyeLeft,
        LandmarkType::EyeRight,
        LandmarkType::Nose,
        LandmarkType::MouthLeft,
        LandmarkType::MouthRight,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    #[serde(rename = "type")]
    pub kind: LandmarkType,
    /// Normalized to the original image.
    pub x: f32,
    pub y: f32,
    pub pixel_x: i32,
    pub pixel_y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBox {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// A face as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub bounding_box: PixelBox,
    #[serde(skip_serializing)]
    pub normalized_box: BBox,
    /// Percentage in [0, 100].
    pub confidence: f32,
    /// Fraction of the image covered by the box.
    #[serde(skip_serializing)]
    pub area: f32,
    pub landmarks: [Landmark; NUM_LANDMARKS],
}

impl Detection {
    pub fn from_candidate(candidate: &Candidate, original: ImageSize) -> Self {
        let normalized_box = candidate.bbox.clamp_unit();
        let pixel = project_box(&normalized_box, original);

        let left = round_clamped(pixel.x1, original.width);
        let top = round_clamped(pixel.y1, original.height);
        let right = round_clamped(pixel.x2, original.width);
        let bottom = round_clamped(pixel.y2, original.height);

        let landmarks = std::array::from_fn(|i| {
            let point: Point = candidate.landmarks[i];
            let pixel = project_point(&point, original);
            Landmark {
                kind: LandmarkType::ORDER[i],
                x: point.x,
                y: point.y,
                pixel_x: pixel.x.round() as i32,
                pixel_y: pixel.y.round() as i32,
            }
        });

        Self {
            bounding_box: PixelBox {
                left,
                top,
                width: right.saturating_sub(left),
                height: bottom.saturating_sub(top),
            },
            normalized_box,
            confidence: candidate.score * 100.0,
            area: normalized_box.area(),
            landmarks,
        }
    }
}

fn round_clamped(value: f32, max: u32) -> u32 {
    (value.round().max(0.0) as u32).min(max)
}

/// Largest face first. Equal areas keep their incoming order.
pub fn sort_by_area(detections: &mut [Detection]) {
    detections.sort_by(|a, b| b.area.total_cmp(&a.area));
}

/// Post-processing for one loaded detector.
pub struct DetectionPipeline {
    config: DetectorConfig,
    thresholds: Thresholds,
    scores_are_logits: bool,
    priors: PriorCache,
}

impl DetectionPipeline {
    pub fn new(config: DetectorConfig, thresholds: Thresholds, scores_are_logits: bool) -> Result<Self> {
        config.validate()?;
        thresholds.validate()?;
        Ok(Self {
            config,
            thresholds,
            scores_are_logits,
            priors: PriorCache::new(),
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Survivors of suppression and the visibility threshold, best score
    /// first, still in normalized coordinates.
    pub fn candidates(&self, outputs: &RawOutputs, input: ImageSize) -> Result<Vec<Candidate>> {
        let t = &self.thresholds;
        let anchors = self.priors.get(&self.config, input.width, input.height);

        let scores = decode::face_scores(&outputs.scores, anchors.len(), self.scores_are_logits)?;
        let decoded = decode::decode(
            &outputs.locations,
            &outputs.landmarks,
            &anchors,
            self.config.variance,
        )?;

        let candidates = filter::filter(&decoded, &scores, t.low_threshold, t.top_k);
        debug!("{} of {} priors above low threshold", candidates.len(), anchors.len());

        let boxes: Vec<BBox> = candidates.iter().map(|c| c.bbox).collect();
        let candidate_scores: Vec<f32> = candidates.iter().map(|c| c.score).collect();
        let keep = nms::suppress(&boxes, &candidate_scores, t.nms_threshold, t.keep_top_k);
        debug!("{} candidates after NMS", keep.len());

        Ok(keep
            .into_iter()
            .map(|i| &candidates[i])
            .filter(|c| c.score >= t.visibility_threshold)
            .cloned()
            .collect())
    }

    /// Run the full pipeline. `input` is the resolution the network saw,
    /// `original` the image size before it was resized for the network.
    ///
    /// An empty result means no face; it is not an error here.
    pub fn run(&self, outputs: &RawOutputs, input: ImageSize, original: ImageSize) -> Result<Vec<Detection>> {
        let candidates = self.candidates(outputs, input)?;

        let mut detections: Vec<Detection> = candidates
            .iter()
            .map(|c| Detection::from_candidate(c, original))
            .collect();
        sort_by_area(&mut detections);

        Ok(detections)
    }
}
