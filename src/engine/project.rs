//! Normalized-to-pixel projection
//!
//! Scale factors are always the original image dimensions, captured before
//! the image is resized to the network input. Values stay fractional here;
//! rounding happens when the public record is assembled.

use super::decode::NUM_LANDMARKS;
use super::geometry::{BBox, Point};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

pub fn project_box(normalized: &BBox, original: ImageSize) -> BBox {
    let (w, h) = (original.width as f32, original.height as f32);
    BBox::new(normalized.x1 * w, normalized.y1 * h, normalized.x2 * w, normalized.y2 * h)
}

pub fn project_point(normalized: &Point, original: ImageSize) -> Point {
    Point::new(
        normalized.x * original.width as f32,
        normalized.y * original.height as f32,
    )
}

/// Project a batch of boxes and their landmarks.
pub fn project(
    boxes: &[BBox],
    landmarks: &[[Point; NUM_LANDMARKS]],
    original: ImageSize,
) -> (Vec<BBox>, Vec<[Point; NUM_LANDMARKS]>) {
    let pixel_boxes = boxes.iter().map(|b| project_box(b, original)).collect();
    let pixel_landmarks = landmarks
        .iter()
        .map(|points| points.map(|p| project_point(&p, original)))
        .collect();
    (pixel_boxes, pixel_landmarks)
}
