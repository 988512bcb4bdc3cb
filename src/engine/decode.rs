//! Regression decoding against the prior boxes

use crate::error::{FaceError, Result};

use super::anchors::Anchor;
use super::geometry::{BBox, Point};

pub const LOC_DIM: usize = 4;
pub const SCORE_DIM: usize = 2;
pub const LANDMARK_DIM: usize = 10;
pub const NUM_LANDMARKS: usize = 5;

/// Decoded boxes and landmarks, one entry per anchor, in normalized space.
#[derive(Debug, Clone, Default)]
pub struct Decoded {
    pub boxes: Vec<BBox>,
    pub landmarks: Vec<[Point; NUM_LANDMARKS]>,
}

pub fn decode(
    raw_locations: &[f32],
    raw_landmarks: &[f32],
    anchors: &[Anchor],
    variance: [f32; 2],
) -> Result<Decoded> {
    Ok(Decoded {
        boxes: decode_boxes(raw_locations, anchors, variance)?,
        landmarks: decode_landmarks(raw_landmarks, anchors, variance)?,
    })
}

pub fn decode_boxes(raw: &[f32], anchors: &[Anchor], variance: [f32; 2]) -> Result<Vec<BBox>> {
    check_len("locations", raw.len(), anchors.len() * LOC_DIM)?;

    let boxes = raw
        .chunks_exact(LOC_DIM)
        .zip(anchors)
        .map(|(loc, a)| {
            let cx = a.cx + loc[0] * variance[0] * a.w;
            let cy = a.cy + loc[1] * variance[0] * a.h;
            let w = a.w * (loc[2] * variance[1]).exp();
            let h = a.h * (loc[3] * variance[1]).exp();
            BBox::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
        })
        .collect();

    Ok(boxes)
}

pub fn decode_landmarks(
    raw: &[f32],
    anchors: &[Anchor],
    variance: [f32; 2],
) -> Result<Vec<[Point; NUM_LANDMARKS]>> {
    check_len("landmarks", raw.len(), anchors.len() * LANDMARK_DIM)?;

    let landmarks = raw
        .chunks_exact(LANDMARK_DIM)
        .zip(anchors)
        .map(|(delta, a)| {
            let mut points = [Point::default(); NUM_LANDMARKS];
            for (p, point) in points.iter_mut().enumerate() {
                point.x = a.cx + delta[2 * p] * variance[0] * a.w;
                point.y = a.cy + delta[2 * p + 1] * variance[0] * a.h;
            }
            points
        })
        .collect();

    Ok(landmarks)
}

/// Pull the face column out of the `[N, 2]` classification tensor.
///
/// With `logits` set each row goes through softmax first.
pub fn face_scores(raw: &[f32], anchor_count: usize, logits: bool) -> Result<Vec<f32>> {
    check_len("scores", raw.len(), anchor_count * SCORE_DIM)?;

    let scores = raw
        .chunks_exact(SCORE_DIM)
        .map(|row| {
            if logits {
                crate::utils::math::softmax(row)[1]
            } else {
                row[1]
            }
        })
        .collect();

    Ok(scores)
}

fn check_len(what: &'static str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(FaceError::ShapeMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARIANCE: [f32; 2] = [0.1, 0.2];

    fn center_anchor() -> Anchor {
        Anchor { cx: 0.5, cy: 0.5, w: 0.2, h: 0.2 }
    }

    #[test]
    fn test_zero_deltas_are_identity() {
        let boxes = decode_boxes(&[0.0; 4], &[center_anchor()], VARIANCE).unwrap();
        let b = boxes[0];

        assert!(((b.x1 + b.x2) / 2.0 - 0.5).abs() < 1e-6);
        assert!(((b.y1 + b.y2) / 2.0 - 0.5).abs() < 1e-6);
        assert!((b.x2 - b.x1 - 0.2).abs() < 1e-6);
        assert!((b.y2 - b.y1 - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_box_decode_formula() {
        let loc = [1.0, -2.0, 0.5, 0.0];
        let b = decode_boxes(&loc, &[center_anchor()], VARIANCE).unwrap()[0];

        let cx = 0.5 + 1.0 * 0.1 * 0.2;
        let cy = 0.5 - 2.0 * 0.1 * 0.2;
        let w = 0.2 * (0.5f32 * 0.2).exp();
        assert!((b.x1 - (cx - w / 2.0)).abs() < 1e-6);
        assert!((b.x2 - (cx + w / 2.0)).abs() < 1e-6);
        assert!((b.y1 - (cy - 0.1)).abs() < 1e-6);
        assert!((b.y2 - (cy + 0.1)).abs() < 1e-6);
    }

    #[test]
    fn test_landmark_decode() {
        let mut delta = [0.0f32; 10];
        delta[4] = 1.0; // nose x
        delta[9] = -1.0; // mouth right y
        let points = decode_landmarks(&delta, &[center_anchor()], VARIANCE).unwrap()[0];

        assert_eq!(points[0], Point::new(0.5, 0.5));
        assert!((points[2].x - 0.52).abs() < 1e-6);
        assert_eq!(points[2].y, 0.5);
        assert!((points[4].y - 0.48).abs() < 1e-6);
    }

    #[test]
    fn test_length_mismatch_fails_fast() {
        let anchors = [center_anchor(), center_anchor()];
        let err = decode(&[0.0; 4], &[0.0; 20], &anchors, VARIANCE).unwrap_err();
        assert!(matches!(
            err,
            FaceError::ShapeMismatch { what: "locations", expected: 8, actual: 4 }
        ));

        let err = decode_landmarks(&[0.0; 30], &anchors, VARIANCE).unwrap_err();
        assert!(matches!(err, FaceError::ShapeMismatch { what: "landmarks", .. }));
    }

    #[test]
    fn test_face_scores() {
        let raw = [0.9, 0.1, 0.2, 0.8];
        assert_eq!(face_scores(&raw, 2, false).unwrap(), vec![0.1, 0.8]);

        let logits = face_scores(&[0.0, 0.0], 1, true).unwrap();
        assert!((logits[0] - 0.5).abs() < 1e-6);

        assert!(face_scores(&raw, 3, false).is_err());
    }
}
