//! Greedy non-maximum suppression
//!
//! Overlap uses [`BBox::iou`], the fractional-area convention, at every call
//! site.

use super::geometry::BBox;

/// Return the indices of `boxes` that survive suppression, best first.
///
/// A box is suppressed when its IoU with an already kept box is strictly
/// greater than `iou_threshold`. Equal scores resolve to the lower index.
pub fn suppress(boxes: &[BBox], scores: &[f32], iou_threshold: f32, keep_top_k: usize) -> Vec<usize> {
    debug_assert_eq!(boxes.len(), scores.len());

    let mut order: Vec<usize> = (0..boxes.len().min(scores.len())).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));

    let mut keep = Vec::new();
    let mut suppressed = vec![false; order.len()];

    for i in 0..order.len() {
        if keep.len() == keep_top_k {
            break;
        }
        if suppressed[i] {
            continue;
        }

        let current = order[i];
        keep.push(current);

        for j in (i + 1)..order.len() {
            if suppressed[j] {
                continue;
            }
            if boxes[current].iou(&boxes[order[j]]) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}
