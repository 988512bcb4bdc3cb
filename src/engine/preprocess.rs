//! Image to tensor conversion for the detector and embedder

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::Array4;

use super::pipeline::Detection;
use super::project::ImageSize;

/// Per-channel means subtracted from BGR pixels for the detector.
const DETECTOR_MEAN_BGR: [f32; 3] = [104.0, 117.0, 123.0];

/// Detector input tensor together with the size of the image it came from.
pub struct DetectorInput {
    pub tensor: Array4<f32>,
    pub original: ImageSize,
    pub input: ImageSize,
}

/// Stretch the image to `size`x`size`, reorder to BGR and subtract the
/// channel means.
///
/// The original dimensions are read before resizing; projecting detections
/// back depends on them.
pub fn preprocess_for_detection(image: &DynamicImage, size: u32) -> DetectorInput {
    let (orig_w, orig_h) = image.dimensions();
    let original = ImageSize::new(orig_w, orig_h);

    let resized = image.resize_exact(size, size, FilterType::Triangle);
    let tensor = image_to_nchw(&resized, |value, channel| value - DETECTOR_MEAN_BGR[channel]);

    DetectorInput {
        tensor,
        original,
        input: ImageSize::new(size, size),
    }
}

/// Resize a face crop to `size`x`size` and scale BGR values into [-1, 1].
pub fn preprocess_for_embedding(face: &DynamicImage, size: u32) -> Array4<f32> {
    let resized = face.resize_exact(size, size, FilterType::Triangle);
    image_to_nchw(&resized, |value, _| (value - 127.5) / 127.5)
}

/// Convert image to a `[1, 3, H, W]` BGR tensor, mapping each value through
/// `normalize(value, bgr_channel)`.
fn image_to_nchw(image: &DynamicImage, normalize: impl Fn(f32, usize) -> f32) -> Array4<f32> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        let bgr = [pixel[2] as f32, pixel[1] as f32, pixel[0] as f32];
        for (c, &value) in bgr.iter().enumerate() {
            tensor[[0, c, y, x]] = normalize(value, c);
        }
    }

    tensor
}

/// Cut a detected face out of the original image, grown by `margin` of its
/// size on each side and clamped to the image.
pub fn crop_face(image: &DynamicImage, detection: &Detection, margin: f32) -> Option<DynamicImage> {
    let (img_w, img_h) = image.dimensions();
    let b = detection.bounding_box;

    let margin_x = b.width as f32 * margin;
    let margin_y = b.height as f32 * margin;

    let x1 = (b.left as f32 - margin_x).max(0.0) as u32;
    let y1 = (b.top as f32 - margin_y).max(0.0) as u32;
    let x2 = ((b.left + b.width) as f32 + margin_x).min(img_w as f32) as u32;
    let y2 = ((b.top + b.height) as f32 + margin_y).min(img_h as f32) as u32;

    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some(image.crop_imm(x1, y1, x2 - x1, y2 - y1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::geometry::BBox;
    use crate::engine::pipeline::{Landmark, LandmarkType, PixelBox};
    use image::{Rgb, RgbImage};

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(rgb)))
    }

    #[test]
    fn test_detection_input_keeps_original_size() {
        let input = preprocess_for_detection(&solid(1920, 1280, [10, 20, 30]), 64);

        assert_eq!(input.original, ImageSize::new(1920, 1280));
        assert_eq!(input.input, ImageSize::new(64, 64));
        assert_eq!(input.tensor.shape(), &[1, 3, 64, 64]);

        // BGR order, mean subtracted
        assert_eq!(input.tensor[[0, 0, 5, 5]], 30.0 - 104.0);
        assert_eq!(input.tensor[[0, 1, 5, 5]], 20.0 - 117.0);
        assert_eq!(input.tensor[[0, 2, 5, 5]], 10.0 - 123.0);
    }

    #[test]
    fn test_embedding_input_range() {
        let tensor = preprocess_for_embedding(&solid(50, 60, [255, 0, 255]), 112);
        assert_eq!(tensor.shape(), &[1, 3, 112, 112]);
        assert_eq!(tensor[[0, 0, 0, 0]], 1.0);
        assert_eq!(tensor[[0, 1, 0, 0]], -1.0);
    }

    fn detection(left: u32, top: u32, width: u32, height: u32) -> Detection {
        Detection {
            bounding_box: PixelBox { left, top, width, height },
            normalized_box: BBox::default(),
            confidence: 99.0,
            area: 0.0,
            landmarks: [Landmark { kind: LandmarkType::Nose, x: 0.0, y: 0.0, pixel_x: 0, pixel_y: 0 }; 5],
        }
    }

    #[test]
    fn test_crop_face_with_margin() {
        let image = solid(200, 100, [0, 0, 0]);
        let crop = crop_face(&image, &detection(50, 20, 40, 40), 0.1).unwrap();
        assert_eq!(crop.dimensions(), (48, 48));

        // Clamped at the border
        let crop = crop_face(&image, &detection(180, 80, 20, 20), 0.5).unwrap();
        assert_eq!(crop.dimensions(), (30, 30));

        assert!(crop_face(&image, &detection(10, 10, 0, 0), 0.1).is_none());
    }
}
