//! Sign classification.
//!
//! `SignClassifier` adapts a crop to the model's expected tensor and maps
//! the raw score vector to a (class id, confidence) pair. The model itself
//! sits behind the `ClassifierBackend` trait so real inference and test
//! doubles are interchangeable.

mod backend;
mod backends;

pub use backend::{ClassifierBackend, MODEL_INPUT_HEIGHT, MODEL_INPUT_WIDTH};
pub use backends::ScriptedBackend;

#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;

use anyhow::{anyhow, Context, Result};
use image::{imageops, imageops::FilterType, RgbImage};

use crate::labels;

/// Adapter between cropped frame regions and the opaque model.
pub struct SignClassifier {
    backend: Box<dyn ClassifierBackend>,
}

impl SignClassifier {
    pub fn new(backend: Box<dyn ClassifierBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Classify one cropped region.
    ///
    /// The crop is resized to the model's 30x30 input, kept in RGB channel
    /// order, scaled to `[0, 1]` f32 and given a batch dimension of one.
    /// Returns the 1-indexed class id of the highest score and that score.
    ///
    /// A backend failure or a score vector of the wrong length fails this
    /// region only; callers skip the region and move on.
    pub fn classify(&mut self, region_pixels: &RgbImage) -> Result<(u8, f32)> {
        let resized = imageops::resize(
            region_pixels,
            MODEL_INPUT_WIDTH,
            MODEL_INPUT_HEIGHT,
            FilterType::Triangle,
        );
        let input = tensor_from_rgb(&resized);

        let scores = self
            .backend
            .predict(&input)
            .with_context(|| format!("{} backend inference failed", self.backend.name()))?;

        if scores.len() != labels::CLASS_COUNT {
            return Err(anyhow!(
                "model returned {} scores, expected {}",
                scores.len(),
                labels::CLASS_COUNT
            ));
        }

        let mut best_idx = 0usize;
        let mut best = f32::NEG_INFINITY;
        for (idx, &score) in scores.iter().enumerate() {
            if score > best {
                best = score;
                best_idx = idx;
            }
        }
        if !best.is_finite() {
            return Err(anyhow!("model scores are not finite"));
        }

        Ok(((best_idx + 1) as u8, best))
    }
}

/// Flatten an RGB image into NHWC f32 tensor data in `[0, 1]`.
///
/// Capture sources in this crate hand over RGB frames, so the channel
/// order the model expects is already in place; a capture format with a
/// different order would be swizzled here.
fn tensor_from_rgb(image: &RgbImage) -> Vec<f32> {
    let mut data = Vec::with_capacity((image.width() * image.height() * 3) as usize);
    for pixel in image.pixels() {
        for channel in 0..3 {
            data.push(f32::from(pixel[channel]) / 255.0);
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gray_crop() -> RgbImage {
        RgbImage::from_pixel(60, 45, Rgb([128, 128, 128]))
    }

    #[test]
    fn classify_maps_argmax_to_one_indexed_id() {
        let mut backend = ScriptedBackend::new();
        backend.push_class(15, 0.9);
        let mut classifier = SignClassifier::new(Box::new(backend));

        let (class_id, confidence) = classifier.classify(&gray_crop()).unwrap();
        assert_eq!(class_id, 15);
        assert!((confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn malformed_score_vector_fails_the_region() {
        let mut backend = ScriptedBackend::new();
        backend.push_scores(vec![0.5; 10]);
        let mut classifier = SignClassifier::new(Box::new(backend));

        let err = classifier.classify(&gray_crop()).unwrap_err();
        assert!(err.to_string().contains("expected 43"), "{}", err);
    }

    #[test]
    fn backend_failure_is_reported_not_panicked() {
        let mut backend = ScriptedBackend::new();
        backend.push_failure("model exploded");
        let mut classifier = SignClassifier::new(Box::new(backend));

        assert!(classifier.classify(&gray_crop()).is_err());
    }

    #[test]
    fn tensor_is_batchless_nhwc_in_unit_range() {
        let image = RgbImage::from_pixel(2, 2, Rgb([255, 0, 51]));
        let tensor = tensor_from_rgb(&image);
        assert_eq!(tensor.len(), 2 * 2 * 3);
        assert_eq!(tensor[0], 1.0);
        assert_eq!(tensor[1], 0.0);
        assert!((tensor[2] - 0.2).abs() < 1e-6);
    }
}
