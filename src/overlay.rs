//! In-place frame annotation.
//!
//! Announced detections get a green box and the sign name drawn directly
//! onto the frame before it reaches the display sink.

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use anyhow::{anyhow, Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::frame::Region;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BOX_THICKNESS: u32 = 2;
const LABEL_HEIGHT_PX: f32 = 24.0;
/// Label top edge sits this far above the box (glyph height + gap).
const LABEL_RAISE_PX: i32 = 28;

/// Draws detection boxes and labels onto frames.
///
/// The font is loaded once at startup. Without a configured font the
/// annotator degrades to rectangle-only output.
pub struct Annotator {
    font: Option<FontVec>,
}

impl Annotator {
    /// Rectangle-only annotator.
    pub fn new() -> Self {
        Self { font: None }
    }

    /// Annotator with label text, when a font path is configured.
    ///
    /// An unreadable or invalid font file is a startup error; no font path
    /// at all just disables labels.
    pub fn from_font_path(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            log::info!("overlay: no font configured, drawing rectangles only");
            return Ok(Self::new());
        };
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read overlay font {}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|_| anyhow!("overlay font {} is not a valid font file", path.display()))?;
        Ok(Self { font: Some(font) })
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Draw the bounding box and label for one detection in place.
    pub fn annotate(&self, image: &mut RgbImage, region: &Region, label: &str) {
        for inset in 0..BOX_THICKNESS {
            if region.width <= inset * 2 || region.height <= inset * 2 {
                break;
            }
            let rect = Rect::at((region.x + inset) as i32, (region.y + inset) as i32)
                .of_size(region.width - inset * 2, region.height - inset * 2);
            draw_hollow_rect_mut(image, rect, BOX_COLOR);
        }

        if let Some(font) = &self.font {
            let text_y = (region.y as i32 - LABEL_RAISE_PX).max(0);
            draw_text_mut(
                image,
                BOX_COLOR,
                region.x as i32,
                text_y,
                PxScale::from(LABEL_HEIGHT_PX),
                font,
                label,
            );
        }
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotate_draws_the_box_outline() {
        let mut image = RgbImage::from_pixel(200, 150, Rgb([0, 0, 0]));
        let region = Region::new(40, 30, 60, 50);
        Annotator::new().annotate(&mut image, &region, "Stop");

        // Both thickness rings of the top edge are green.
        assert_eq!(image.get_pixel(40, 30), &BOX_COLOR);
        assert_eq!(image.get_pixel(41, 31), &BOX_COLOR);
        // Bottom-right corner of the outer ring.
        assert_eq!(image.get_pixel(99, 79), &BOX_COLOR);
        // The interior stays untouched.
        assert_eq!(image.get_pixel(70, 55), &Rgb([0, 0, 0]));
    }

    #[test]
    fn degenerate_regions_do_not_panic() {
        let mut image = RgbImage::from_pixel(50, 50, Rgb([0, 0, 0]));
        Annotator::new().annotate(&mut image, &Region::new(10, 10, 1, 1), "Stop");
        Annotator::new().annotate(&mut image, &Region::new(10, 10, 3, 3), "Stop");
    }

    #[test]
    fn missing_font_path_is_not_an_error() {
        let annotator = Annotator::from_font_path(None).unwrap();
        assert!(!annotator.has_font());
    }

    #[test]
    fn invalid_font_file_is_a_startup_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"not a font").unwrap();
        assert!(Annotator::from_font_path(Some(file.path())).is_err());
    }
}
