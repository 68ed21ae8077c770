//! Candidate region proposal.
//!
//! Turns a raw frame into bounding rectangles that may contain a sign:
//! grayscale -> Gaussian smoothing -> Canny edges -> outer contours ->
//! area filter. Contour area is the only plausibility test; no aspect,
//! shape, or color filtering happens here. The frame is read-only.

use image::{imageops, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::point::Point;

use crate::frame::Region;

/// Contours enclosing at most this many square pixels are discarded.
pub const DEFAULT_MIN_REGION_AREA: f64 = 1000.0;
/// Canny hysteresis thresholds.
pub const DEFAULT_CANNY_LOW: f32 = 50.0;
pub const DEFAULT_CANNY_HIGH: f32 = 150.0;
/// Smoothing sigma equivalent to a 5x5 Gaussian kernel with auto sigma.
pub const DEFAULT_BLUR_SIGMA: f32 = 1.1;

/// Edge/contour based region proposer.
#[derive(Clone, Debug)]
pub struct RegionProposer {
    min_area: f64,
    canny_low: f32,
    canny_high: f32,
    blur_sigma: f32,
}

impl RegionProposer {
    pub fn new(min_area: f64, canny_low: f32, canny_high: f32, blur_sigma: f32) -> Self {
        Self {
            min_area,
            canny_low,
            canny_high,
            blur_sigma,
        }
    }

    /// Propose candidate regions for one frame.
    ///
    /// Yields a finite, consume-once sequence. Ordering follows the
    /// contour finder and carries no meaning for callers; for identical
    /// input frames the produced set is identical.
    pub fn propose(&self, image: &RgbImage) -> impl Iterator<Item = Region> {
        let gray = imageops::grayscale(image);
        let blurred = gaussian_blur_f32(&gray, self.blur_sigma);
        let edges = canny(&blurred, self.canny_low, self.canny_high);

        let min_area = self.min_area;
        find_contours::<u32>(&edges)
            .into_iter()
            .filter(|contour| contour.border_type == BorderType::Outer)
            .filter(move |contour| contour_area(&contour.points) > min_area)
            .filter_map(|contour| bounding_region(&contour.points))
    }
}

impl Default for RegionProposer {
    fn default() -> Self {
        Self::new(
            DEFAULT_MIN_REGION_AREA,
            DEFAULT_CANNY_LOW,
            DEFAULT_CANNY_HIGH,
            DEFAULT_BLUR_SIGMA,
        )
    }
}

/// Area enclosed by a boundary polygon (shoelace sum over its points).
fn contour_area(points: &[Point<u32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut doubled: i64 = 0;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        doubled += i64::from(p.x) * i64::from(q.y) - i64::from(q.x) * i64::from(p.y);
    }
    doubled.unsigned_abs() as f64 / 2.0
}

/// Minimal axis-aligned bounding rectangle of a point set.
fn bounding_region(points: &[Point<u32>]) -> Option<Region> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(Region::new(
        min_x,
        min_y,
        max_x - min_x + 1,
        max_y - min_y + 1,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    /// Dark frame with one bright filled square, enough contrast for Canny.
    fn frame_with_square(side: u32) -> RgbImage {
        let mut image = RgbImage::from_pixel(320, 240, Rgb([16, 16, 16]));
        draw_filled_rect_mut(
            &mut image,
            Rect::at(80, 60).of_size(side, side),
            Rgb([235, 235, 235]),
        );
        image
    }

    #[test]
    fn bright_square_produces_one_region() {
        let proposer = RegionProposer::default();
        let regions: Vec<Region> = proposer.propose(&frame_with_square(80)).collect();
        assert_eq!(regions.len(), 1);

        let region = regions[0];
        // The contour hugs the square's edge; allow a few pixels of slack
        // for smoothing.
        assert!(region.x >= 74 && region.x <= 86, "x = {}", region.x);
        assert!(region.y >= 54 && region.y <= 66, "y = {}", region.y);
        assert!(region.width >= 70 && region.width <= 90, "w = {}", region.width);
        assert!(region.height >= 70 && region.height <= 90, "h = {}", region.height);
    }

    #[test]
    fn small_contours_are_discarded() {
        // A 20x20 square encloses ~400 px^2, below the 1000 px^2 floor.
        let proposer = RegionProposer::default();
        let regions: Vec<Region> = proposer.propose(&frame_with_square(20)).collect();
        assert!(regions.is_empty(), "got {:?}", regions);
    }

    #[test]
    fn proposal_is_deterministic_for_identical_frames() {
        let proposer = RegionProposer::default();
        let frame = frame_with_square(90);
        let first: Vec<Region> = proposer.propose(&frame).collect();
        let second: Vec<Region> = proposer.propose(&frame).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn featureless_frame_proposes_nothing() {
        let proposer = RegionProposer::default();
        let flat = RgbImage::from_pixel(160, 120, Rgb([90, 90, 90]));
        assert_eq!(proposer.propose(&flat).count(), 0);
    }

    #[test]
    fn shoelace_area_of_unit_square_boundary() {
        let points = vec![
            Point::new(0u32, 0u32),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ];
        assert_eq!(contour_area(&points), 100.0);
    }
}
