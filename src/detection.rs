//! Object detector adapter.
//!
//! A cascade detector is an opaque capability that returns rectangles for a
//! gray image. This module wraps any [`ObjectDetector`] with the
//! preprocessing the cascades expect: the image is shrunk to a working width
//! (detection is much faster on small images and the cascades are trained on
//! small faces anyway), histogram-equalized, searched, and the results are
//! scaled back and clamped inside the original image.
//!
//! Callers hand in 8-bit gray images; convert camera frames with
//! [`crate::utils::image_conversion::to_grayscale`] once per frame.

#[cfg(feature = "opencv")]
/// `OpenCV` cascade classifier backend
pub mod opencv_cascade;

use image::imageops::FilterType;
use image::GrayImage;
use log::debug;

use crate::constants::{DEFAULT_MIN_FEATURE_SIZE, DEFAULT_MIN_NEIGHBORS, DEFAULT_SEARCH_SCALE_FACTOR};
use crate::filters::equalize_hist;
use crate::geometry::{cv_round, Rect};
use crate::utils::safe_cast::u32_to_i32;
use crate::Result;

/// Search strategy hints forwarded to the detector backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchFlags {
    /// Stop at the first (largest) object
    pub find_biggest_object: bool,
    /// Scale the image rather than the detector window
    pub scale_image: bool,
    /// Skip refinement once a candidate is found
    pub do_rough_search: bool,
}

impl SearchFlags {
    pub const FIND_BIGGEST_OBJECT: SearchFlags = SearchFlags {
        find_biggest_object: true,
        scale_image: false,
        do_rough_search: false,
    };

    pub const SCALE_IMAGE: SearchFlags = SearchFlags {
        find_biggest_object: false,
        scale_image: true,
        do_rough_search: false,
    };
}

/// Parameters for one multi-scale search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParams {
    /// Smallest object size (width, height) to report
    pub min_feature_size: (u32, u32),
    /// Scale step between search levels, must be greater than 1.0
    pub search_scale_factor: f32,
    /// Neighbouring hits needed to keep a candidate; higher is stricter
    pub min_neighbors: u32,
    pub flags: SearchFlags,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            min_feature_size: (DEFAULT_MIN_FEATURE_SIZE, DEFAULT_MIN_FEATURE_SIZE),
            search_scale_factor: DEFAULT_SEARCH_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            flags: SearchFlags::default(),
        }
    }
}

impl DetectionParams {
    #[must_use]
    pub fn with_flags(mut self, flags: SearchFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Raw multi-scale object detector (face or eye cascade).
pub trait ObjectDetector: Send {
    /// Find objects in `image`; rectangles are in `image` coordinates
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    fn detect_multi_scale(&mut self, image: &GrayImage, params: &DetectionParams) -> Result<Vec<Rect>>;

    /// Whether the detector has a usable model
    fn is_loaded(&self) -> bool;

    /// Human readable name for logging
    fn name(&self) -> &str {
        "ObjectDetector"
    }
}

/// Shrink, equalize, detect, rescale and clamp.
///
/// `scaled_width` is the working width; images narrower than it are searched
/// at full size.
///
/// # Errors
///
/// Returns an error if the detector backend fails
pub fn detect_objects_custom(
    image: &GrayImage,
    detector: &mut dyn ObjectDetector,
    scaled_width: u32,
    params: &DetectionParams,
) -> Result<Vec<Rect>> {
    let (cols, rows) = image.dimensions();
    if cols == 0 || rows == 0 {
        return Ok(Vec::new());
    }

    let scale = if scaled_width > 0 && cols > scaled_width {
        f64::from(cols) / f64::from(scaled_width)
    } else {
        1.0
    };

    let input = if scale > 1.0 {
        #[allow(clippy::cast_sign_loss)] // Rounded ratio of positive sizes
        let scaled_height = cv_round(f64::from(rows) / scale).max(1) as u32;
        image::imageops::resize(image, scaled_width, scaled_height, FilterType::Triangle)
    } else {
        image.clone()
    };

    let equalized = equalize_hist(&input);
    let raw = detector.detect_multi_scale(&equalized, params)?;
    debug!("{} found {} candidate(s)", detector.name(), raw.len());

    let width = u32_to_i32(cols)?;
    let height = u32_to_i32(rows)?;
    Ok(raw
        .into_iter()
        .map(|r| if scale > 1.0 { r.scale(scale) } else { r })
        .map(|r| r.clamp_within(width, height))
        .filter(Rect::is_found)
        .collect())
}

/// Search for a single object, returning the largest one.
///
/// # Errors
///
/// Returns an error if the detector backend fails
pub fn detect_largest_object(
    image: &GrayImage,
    detector: &mut dyn ObjectDetector,
    scaled_width: u32,
    params: &DetectionParams,
) -> Result<Option<Rect>> {
    let params = params.with_flags(SearchFlags::FIND_BIGGEST_OBJECT);
    let objects = detect_objects_custom(image, detector, scaled_width, &params)?;
    Ok(largest(&objects))
}

/// Search for every object in the image.
///
/// # Errors
///
/// Returns an error if the detector backend fails
pub fn detect_many_objects(
    image: &GrayImage,
    detector: &mut dyn ObjectDetector,
    scaled_width: u32,
    params: &DetectionParams,
) -> Result<Vec<Rect>> {
    let params = params.with_flags(SearchFlags::SCALE_IMAGE);
    detect_objects_custom(image, detector, scaled_width, &params)
}

/// Largest rect by area; the first one wins ties
fn largest(objects: &[Rect]) -> Option<Rect> {
    objects.iter().fold(None, |best: Option<Rect>, r| match best {
        Some(b) if b.area() >= r.area() => Some(b),
        _ => Some(*r),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns fixed rects and records what it was asked
    struct FixedDetector {
        rects: Vec<Rect>,
        seen_sizes: Vec<(u32, u32)>,
        seen_flags: Vec<SearchFlags>,
    }

    impl FixedDetector {
        fn new(rects: Vec<Rect>) -> Self {
            Self {
                rects,
                seen_sizes: Vec::new(),
                seen_flags: Vec::new(),
            }
        }
    }

    impl ObjectDetector for FixedDetector {
        fn detect_multi_scale(&mut self, image: &GrayImage, params: &DetectionParams) -> Result<Vec<Rect>> {
            self.seen_sizes.push(image.dimensions());
            self.seen_flags.push(params.flags);
            Ok(self.rects.clone())
        }

        fn is_loaded(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_wide_images_are_shrunk_and_rects_rescaled() {
        let frame = GrayImage::from_pixel(640, 480, image::Luma([90]));
        let mut det = FixedDetector::new(vec![Rect::new(100, 50, 60, 60)]);
        let found = detect_objects_custom(&frame, &mut det, 320, &DetectionParams::default()).unwrap();

        assert_eq!(det.seen_sizes, vec![(320, 240)]);
        assert_eq!(found, vec![Rect::new(200, 100, 120, 120)]);
    }

    #[test]
    fn test_narrow_images_are_not_resized() {
        let window = GrayImage::from_pixel(30, 20, image::Luma([90]));
        let mut det = FixedDetector::new(vec![Rect::new(2, 2, 5, 5)]);
        let found = detect_objects_custom(&window, &mut det, 30, &DetectionParams::default()).unwrap();
        assert_eq!(det.seen_sizes, vec![(30, 20)]);
        assert_eq!(found, vec![Rect::new(2, 2, 5, 5)]);
    }

    #[test]
    fn test_results_are_clamped_inside_image() {
        let frame = GrayImage::from_pixel(100, 80, image::Luma([90]));
        let mut det = FixedDetector::new(vec![Rect::new(-10, 70, 30, 30)]);
        let found = detect_objects_custom(&frame, &mut det, 320, &DetectionParams::default()).unwrap();
        assert_eq!(found, vec![Rect::new(0, 50, 30, 30)]);
    }

    #[test]
    fn test_largest_and_many_set_flags() {
        let frame = GrayImage::from_pixel(200, 200, image::Luma([90]));
        let mut det = FixedDetector::new(vec![Rect::new(0, 0, 10, 10), Rect::new(50, 50, 40, 40)]);

        let best = detect_largest_object(&frame, &mut det, 320, &DetectionParams::default()).unwrap();
        assert_eq!(best, Some(Rect::new(50, 50, 40, 40)));

        let all = detect_many_objects(&frame, &mut det, 320, &DetectionParams::default()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(det.seen_flags, vec![SearchFlags::FIND_BIGGEST_OBJECT, SearchFlags::SCALE_IMAGE]);
    }

    #[test]
    fn test_nothing_found() {
        let frame = GrayImage::from_pixel(50, 50, image::Luma([90]));
        let mut det = FixedDetector::new(Vec::new());
        assert_eq!(
            detect_largest_object(&frame, &mut det, 320, &DetectionParams::default()).unwrap(),
            None
        );
    }
}
