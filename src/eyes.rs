//! Eye localisation inside a detected face.
//!
//! Each eye is searched for in a fixed window expressed as fractions of the
//! face size. The windows are mirror images of each other. A primary eye
//! detector is tried first and an optional secondary one (for example a
//! cascade that also handles glasses) is tried when it finds nothing.

use image::GrayImage;
use log::trace;

use crate::constants::{EYE_SEARCH_HEIGHT, EYE_SEARCH_WIDTH, EYE_SEARCH_X, EYE_SEARCH_Y};
use crate::detection::{detect_largest_object, DetectionParams, ObjectDetector};
use crate::geometry::{cv_round, Point, Rect};
use crate::utils::crop_gray;
use crate::Result;

/// Left eye search window as fractions of the face size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeSearchGeometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for EyeSearchGeometry {
    fn default() -> Self {
        Self {
            x: EYE_SEARCH_X,
            y: EYE_SEARCH_Y,
            width: EYE_SEARCH_WIDTH,
            height: EYE_SEARCH_HEIGHT,
        }
    }
}

impl EyeSearchGeometry {
    /// Pixel windows for a face of the given size, as `(left, right)`.
    ///
    /// "Left" is the eye on the left side of the image.
    #[must_use]
    pub fn windows(&self, face_width: u32, face_height: u32) -> (Rect, Rect) {
        let cols = f64::from(face_width);
        let rows = f64::from(face_height);
        let left_x = cv_round(cols * self.x);
        let top_y = cv_round(rows * self.y);
        let width = cv_round(cols * self.width);
        let height = cv_round(rows * self.height);
        let right_x = cv_round(cols * (1.0 - self.x - self.width));
        (
            Rect::new(left_x, top_y, width, height),
            Rect::new(right_x, top_y, width, height),
        )
    }
}

/// Eye detection result, all points in face coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EyeDetection {
    pub left_eye: Option<Point>,
    pub right_eye: Option<Point>,
    pub searched_left_eye: Option<Rect>,
    pub searched_right_eye: Option<Rect>,
}

impl EyeDetection {
    /// Both eye positions when both were found
    #[must_use]
    pub fn both(&self) -> Option<(Point, Point)> {
        self.left_eye.zip(self.right_eye)
    }
}

/// Find both eyes in a gray face crop.
///
/// # Errors
///
/// Returns an error if a detector backend fails
pub fn detect_both_eyes(
    face: &GrayImage,
    primary: &mut dyn ObjectDetector,
    mut secondary: Option<&mut (dyn ObjectDetector + 'static)>,
    geometry: &EyeSearchGeometry,
    params: &DetectionParams,
) -> Result<EyeDetection> {
    let (left_window, right_window) = geometry.windows(face.width(), face.height());
    let mut result = EyeDetection::default();

    if let Some(region) = crop_gray(face, &left_window) {
        result.searched_left_eye = Some(left_window);
        result.left_eye = find_eye(&region, &left_window, primary, secondary.as_deref_mut(), params)?;
    }
    if let Some(region) = crop_gray(face, &right_window) {
        result.searched_right_eye = Some(right_window);
        result.right_eye = find_eye(&region, &right_window, primary, secondary.as_deref_mut(), params)?;
    }

    trace!("eyes: left {:?} right {:?}", result.left_eye, result.right_eye);
    Ok(result)
}

fn find_eye(
    region: &GrayImage,
    window: &Rect,
    primary: &mut dyn ObjectDetector,
    secondary: Option<&mut (dyn ObjectDetector + 'static)>,
    params: &DetectionParams,
) -> Result<Option<Point>> {
    let width = region.width();
    let mut found = detect_largest_object(region, primary, width, params)?;
    if found.is_none() {
        if let Some(fallback) = secondary {
            found = detect_largest_object(region, fallback, width, params)?;
        }
    }
    Ok(found.map(|r| r.center().offset(window.origin())))
}
