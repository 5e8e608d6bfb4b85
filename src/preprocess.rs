//! Face normalizer: from a camera frame to a fixed-size, aligned, equalized face.
//!
//! The pipeline is
//! 1. find the largest face,
//! 2. find both eyes inside it,
//! 3. rotate/scale/translate so the eyes sit at canonical positions,
//! 4. equalize the histogram (optionally per half),
//! 5. smooth with a bilateral filter,
//! 6. mask everything outside a centred ellipse.
//!
//! A face is only returned when every step succeeded; otherwise the
//! [`FaceDetection`] carries whatever was found so far for display.

use image::{DynamicImage, GrayImage};
use log::{debug, warn};

use crate::alignment::{warp_affine, EyeAlignment};
use crate::constants::{
    BILATERAL_SIGMA_COLOR, BILATERAL_SIGMA_SPACE, DEFAULT_DETECTION_WIDTH, DESIRED_LEFT_EYE_X, DESIRED_LEFT_EYE_Y,
    FILL_GRAY,
};
use crate::detection::{detect_largest_object, DetectionParams, ObjectDetector};
use crate::eyes::{detect_both_eyes, EyeDetection, EyeSearchGeometry};
use crate::filters::{BilateralFilter, EllipticalMask, FaceFilter, FilterChain, HistogramEqualizer, SplitHalvesEqualizer};
use crate::geometry::{Point, Rect};
use crate::utils::crop_gray;
use crate::utils::image_conversion::to_grayscale;
use crate::{Error, Result};

/// Tunable geometry and filter parameters of the normalizer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizerSettings {
    /// Working width for face detection
    pub detection_width: u32,
    pub face_params: DetectionParams,
    pub eye_params: DetectionParams,
    pub eye_search: EyeSearchGeometry,
    /// Canonical left eye position as fractions of the face size
    pub desired_left_eye: (f64, f64),
    /// Gray level for uncovered and masked pixels
    pub fill: u8,
    pub bilateral: BilateralFilter,
    pub mask: EllipticalMask,
}

impl Default for NormalizerSettings {
    fn default() -> Self {
        Self {
            detection_width: DEFAULT_DETECTION_WIDTH,
            face_params: DetectionParams::default(),
            eye_params: DetectionParams::default(),
            eye_search: EyeSearchGeometry::default(),
            desired_left_eye: (DESIRED_LEFT_EYE_X, DESIRED_LEFT_EYE_Y),
            fill: FILL_GRAY,
            bilateral: BilateralFilter::new(0, BILATERAL_SIGMA_COLOR, BILATERAL_SIGMA_SPACE),
            mask: EllipticalMask::default(),
        }
    }
}

impl NormalizerSettings {
    /// Photometric chain applied after the warp
    #[must_use]
    pub fn filter_chain(&self, separate_halves: bool) -> FilterChain {
        let equalizer: Box<dyn FaceFilter> = if separate_halves {
            Box::new(SplitHalvesEqualizer)
        } else {
            Box::new(HistogramEqualizer)
        };
        FilterChain::new()
            .with(equalizer)
            .with(Box::new(self.bilateral))
            .with(Box::new(EllipticalMask {
                fill: self.fill,
                ..self.mask
            }))
    }
}

/// Everything found while normalizing one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceDetection {
    /// Normalized face, present only when face and both eyes were found
    pub face: Option<GrayImage>,
    /// Face rectangle in frame coordinates
    pub face_rect: Option<Rect>,
    /// Eye centres in face coordinates
    pub left_eye: Option<Point>,
    pub right_eye: Option<Point>,
    /// Eye search windows in face coordinates
    pub searched_left_eye: Option<Rect>,
    pub searched_right_eye: Option<Rect>,
}

impl FaceDetection {
    /// Detection result carrying only a normalized face (no geometry).
    #[must_use]
    pub fn from_face(face: GrayImage) -> Self {
        Self {
            face: Some(face),
            ..Self::default()
        }
    }
}

/// Steps 3 to 6 for a gray face crop with known eye positions.
///
/// Returns `None` if the eyes coincide or `face_width` is 0.
#[must_use]
pub fn normalize_face(
    face: &GrayImage,
    left_eye: Point,
    right_eye: Point,
    face_width: u32,
    separate_halves: bool,
    settings: &NormalizerSettings,
) -> Option<GrayImage> {
    if face_width == 0 {
        return None;
    }
    let alignment = EyeAlignment::compute(left_eye, right_eye, face_width, settings.desired_left_eye)?;
    debug!(
        "aligning face: angle {:.1} deg, scale {:.3}",
        alignment.angle, alignment.scale
    );
    let warped = warp_affine(face, &alignment.transform, face_width, face_width, settings.fill);
    Some(settings.filter_chain(separate_halves).apply(&warped))
}

/// Face detector plus eye detectors and normalization settings
pub struct FaceNormalizer {
    face_detector: Box<dyn ObjectDetector>,
    eye_detector: Box<dyn ObjectDetector>,
    eye_detector_fallback: Option<Box<dyn ObjectDetector>>,
    settings: NormalizerSettings,
}

impl FaceNormalizer {
    /// Build a normalizer.
    ///
    /// # Errors
    ///
    /// Returns `DetectorNotLoaded` if the face or primary eye detector has no model.
    /// An unloaded fallback eye detector is dropped with a warning.
    pub fn new(
        face_detector: Box<dyn ObjectDetector>,
        eye_detector: Box<dyn ObjectDetector>,
        eye_detector_fallback: Option<Box<dyn ObjectDetector>>,
        settings: NormalizerSettings,
    ) -> Result<Self> {
        if !face_detector.is_loaded() {
            return Err(Error::DetectorNotLoaded(format!(
                "face detector '{}' has no model",
                face_detector.name()
            )));
        }
        if !eye_detector.is_loaded() {
            return Err(Error::DetectorNotLoaded(format!(
                "eye detector '{}' has no model",
                eye_detector.name()
            )));
        }
        let eye_detector_fallback = match eye_detector_fallback {
            Some(det) if !det.is_loaded() => {
                warn!("Fallback eye detector '{}' not loaded, using the primary only", det.name());
                None
            }
            other => other,
        };

        Ok(Self {
            face_detector,
            eye_detector,
            eye_detector_fallback,
            settings,
        })
    }

    #[must_use]
    pub fn settings(&self) -> &NormalizerSettings {
        &self.settings
    }

    /// Detect, align and filter the face in `frame`.
    ///
    /// # Errors
    ///
    /// Returns an error only if a detector backend fails; missing faces or
    /// eyes are reported through the `Option` fields.
    pub fn preprocess(&mut self, frame: &DynamicImage, face_width: u32, separate_halves: bool) -> Result<FaceDetection> {
        let gray = to_grayscale(frame);
        self.preprocess_gray(&gray, face_width, separate_halves)
    }

    /// Same as [`FaceNormalizer::preprocess`] for a frame already in gray.
    ///
    /// # Errors
    ///
    /// Returns an error only if a detector backend fails
    pub fn preprocess_gray(&mut self, gray: &GrayImage, face_width: u32, separate_halves: bool) -> Result<FaceDetection> {
        let mut result = FaceDetection::default();

        let Some(face_rect) = detect_largest_object(
            gray,
            self.face_detector.as_mut(),
            self.settings.detection_width,
            &self.settings.face_params,
        )?
        else {
            return Ok(result);
        };
        result.face_rect = Some(face_rect);

        let Some(face_img) = crop_gray(gray, &face_rect) else {
            return Ok(result);
        };

        let eyes: EyeDetection = detect_both_eyes(
            &face_img,
            self.eye_detector.as_mut(),
            self.eye_detector_fallback.as_deref_mut(),
            &self.settings.eye_search,
            &self.settings.eye_params,
        )?;
        result.left_eye = eyes.left_eye;
        result.right_eye = eyes.right_eye;
        result.searched_left_eye = eyes.searched_left_eye;
        result.searched_right_eye = eyes.searched_right_eye;

        if let Some((left, right)) = eyes.both() {
            result.face = normalize_face(&face_img, left, right, face_width, separate_halves, &self.settings);
        }
        Ok(result)
    }
}
