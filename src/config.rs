//! Configuration management for the face recognition application

use crate::constants::{
    BILATERAL_SIGMA_COLOR, BILATERAL_SIGMA_SPACE, CHANGE_IN_IMAGE_FOR_COLLECTION, CHANGE_IN_SECONDS_FOR_COLLECTION,
    DEFAULT_CAMERA_HEIGHT, DEFAULT_CAMERA_WIDTH, DEFAULT_DETECTION_WIDTH, DEFAULT_FACE_WIDTH, DEFAULT_MIN_FEATURE_SIZE,
    DEFAULT_MIN_NEIGHBORS, DEFAULT_SEARCH_SCALE_FACTOR, DESIRED_LEFT_EYE_X, DESIRED_LEFT_EYE_Y, ELLIPSE_CENTER_Y,
    ELLIPSE_HALF_HEIGHT, ELLIPSE_HALF_WIDTH, EYE_SEARCH_HEIGHT, EYE_SEARCH_WIDTH, EYE_SEARCH_X, EYE_SEARCH_Y, FILL_GRAY,
};
use crate::detection::DetectionParams;
use crate::eyes::EyeSearchGeometry;
use crate::filters::{BilateralFilter, EllipticalMask};
use crate::preprocess::NormalizerSettings;
use crate::recognition::Algorithm;
use crate::session::SessionSettings;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cascade classifier files
    pub models: ModelConfig,

    /// Face detection parameters
    pub detection: DetectionConfig,

    /// Face normalization parameters
    pub preprocessing: PreprocessingConfig,

    /// Recognizer kind and threshold
    pub recognition: RecognitionConfig,

    /// Face collection gate
    pub collection: CollectionConfig,

    /// Camera settings
    pub camera: CameraConfig,
}

/// Cascade file paths
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Face detector cascade
    pub face_cascade: PathBuf,

    /// Primary eye detector cascade
    pub eye_cascade: PathBuf,

    /// Eye detector tried when the primary one finds nothing
    pub eye_cascade_fallback: Option<PathBuf>,
}

/// Face detector parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Frames are shrunk to this width before searching for faces
    pub scaled_width: u32,

    /// Smallest face searched for, in shrunk pixels
    pub min_feature_size: u32,

    /// Scale step between search levels
    pub search_scale_factor: f32,

    /// Overlapping hits needed to report a face
    pub min_neighbors: u32,
}

/// Face normalization parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Side of the square normalized face
    pub face_width: u32,

    /// Equalize the left and right halves separately
    pub separate_halves: bool,

    /// Left eye search window origin and size, as fractions of the face
    pub eye_search_x: f64,
    pub eye_search_y: f64,
    pub eye_search_width: f64,
    pub eye_search_height: f64,

    /// Canonical left eye position, as fractions of the face width
    pub desired_left_eye_x: f64,
    pub desired_left_eye_y: f64,

    /// Elliptical mask geometry, as fractions of the face size
    pub ellipse_center_y: f64,
    pub ellipse_half_width: f64,
    pub ellipse_half_height: f64,

    /// Bilateral filter parameters
    pub bilateral_sigma_color: f64,
    pub bilateral_sigma_space: f64,

    /// Gray level for pixels outside the face
    pub fill: u8,
}

/// Recognizer parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// "eigenfaces", "fisherfaces" or "lbph". LBPH has no reconstruction,
    /// so a session using it reports every face as unknown.
    pub algorithm: String,

    /// Unknown person threshold; the algorithm's default when unset
    pub unknown_threshold: Option<f64>,
}

/// Face collection gate parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Minimum similarity score to the previous collected face
    pub change_threshold: f64,

    /// Minimum seconds between collected faces
    pub interval_seconds: f64,
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera device index
    pub index: i32,

    /// Requested frame width
    pub width: u32,

    /// Requested frame height
    pub height: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            face_cascade: PathBuf::from("assets/lbpcascade_frontalface.xml"),
            eye_cascade: PathBuf::from("assets/haarcascade_eye.xml"),
            eye_cascade_fallback: Some(PathBuf::from("assets/haarcascade_eye_tree_eyeglasses.xml")),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            scaled_width: DEFAULT_DETECTION_WIDTH,
            min_feature_size: DEFAULT_MIN_FEATURE_SIZE,
            search_scale_factor: DEFAULT_SEARCH_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
        }
    }
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            face_width: DEFAULT_FACE_WIDTH,
            separate_halves: true,
            eye_search_x: EYE_SEARCH_X,
            eye_search_y: EYE_SEARCH_Y,
            eye_search_width: EYE_SEARCH_WIDTH,
            eye_search_height: EYE_SEARCH_HEIGHT,
            desired_left_eye_x: DESIRED_LEFT_EYE_X,
            desired_left_eye_y: DESIRED_LEFT_EYE_Y,
            ellipse_center_y: ELLIPSE_CENTER_Y,
            ellipse_half_width: ELLIPSE_HALF_WIDTH,
            ellipse_half_height: ELLIPSE_HALF_HEIGHT,
            bilateral_sigma_color: BILATERAL_SIGMA_COLOR,
            bilateral_sigma_space: BILATERAL_SIGMA_SPACE,
            fill: FILL_GRAY,
        }
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Fisherfaces.name().to_string(),
            unknown_threshold: None,
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            change_threshold: CHANGE_IN_IMAGE_FOR_COLLECTION,
            interval_seconds: CHANGE_IN_SECONDS_FOR_COLLECTION,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: DEFAULT_CAMERA_WIDTH,
            height: DEFAULT_CAMERA_HEIGHT,
        }
    }
}

fn check_fraction(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::ConfigError(format!("{name} must be between 0.0 and 1.0, got {value}")))
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text; missing keys take their defaults
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the text is not valid configuration
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Recognizer kind named in the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an unknown algorithm name
    pub fn algorithm(&self) -> Result<Algorithm> {
        self.recognition.algorithm.parse()
    }

    /// Validate value ranges
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` naming the first invalid value
    pub fn validate(&self) -> Result<()> {
        let algorithm = self.algorithm()?;

        if self.detection.scaled_width == 0 {
            return Err(Error::ConfigError("Detection scaled width must be greater than 0".to_string()));
        }
        if self.detection.search_scale_factor <= 1.0 {
            return Err(Error::ConfigError("Search scale factor must be greater than 1.0".to_string()));
        }

        let pre = &self.preprocessing;
        if pre.face_width < 2 {
            return Err(Error::ConfigError("Face width must be at least 2".to_string()));
        }
        check_fraction("Eye search x", pre.eye_search_x)?;
        check_fraction("Eye search y", pre.eye_search_y)?;
        check_fraction("Eye search width", pre.eye_search_width)?;
        check_fraction("Eye search height", pre.eye_search_height)?;
        if pre.eye_search_x + pre.eye_search_width > 0.5 {
            return Err(Error::ConfigError(
                "Left eye search window must stay in the left half of the face".to_string(),
            ));
        }
        check_fraction("Desired left eye x", pre.desired_left_eye_x)?;
        check_fraction("Desired left eye y", pre.desired_left_eye_y)?;
        if pre.desired_left_eye_x >= 0.5 {
            return Err(Error::ConfigError("Desired left eye x must be below 0.5".to_string()));
        }
        if pre.bilateral_sigma_color <= 0.0 || pre.bilateral_sigma_space <= 0.0 {
            return Err(Error::ConfigError("Bilateral sigmas must be positive".to_string()));
        }

        if let Some(threshold) = self.recognition.unknown_threshold {
            if !threshold.is_finite() || threshold <= 0.0 {
                return Err(Error::ConfigError(format!(
                    "Unknown person threshold for {algorithm} must be positive, got {threshold}"
                )));
            }
        }

        if self.collection.change_threshold < 0.0 {
            return Err(Error::ConfigError("Collection change threshold must not be negative".to_string()));
        }
        if !self.collection.interval_seconds.is_finite() || self.collection.interval_seconds < 0.0 {
            return Err(Error::ConfigError("Collection interval must not be negative".to_string()));
        }

        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(Error::ConfigError("Camera resolution must be non-zero".to_string()));
        }

        Ok(())
    }

    /// Check that the cascade files exist
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` naming the first missing file
    pub fn check_model_files(&self) -> Result<()> {
        let required = [
            ("Face cascade", &self.models.face_cascade),
            ("Eye cascade", &self.models.eye_cascade),
        ];
        for (name, path) in required {
            if !path.exists() {
                return Err(Error::ConfigError(format!("{name} not found: {}", path.display())));
            }
        }
        Ok(())
    }

    /// Normalizer settings described by this configuration
    #[must_use]
    pub fn normalizer_settings(&self) -> NormalizerSettings {
        let det = &self.detection;
        let pre = &self.preprocessing;
        let face_params = DetectionParams {
            min_feature_size: (det.min_feature_size, det.min_feature_size),
            search_scale_factor: det.search_scale_factor,
            min_neighbors: det.min_neighbors,
            ..DetectionParams::default()
        };
        NormalizerSettings {
            detection_width: det.scaled_width,
            face_params,
            eye_params: DetectionParams::default(),
            eye_search: EyeSearchGeometry {
                x: pre.eye_search_x,
                y: pre.eye_search_y,
                width: pre.eye_search_width,
                height: pre.eye_search_height,
            },
            desired_left_eye: (pre.desired_left_eye_x, pre.desired_left_eye_y),
            fill: pre.fill,
            bilateral: BilateralFilter::new(0, pre.bilateral_sigma_color, pre.bilateral_sigma_space),
            mask: EllipticalMask {
                center_y: pre.ellipse_center_y,
                half_width: pre.ellipse_half_width,
                half_height: pre.ellipse_half_height,
                fill: pre.fill,
            },
        }
    }

    /// Session settings described by this configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an unknown algorithm name or an invalid interval
    pub fn session_settings(&self) -> Result<SessionSettings> {
        let algorithm = self.algorithm()?;
        let collection_interval = Duration::try_from_secs_f64(self.collection.interval_seconds)
            .map_err(|e| Error::ConfigError(format!("Invalid collection interval: {e}")))?;
        Ok(SessionSettings {
            face_width: self.preprocessing.face_width,
            separate_halves: self.preprocessing.separate_halves,
            algorithm,
            unknown_threshold: self
                .recognition
                .unknown_threshold
                .unwrap_or_else(|| algorithm.default_unknown_threshold()),
            change_threshold: self.collection.change_threshold,
            collection_interval,
        })
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Webcam Face Recognition Configuration

# Cascade classifier files
models:
  face_cascade: "assets/lbpcascade_frontalface.xml"
  eye_cascade: "assets/haarcascade_eye.xml"
  eye_cascade_fallback: "assets/haarcascade_eye_tree_eyeglasses.xml"

# Face detection
detection:
  scaled_width: 320
  min_feature_size: 20
  search_scale_factor: 1.1
  min_neighbors: 4

# Face normalization
preprocessing:
  face_width: 70
  separate_halves: true
  eye_search_x: 0.16
  eye_search_y: 0.26
  eye_search_width: 0.30
  eye_search_height: 0.28
  desired_left_eye_x: 0.16
  desired_left_eye_y: 0.14
  ellipse_center_y: 0.40
  ellipse_half_width: 0.50
  ellipse_half_height: 0.80
  bilateral_sigma_color: 20.0
  bilateral_sigma_space: 2.0
  fill: 128

# Recognition
recognition:
  # eigenfaces, fisherfaces or lbph (lbph cannot reconstruct: all faces unknown)
  algorithm: "fisherfaces"
  # unknown_threshold: 0.7

# Face collection
collection:
  change_threshold: 0.3
  interval_seconds: 1.0

# Camera
camera:
  index: 0
  width: 640
  height: 480
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses_to_defaults() {
        let parsed = Config::from_yaml(EXAMPLE_CONFIG).unwrap();
        parsed.validate().unwrap();
        assert_eq!(parsed.normalizer_settings(), Config::default().normalizer_settings());
        assert_eq!(parsed.session_settings().unwrap(), Config::default().session_settings().unwrap());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::from_yaml("recognition:\n  algorithm: eigenfaces\n").unwrap();
        let settings = config.session_settings().unwrap();
        assert_eq!(settings.algorithm, Algorithm::Eigenfaces);
        assert!((settings.unknown_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.preprocessing.face_width, DEFAULT_FACE_WIDTH);
    }

    #[test]
    fn test_explicit_threshold_wins() {
        let config = Config::from_yaml("recognition:\n  unknown_threshold: 0.9\n").unwrap();
        assert!((config.session_settings().unwrap().unknown_threshold - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = Config::default();
        config.recognition.algorithm = "neural".to_string();
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));

        let mut config = Config::default();
        config.preprocessing.eye_search_x = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.detection.search_scale_factor = 1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.recognition.unknown_threshold = Some(-1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("face_rec_config_{}.yaml", std::process::id()));
        let mut config = Config::default();
        config.camera.index = 2;
        config.models.eye_cascade_fallback = None;
        config.to_file(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.camera.index, 2);
        assert_eq!(loaded.models.eye_cascade_fallback, None);
    }

    #[test]
    fn test_missing_model_files() {
        let mut config = Config::default();
        config.models.face_cascade = PathBuf::from("/nonexistent/face.xml");
        assert!(matches!(config.check_model_files(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(Config::from_file("/nonexistent/config.yaml"), Err(Error::Io(_))));
    }
}
