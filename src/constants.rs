//! Constants used throughout the application

/// Width and height of a preprocessed face in pixels
pub const DEFAULT_FACE_WIDTH: u32 = 70;

/// Width frames are shrunk to before running the face cascade
pub const DEFAULT_DETECTION_WIDTH: u32 = 320;

/// Smallest object the cascades report, in (shrunk) pixels
pub const DEFAULT_MIN_FEATURE_SIZE: u32 = 20;

/// Scale step between cascade search levels
pub const DEFAULT_SEARCH_SCALE_FACTOR: f32 = 1.1;

/// Neighbouring hits required to keep a cascade detection
pub const DEFAULT_MIN_NEIGHBORS: u32 = 4;

/// Left eye search window, as fractions of the face size
pub const EYE_SEARCH_X: f64 = 0.16;
pub const EYE_SEARCH_Y: f64 = 0.26;
pub const EYE_SEARCH_WIDTH: f64 = 0.30;
pub const EYE_SEARCH_HEIGHT: f64 = 0.28;

/// Canonical left eye position in the normalized face. The right eye sits at `1 - x`.
pub const DESIRED_LEFT_EYE_X: f64 = 0.16;
pub const DESIRED_LEFT_EYE_Y: f64 = 0.14;

/// Gray level for pixels outside the warped face and the elliptical mask
pub const FILL_GRAY: u8 = 128;

/// Elliptical mask geometry, as fractions of the face size
pub const ELLIPSE_CENTER_Y: f64 = 0.40;
pub const ELLIPSE_HALF_WIDTH: f64 = 0.50;
pub const ELLIPSE_HALF_HEIGHT: f64 = 0.80;

/// Bilateral smoothing parameters
pub const BILATERAL_SIGMA_COLOR: f64 = 20.0;
pub const BILATERAL_SIGMA_SPACE: f64 = 2.0;

/// Reconstruction error above which a face is reported as unknown (Fisherfaces)
pub const UNKNOWN_PERSON_THRESHOLD_FISHERFACES: f64 = 0.7;

/// Reconstruction error above which a face is reported as unknown (Eigenfaces)
pub const UNKNOWN_PERSON_THRESHOLD_EIGENFACES: f64 = 0.5;

/// Minimum similarity score between consecutive collected faces
pub const CHANGE_IN_IMAGE_FOR_COLLECTION: f64 = 0.3;

/// Minimum seconds between consecutive collected faces
pub const CHANGE_IN_SECONDS_FOR_COLLECTION: f64 = 1.0;

/// Similarity score reported when two images cannot be compared
pub const SIMILARITY_SENTINEL: f64 = 100_000_000.0;

/// Eigenvalues below this fraction of the largest are treated as zero
pub const EIGENVALUE_EPSILON: f64 = 1e-10;

/// Default capture resolution
pub const DEFAULT_CAMERA_WIDTH: u32 = 640;
pub const DEFAULT_CAMERA_HEIGHT: u32 = 480;

/// Maximum number of basis images rendered by the diagnostics dump
pub const MAX_DIAGNOSTIC_EIGENFACES: usize = 20;
