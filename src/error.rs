//! Error types for the face recognition library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` operation failed
    #[cfg(feature = "opencv")]
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding or decoding failed
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A required cascade detector could not be loaded
    #[error("Detector not loaded: {0}")]
    DetectorNotLoaded(String),

    /// The collected corpus cannot produce a model of the requested kind
    #[error("Insufficient training data: {0}")]
    InsufficientTrainingData(String),

    /// The trained model does not support the requested operation
    #[error("Model incompatible: {0}")]
    ModelIncompatible(String),

    /// Numerical failure inside model training
    #[error("Model error: {0}")]
    ModelError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Application-specific error type (alias for main Error type)
pub type AppError = Error;

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
