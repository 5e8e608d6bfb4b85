//! Webcam face recognition library.
//!
//! This library provides an interactive face recognition pipeline:
//! - cascade face and eye detection behind the [`detection::ObjectDetector`] trait
//! - geometric normalization that puts both eyes at fixed positions
//! - photometric normalization (split-half equalization, bilateral smoothing, elliptical mask)
//! - Eigenfaces, Fisherfaces and LBPH recognizers
//! - unknown-person rejection from the reconstruction error
//!
//! The pipeline per frame is:
//! 1. Find the largest face and both eyes in it
//! 2. Warp, equalize, smooth and mask the face into a `W x W` image
//! 3. Depending on the session mode, collect it as a training sample or recognize it
//!
//! The pure-Rust core works on [`image`] buffers. The `opencv` feature adds a
//! cascade classifier backend, camera capture and the interactive window.
//!
//! # Examples
//!
//! ## Training and recognizing normalized faces
//!
//! ```
//! use image::GrayImage;
//! use webcam_face_rec::recognition::{self, decision, Algorithm};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let face = |k: u32| GrayImage::from_fn(16, 16, |x, y| image::Luma([((x * k + y * 3) % 200) as u8 + 20]));
//! let faces = vec![face(1), face(2), face(7), face(8)];
//! let labels = vec![0, 0, 1, 1];
//!
//! let model = recognition::train(&faces, &labels, Algorithm::Eigenfaces)?;
//! let rebuilt = recognition::reconstruct(model.as_ref(), &faces[2])?;
//! let score = decision::similarity(&faces[2], &rebuilt);
//! if decision::decide(score, Algorithm::Eigenfaces.default_unknown_threshold()) == decision::Decision::Accept {
//!     let prediction = recognition::identify(model.as_ref(), &faces[2])?;
//!     println!("person {} (similarity {score:.3})", prediction.label);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Driving a session
//!
//! ```no_run
//! use std::time::Duration;
//! use webcam_face_rec::config::Config;
//! use webcam_face_rec::detection::ObjectDetector;
//! use webcam_face_rec::preprocess::FaceNormalizer;
//! use webcam_face_rec::session::{Event, Session};
//!
//! # fn run(face: Box<dyn ObjectDetector>, eyes: Box<dyn ObjectDetector>, frames: Vec<image::DynamicImage>)
//! #     -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let normalizer = FaceNormalizer::new(face, eyes, None, config.normalizer_settings())?;
//! let mut session = Session::new(normalizer, config.session_settings()?);
//!
//! session.handle_event(Event::AddPerson);
//! for (i, frame) in frames.iter().enumerate() {
//!     let report = session.process_frame(frame, Duration::from_millis(i as u64 * 40))?;
//!     if let Some(recognition) = report.recognition {
//!         println!("{} ({:.3})", recognition.identity, recognition.similarity);
//!     }
//! }
//! session.handle_event(Event::Train);
//! # Ok(())
//! # }
//! ```

/// Rounding and small geometric value types
pub mod geometry;

/// Object detector trait and the scaled-search adapter
pub mod detection;

/// Eye search windows and eye detection inside a face
pub mod eyes;

/// Eye-based similarity transform and affine warping
pub mod alignment;

/// Photometric face filters
pub mod filters;

/// Face normalization pipeline
pub mod preprocess;

/// Training corpus and person registry
pub mod training;

/// Recognizer models, reconstruction and identity decision
pub mod recognition;

/// Face collection gate
pub mod collection;

/// Session mode controller
pub mod session;

/// Utility functions for image conversion and numeric casts
pub mod utils;

/// Error types and result handling
pub mod error;

/// Interactive webcam application
#[cfg(feature = "opencv")]
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
