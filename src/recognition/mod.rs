//! Face recognizers and the operations the session runs on them.
//!
//! Three kinds of model are available:
//! - **Eigenfaces**: PCA over the flattened training faces.
//! - **Fisherfaces**: PCA followed by linear discriminant analysis, which
//!   keeps only the directions that separate people.
//! - **LBPH**: local binary pattern histograms, compared with chi-square.
//!
//! The subspace models support reconstruction: projecting a face into the
//! model and back. The reconstruction error is how the session decides a face
//! belongs to nobody it was trained on.
//!
//! ```no_run
//! use webcam_face_rec::recognition::{self, Algorithm};
//! use webcam_face_rec::recognition::decision::{decide, similarity, Decision};
//! # fn main() -> webcam_face_rec::Result<()> {
//! # let faces: Vec<image::GrayImage> = Vec::new();
//! # let labels: Vec<usize> = Vec::new();
//! # let probe = image::GrayImage::new(70, 70);
//! let model = recognition::train(&faces, &labels, Algorithm::Fisherfaces)?;
//! let rebuilt = recognition::reconstruct(model.as_ref(), &probe)?;
//! if decide(similarity(&probe, &rebuilt), 0.7) == Decision::Accept {
//!     let prediction = recognition::identify(model.as_ref(), &probe)?;
//!     println!("person {}", prediction.label);
//! }
//! # Ok(())
//! # }
//! ```

/// Similarity score and accept/unknown decision
pub mod decision;

/// Mean face, eigenface images and projections for inspection
pub mod diagnostics;

/// PCA recognizer
pub mod eigenfaces;

/// PCA + LDA recognizer
pub mod fisherfaces;

/// Local binary pattern histogram recognizer
pub mod lbph;

/// Linear subspace and PCA shared by the subspace models
pub mod subspace;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use image::GrayImage;
use log::info;
use nalgebra::DVector;

use crate::constants::{UNKNOWN_PERSON_THRESHOLD_EIGENFACES, UNKNOWN_PERSON_THRESHOLD_FISHERFACES};
use crate::utils::image_conversion::{flatten_face, vector_to_gray};
use crate::{Error, Result};
use subspace::Subspace;

/// Recognizer kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Eigenfaces,
    Fisherfaces,
    /// Identifies faces but has no subspace to reconstruct from, so a
    /// session cannot measure the reconstruction error and reports every
    /// face as unknown
    Lbph,
}

impl Algorithm {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Eigenfaces => "eigenfaces",
            Algorithm::Fisherfaces => "fisherfaces",
            Algorithm::Lbph => "lbph",
        }
    }

    /// Whether training needs at least two different people
    #[must_use]
    pub fn requires_distinct_labels(&self) -> bool {
        matches!(self, Algorithm::Fisherfaces)
    }

    /// Whether the model can back-project a face for the unknown-person check
    #[must_use]
    pub fn supports_reconstruction(&self) -> bool {
        !matches!(self, Algorithm::Lbph)
    }

    /// Reconstruction error threshold that works well for this kind
    #[must_use]
    pub fn default_unknown_threshold(&self) -> f64 {
        match self {
            Algorithm::Eigenfaces => UNKNOWN_PERSON_THRESHOLD_EIGENFACES,
            Algorithm::Fisherfaces | Algorithm::Lbph => UNKNOWN_PERSON_THRESHOLD_FISHERFACES,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        let name = lower.strip_prefix("facerecognizer.").unwrap_or(&lower);
        match name {
            "eigenfaces" | "eigen" => Ok(Algorithm::Eigenfaces),
            "fisherfaces" | "fisher" => Ok(Algorithm::Fisherfaces),
            "lbph" | "lbphfaces" => Ok(Algorithm::Lbph),
            _ => Err(Error::ConfigError(format!("Unknown face recognition algorithm: {s}"))),
        }
    }
}

/// Nearest training sample for a probe face
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Person label of the nearest sample
    pub label: usize,
    /// Distance to that sample in the model's feature space
    pub distance: f64,
}

/// A trained face recognizer
pub trait FaceRecognizer: Send + Sync {
    fn algorithm(&self) -> Algorithm;

    /// Nearest training sample
    ///
    /// # Errors
    ///
    /// Returns an error if the face size differs from the training faces
    fn predict(&self, face: &GrayImage) -> Result<Prediction>;

    /// Linear subspace, for models that have one
    fn subspace(&self) -> Option<&Subspace>;

    /// (width, height) of the training faces
    fn face_size(&self) -> (u32, u32);

    /// Number of training samples the model was built from
    fn num_samples(&self) -> usize;
}

/// Check that a corpus can train a model of the given kind.
///
/// # Errors
///
/// Returns `InsufficientTrainingData` describing the first problem found
pub fn validate_training_data(faces: &[GrayImage], labels: &[usize], algorithm: Algorithm) -> Result<()> {
    if faces.is_empty() {
        return Err(Error::InsufficientTrainingData("no faces collected yet".to_string()));
    }
    if faces.len() != labels.len() {
        return Err(Error::InsufficientTrainingData(format!(
            "{} faces but {} labels",
            faces.len(),
            labels.len()
        )));
    }
    let size = faces[0].dimensions();
    if let Some(i) = faces.iter().position(|f| f.dimensions() != size) {
        return Err(Error::InsufficientTrainingData(format!(
            "face {i} is {:?}, expected {:?}",
            faces[i].dimensions(),
            size
        )));
    }
    if algorithm.requires_distinct_labels() {
        let distinct = labels.iter().collect::<BTreeSet<_>>().len();
        if distinct < 2 {
            return Err(Error::InsufficientTrainingData(format!(
                "{algorithm} needs at least 2 people, have {distinct}; collect faces of another person"
            )));
        }
        if faces.len() <= distinct {
            return Err(Error::InsufficientTrainingData(format!(
                "{algorithm} needs more faces ({}) than people ({distinct})",
                faces.len()
            )));
        }
    }
    Ok(())
}

/// Train a new model on the whole corpus.
///
/// # Errors
///
/// Returns `InsufficientTrainingData` if the corpus is unusable
pub fn train(faces: &[GrayImage], labels: &[usize], algorithm: Algorithm) -> Result<Box<dyn FaceRecognizer>> {
    validate_training_data(faces, labels, algorithm)?;
    info!("Training {} model on {} faces", algorithm, faces.len());
    let model: Box<dyn FaceRecognizer> = match algorithm {
        Algorithm::Eigenfaces => Box::new(eigenfaces::EigenfacesModel::train(faces, labels)?),
        Algorithm::Fisherfaces => Box::new(fisherfaces::FisherfacesModel::train(faces, labels)?),
        Algorithm::Lbph => Box::new(lbph::LbphModel::train(faces, labels)?),
    };
    info!(
        "Trained {} model ({} component(s))",
        algorithm,
        model.subspace().map_or(0, Subspace::num_components)
    );
    Ok(model)
}

fn require_subspace(model: &dyn FaceRecognizer) -> Result<&Subspace> {
    model.subspace().ok_or_else(|| {
        Error::ModelIncompatible(format!("{} models have no linear subspace", model.algorithm()))
    })
}

fn check_face_size(model: &dyn FaceRecognizer, face: &GrayImage) -> Result<()> {
    if face.dimensions() == model.face_size() {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "face is {:?}, model was trained on {:?}",
            face.dimensions(),
            model.face_size()
        )))
    }
}

/// Subspace coordinates of a face.
///
/// # Errors
///
/// Returns `ModelIncompatible` for models without a subspace and
/// `InvalidInput` for a face of the wrong size
pub fn project(model: &dyn FaceRecognizer, face: &GrayImage) -> Result<DVector<f64>> {
    let space = require_subspace(model)?;
    check_face_size(model, face)?;
    space.project(&flatten_face(face))
}

/// Project a face into the model and back, as an 8-bit image.
///
/// # Errors
///
/// Returns `ModelIncompatible` for models without a subspace and
/// `InvalidInput` for a face of the wrong size
pub fn reconstruct(model: &dyn FaceRecognizer, face: &GrayImage) -> Result<GrayImage> {
    let space = require_subspace(model)?;
    let coords = project(model, face)?;
    let rebuilt = space.reconstruct(&coords)?;
    vector_to_gray(&rebuilt, space.width, space.height)
}

/// Identity of the nearest training sample.
///
/// # Errors
///
/// Returns `InvalidInput` for a face of the wrong size
pub fn identify(model: &dyn FaceRecognizer, face: &GrayImage) -> Result<Prediction> {
    check_face_size(model, face)?;
    model.predict(face)
}
