//! Model introspection for debugging: what the model learned, as images.

use std::path::Path;

use image::GrayImage;
use log::info;
use ndarray::{Array1, Array2};

use super::FaceRecognizer;
use crate::constants::MAX_DIAGNOSTIC_EIGENFACES;
use crate::utils::image_conversion::vector_to_gray_normalized;
use crate::{Error, Result};

/// Mean face, leading basis images, eigenvalues and sample projections
#[derive(Debug, Clone)]
pub struct ModelDiagnostics {
    /// Average training face, range stretched to 0..=255
    pub mean_face: GrayImage,
    /// Leading basis vectors rendered with their range stretched to 0..=255
    pub eigenfaces: Vec<GrayImage>,
    pub eigenvalues: Array1<f64>,
    /// `samples x components` projections of the training faces
    pub projections: Array2<f64>,
    pub labels: Vec<usize>,
}

impl ModelDiagnostics {
    /// Extract diagnostics from a subspace model.
    ///
    /// # Errors
    ///
    /// Returns `ModelIncompatible` for models without a subspace
    pub fn from_model(model: &dyn FaceRecognizer, max_eigenfaces: usize) -> Result<Self> {
        let space = model.subspace().ok_or_else(|| {
            Error::ModelIncompatible(format!("{} models cannot be introspected", model.algorithm()))
        })?;

        let mean_face = vector_to_gray_normalized(&space.mean, space.width, space.height)?;
        let count = space.num_components().min(max_eigenfaces.min(MAX_DIAGNOSTIC_EIGENFACES));
        let eigenfaces = (0..count)
            .map(|i| vector_to_gray_normalized(&space.basis.column(i).into_owned(), space.width, space.height))
            .collect::<Result<Vec<_>>>()?;

        let eigenvalues = Array1::from_iter(space.eigenvalues.iter().copied());
        let components = space.num_components();
        let projections = Array2::from_shape_fn((space.projections.len(), components), |(r, c)| {
            space.projections[r][c]
        });

        Ok(Self {
            mean_face,
            eigenfaces,
            eigenvalues,
            projections,
            labels: space.labels.clone(),
        })
    }

    /// Log a short summary at info level
    pub fn log_summary(&self) {
        info!(
            "Model: {} eigenvalue(s), {} training projection(s)",
            self.eigenvalues.len(),
            self.projections.nrows()
        );
        let leading: Vec<String> = self.eigenvalues.iter().take(5).map(|v| format!("{v:.2}")).collect();
        info!("Leading eigenvalues: [{}]", leading.join(", "));
    }

    /// Write `mean_face.png` and `eigenface_<i>.png` into `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or an image cannot be written
    pub fn save_to_dir<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        self.mean_face.save(dir.join("mean_face.png"))?;
        for (i, face) in self.eigenfaces.iter().enumerate() {
            face.save(dir.join(format!("eigenface_{i}.png")))?;
        }
        info!("Saved model diagnostics to {}", dir.display());
        Ok(())
    }
}
