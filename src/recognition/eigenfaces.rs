use image::GrayImage;

use super::subspace::{pca, Subspace};
use super::{Algorithm, FaceRecognizer, Prediction};
use crate::utils::image_conversion::{faces_to_matrix, flatten_face};
use crate::Result;

/// Principal component model with nearest-neighbour prediction
#[derive(Debug, Clone)]
pub struct EigenfacesModel {
    subspace: Subspace,
}

impl EigenfacesModel {
    /// Keep every significant principal component of the training faces.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientTrainingData` if the faces are empty, differ in size or are all identical
    pub fn train(faces: &[GrayImage], labels: &[usize]) -> Result<Self> {
        let data = faces_to_matrix(faces)?;
        let (mean, basis, eigenvalues) = pca(&data, None)?;
        let mut subspace = Subspace {
            mean,
            basis,
            eigenvalues,
            projections: Vec::with_capacity(faces.len()),
            labels: labels.to_vec(),
            width: faces[0].width(),
            height: faces[0].height(),
        };
        subspace.projections = faces
            .iter()
            .map(|f| subspace.project(&flatten_face(f)))
            .collect::<Result<_>>()?;
        Ok(Self { subspace })
    }
}

impl FaceRecognizer for EigenfacesModel {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Eigenfaces
    }

    fn predict(&self, face: &GrayImage) -> Result<Prediction> {
        let coords = self.subspace.project(&flatten_face(face))?;
        self.subspace.nearest(&coords)
    }

    fn subspace(&self) -> Option<&Subspace> {
        Some(&self.subspace)
    }

    fn face_size(&self) -> (u32, u32) {
        (self.subspace.width, self.subspace.height)
    }

    fn num_samples(&self) -> usize {
        self.subspace.labels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(seed: u32) -> GrayImage {
        GrayImage::from_fn(10, 10, |x, y| image::Luma([((x * seed + y * 3 + seed * seed) % 200) as u8]))
    }

    #[test]
    fn test_training_samples_predict_themselves() {
        let faces: Vec<GrayImage> = (1..=4).map(pattern).collect();
        let model = EigenfacesModel::train(&faces, &[0, 0, 1, 1]).unwrap();
        for (face, label) in faces.iter().zip([0, 0, 1, 1]) {
            let p = model.predict(face).unwrap();
            assert_eq!(p.label, label);
            assert!(p.distance < 1e-6);
        }
        assert_eq!(model.num_samples(), 4);
        assert_eq!(model.face_size(), (10, 10));
    }

    #[test]
    fn test_basis_has_at_most_n_minus_one_components() {
        let faces: Vec<GrayImage> = (1..=5).map(pattern).collect();
        let model = EigenfacesModel::train(&faces, &[0, 1, 2, 3, 4]).unwrap();
        let space = model.subspace().unwrap();
        assert!(space.num_components() <= 4);
        assert!(space.eigenvalues.iter().zip(space.eigenvalues.iter().skip(1)).all(|(a, b)| a >= b));
    }
}
