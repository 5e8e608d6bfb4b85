use std::collections::BTreeMap;

use image::GrayImage;
use log::debug;
use nalgebra::{DMatrix, DVector, SymmetricEigen};

use super::subspace::{pca, sorted_significant, Subspace};
use super::{Algorithm, FaceRecognizer, Prediction};
use crate::utils::image_conversion::{faces_to_matrix, flatten_face};
use crate::{Error, Result};

/// Fisher discriminant model with nearest-neighbour prediction.
///
/// Faces are first reduced with PCA to `N - C` dimensions (N samples, C
/// people) so the within-class scatter is invertible, then projected onto
/// the `C - 1` directions that best separate the class means relative to the
/// spread inside each class.
#[derive(Debug, Clone)]
pub struct FisherfacesModel {
    subspace: Subspace,
}

impl FisherfacesModel {
    /// # Errors
    ///
    /// Returns `InsufficientTrainingData` with fewer than two people, no more
    /// samples than people, or when the classes cannot be separated. The last
    /// case includes every person having a single left-right symmetric
    /// sample: the face equals its mirror and there is no within-person
    /// variation, even though [`validate_training_data`](super::validate_training_data) passes.
    pub fn train(faces: &[GrayImage], labels: &[usize]) -> Result<Self> {
        let data = faces_to_matrix(faces)?;
        let n = data.nrows();

        let mut class_index: BTreeMap<usize, usize> = BTreeMap::new();
        for &label in labels {
            let next = class_index.len();
            class_index.entry(label).or_insert(next);
        }
        let classes = class_index.len();
        if classes < 2 {
            return Err(Error::InsufficientTrainingData(format!(
                "Fisherfaces needs at least 2 people, have {classes}"
            )));
        }
        if n <= classes {
            return Err(Error::InsufficientTrainingData(format!(
                "Fisherfaces needs more faces ({n}) than people ({classes})"
            )));
        }

        let (mean, pca_basis, _) = pca(&data, Some(n - classes))?;
        let mut centered = data;
        for mut row in centered.row_iter_mut() {
            row -= mean.transpose();
        }
        let reduced = &centered * &pca_basis;
        let lda = discriminant_directions(&reduced, labels, &class_index)?;

        let mut basis = &pca_basis * &lda.vectors;
        for mut column in basis.column_iter_mut() {
            let length = column.norm();
            if length > 0.0 {
                column /= length;
            }
        }
        debug!(
            "Fisherfaces: {} PCA dims, {} discriminant dims",
            pca_basis.ncols(),
            basis.ncols()
        );

        let mut subspace = Subspace {
            mean,
            basis,
            eigenvalues: lda.values,
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

struct Discriminant {
    /// `reduced dims x (C - 1)`
    vectors: DMatrix<f64>,
    values: DVector<f64>,
}

/// Solve `Sb v = λ Sw v` on samples given as rows of `reduced`.
fn discriminant_directions(
    reduced: &DMatrix<f64>,
    labels: &[usize],
    class_index: &BTreeMap<usize, usize>,
) -> Result<Discriminant> {
    let (n, dims) = reduced.shape();
    let classes = class_index.len();

    let mut class_sums = vec![DVector::<f64>::zeros(dims); classes];
    let mut class_counts = vec![0usize; classes];
    for (row, label) in reduced.row_iter().zip(labels) {
        let c = class_index[label];
        class_sums[c] += row.transpose();
        class_counts[c] += 1;
    }
    #[allow(clippy::cast_precision_loss)]
    let class_means: Vec<DVector<f64>> = class_sums
        .into_iter()
        .zip(&class_counts)
        .map(|(sum, &count)| sum / count as f64)
        .collect();
    #[allow(clippy::cast_precision_loss)]
    let total_mean = reduced.row_sum().transpose() / n as f64;

    let mut within = DMatrix::<f64>::zeros(dims, dims);
    for (row, label) in reduced.row_iter().zip(labels) {
        let d = row.transpose() - &class_means[class_index[label]];
        within += &d * d.transpose();
    }
    let mut between = DMatrix::<f64>::zeros(dims, dims);
    for mean in &class_means {
        let d = mean - &total_mean;
        between += &d * d.transpose();
    }

    // Whiten the within-class scatter, then diagonalize the between-class scatter in that space.
    let within_eig = SymmetricEigen::new(within);
    let keep = sorted_significant(&within_eig.eigenvalues, None);
    if keep.is_empty() {
        return Err(Error::InsufficientTrainingData(
            "faces of each person are identical; collect more varied samples".to_string(),
        ));
    }
    let mut whitening = DMatrix::<f64>::zeros(dims, keep.len());
    for (k, &i) in keep.iter().enumerate() {
        let scale = within_eig.eigenvalues[i].sqrt();
        whitening.set_column(k, &(within_eig.eigenvectors.column(i) / scale));
    }

    let between_white = whitening.transpose() * &between * &whitening;
    let between_eig = SymmetricEigen::new(between_white);
    let order = sorted_significant(&between_eig.eigenvalues, Some(classes - 1));
    if order.is_empty() {
        return Err(Error::InsufficientTrainingData(
            "the collected people cannot be told apart".to_string(),
        ));
    }

    let mut selected = DMatrix::<f64>::zeros(keep.len(), order.len());
    let mut values = DVector::<f64>::zeros(order.len());
    for (k, &i) in order.iter().enumerate() {
        selected.set_column(k, &between_eig.eigenvectors.column(i));
        values[k] = between_eig.eigenvalues[i];
    }
    Ok(Discriminant {
        vectors: whitening * selected,
        values,
    })
}

impl FaceRecognizer for FisherfacesModel {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Fisherfaces
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

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Two people: horizontal vs vertical stripes, each with brightness variants and pixel noise
    fn corpus() -> (Vec<GrayImage>, Vec<usize>) {
        let mut rng = StdRng::seed_from_u64(7);
        let mut faces = Vec::new();
        let mut labels = Vec::new();
        for offset in [0i32, 15, 30, 45] {
            for label in 0..2usize {
                faces.push(GrayImage::from_fn(12, 12, |x, y| {
                    let stripe = (if label == 0 { y % 4 } else { x % 4 }) as i32;
                    let v = 60 + offset + stripe * 30 + rng.gen_range(-6..=6);
                    image::Luma([v.clamp(0, 255) as u8])
                }));
                labels.push(label);
            }
        }
        (faces, labels)
    }

    #[test]
    fn test_one_discriminant_direction_for_two_people() {
        let (faces, labels) = corpus();
        let model = FisherfacesModel::train(&faces, &labels).unwrap();
        let space = model.subspace().unwrap();
        assert_eq!(space.num_components(), 1);
        assert!((space.basis.column(0).norm() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_training_samples_are_classified_correctly() {
        let (faces, labels) = corpus();
        let model = FisherfacesModel::train(&faces, &labels).unwrap();
        for (face, &label) in faces.iter().zip(&labels) {
            assert_eq!(model.predict(face).unwrap().label, label);
        }
    }

    #[test]
    fn test_single_person_is_rejected() {
        let (faces, _) = corpus();
        let labels = vec![3; faces.len()];
        assert!(matches!(
            FisherfacesModel::train(&faces, &labels),
            Err(Error::InsufficientTrainingData(_))
        ));
    }
}
