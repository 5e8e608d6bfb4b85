//! Linear subspace shared by Eigenfaces and Fisherfaces.

use nalgebra::{DMatrix, DVector, SymmetricEigen};

use super::Prediction;
use crate::constants::EIGENVALUE_EPSILON;
use crate::{Error, Result};

/// Mean, basis and projected training samples of a linear face space.
///
/// The basis has one unit-length column per component, each column being a
/// flattened face-sized image.
#[derive(Debug, Clone)]
pub struct Subspace {
    pub mean: DVector<f64>,
    /// `pixels x components`
    pub basis: DMatrix<f64>,
    pub eigenvalues: DVector<f64>,
    /// Training samples in subspace coordinates
    pub projections: Vec<DVector<f64>>,
    pub labels: Vec<usize>,
    pub width: u32,
    pub height: u32,
}

impl Subspace {
    /// Coordinates of a flattened face: `Wᵀ(x − μ)`
    ///
    /// # Errors
    ///
    /// Returns an error if the vector length differs from the model's
    pub fn project(&self, sample: &DVector<f64>) -> Result<DVector<f64>> {
        if sample.len() != self.mean.len() {
            return Err(Error::InvalidInput(format!(
                "sample has {} values, model expects {}",
                sample.len(),
                self.mean.len()
            )));
        }
        Ok(self.basis.tr_mul(&(sample - &self.mean)))
    }

    /// Back-projection of subspace coordinates: `W·y + μ`
    ///
    /// # Errors
    ///
    /// Returns an error if `coords` has the wrong number of components
    pub fn reconstruct(&self, coords: &DVector<f64>) -> Result<DVector<f64>> {
        if coords.len() != self.basis.ncols() {
            return Err(Error::InvalidInput(format!(
                "{} coordinates for a {}-component model",
                coords.len(),
                self.basis.ncols()
            )));
        }
        Ok(&self.basis * coords + &self.mean)
    }

    /// Nearest training sample by Euclidean distance in the subspace
    ///
    /// # Errors
    ///
    /// Returns an error if the model has no training samples
    pub fn nearest(&self, coords: &DVector<f64>) -> Result<Prediction> {
        self.projections
            .iter()
            .zip(&self.labels)
            .map(|(p, &label)| Prediction {
                label,
                distance: (p - coords).norm(),
            })
            .fold(None, |best: Option<Prediction>, candidate| match best {
                Some(b) if b.distance <= candidate.distance => Some(b),
                _ => Some(candidate),
            })
            .ok_or_else(|| Error::ModelError("model has no training samples".to_string()))
    }

    #[must_use]
    pub fn num_components(&self) -> usize {
        self.basis.ncols()
    }
}

/// Principal components of the rows of `data` (`samples x pixels`).
///
/// Returns the mean, a `pixels x k` basis of unit columns sorted by
/// decreasing variance, and the variances. Components whose eigenvalue is
/// negligible compared to the largest are dropped; `max_components` caps k.
///
/// # Errors
///
/// Returns an error if the data has no variance at all
pub fn pca(data: &DMatrix<f64>, max_components: Option<usize>) -> Result<(DVector<f64>, DMatrix<f64>, DVector<f64>)> {
    let (n, d) = data.shape();
    if n == 0 || d == 0 {
        return Err(Error::InsufficientTrainingData("no samples for PCA".to_string()));
    }

    let mean = data.row_mean().transpose();
    let mut centered = data.clone();
    for mut row in centered.row_iter_mut() {
        row -= mean.transpose();
    }
    #[allow(clippy::cast_precision_loss)]
    let norm = n as f64;

    // Eigen-decompose the smaller of the two scatter matrices.
    let (vectors, values) = if n < d {
        let gram = &centered * centered.transpose();
        let eig = SymmetricEigen::new(gram);
        let lifted = centered.transpose() * &eig.eigenvectors;
        (lifted, eig.eigenvalues)
    } else {
        let cov = centered.transpose() * &centered;
        let eig = SymmetricEigen::new(cov);
        (eig.eigenvectors, eig.eigenvalues)
    };

    let order = sorted_significant(&values, max_components);
    if order.is_empty() {
        return Err(Error::InsufficientTrainingData(
            "training faces are identical, nothing to learn".to_string(),
        ));
    }

    let mut basis = DMatrix::<f64>::zeros(d, order.len());
    let mut eigenvalues = DVector::<f64>::zeros(order.len());
    for (k, &i) in order.iter().enumerate() {
        let column = vectors.column(i);
        let length = column.norm();
        if length > 0.0 {
            basis.set_column(k, &(column / length));
        }
        eigenvalues[k] = values[i] / norm;
    }
    Ok((mean, basis, eigenvalues))
}

/// Indices of eigenvalues above the relative cutoff, largest first
pub(crate) fn sorted_significant(values: &DVector<f64>, max_components: Option<usize>) -> Vec<usize> {
    let max = values.iter().copied().fold(0.0f64, f64::max);
    if max <= 0.0 {
        return Vec::new();
    }
    let mut order: Vec<usize> = (0..values.len())
        .filter(|&i| values[i] > max * EIGENVALUE_EPSILON)
        .collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
    if let Some(limit) = max_components {
        order.truncate(limit);
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pca_finds_dominant_direction() {
        // Points along (1, 1) with a little spread along (1, -1)
        let data = DMatrix::from_row_slice(4, 2, &[0.0, 0.0, 10.0, 10.0, 6.0, 4.0, 4.0, 6.0]);
        let (mean, basis, values) = pca(&data, None).unwrap();
        assert!((mean[0] - 5.0).abs() < 1e-12 && (mean[1] - 5.0).abs() < 1e-12);
        assert_eq!(basis.ncols(), 2);
        let first = basis.column(0);
        assert!((first[0].abs() - first[1].abs()).abs() < 1e-9);
        assert!(values[0] > values[1]);
        assert!((first.norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pca_gram_path_basis_is_orthonormal() {
        let data = DMatrix::from_fn(5, 40, |r, c| ((r * 7 + c * 3) % 11) as f64 + (r * c) as f64 * 0.1);
        let (_, basis, _) = pca(&data, None).unwrap();
        let gram = basis.transpose() * &basis;
        for i in 0..gram.nrows() {
            for j in 0..gram.ncols() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((gram[(i, j)] - expected).abs() < 1e-8);
            }
        }
        assert!(basis.ncols() <= 4);
    }

    #[test]
    fn test_pca_rejects_identical_samples() {
        let data = DMatrix::from_element(3, 10, 7.0);
        assert!(matches!(pca(&data, None), Err(Error::InsufficientTrainingData(_))));
    }

    #[test]
    fn test_max_components_caps_basis() {
        let data = DMatrix::from_fn(6, 30, |r, c| ((r + 1) * (c % 5)) as f64 + (r * r) as f64);
        let (_, basis, values) = pca(&data, Some(1)).unwrap();
        assert_eq!(basis.ncols(), 1);
        assert_eq!(values.len(), 1);
    }
}
