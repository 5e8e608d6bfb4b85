use image::GrayImage;
use ndarray::{s, Array2};

use super::subspace::Subspace;
use super::{Algorithm, FaceRecognizer, Prediction};
use crate::{Error, Result};

/// Local binary pattern histogram model.
///
/// Each pixel is encoded by comparing it with `neighbors` points on a circle
/// of `radius` around it. The code image is cut into a `grid_x x grid_y` grid
/// and the normalized code histograms of all cells are concatenated.
/// Prediction is nearest neighbour under the chi-square distance.
#[derive(Debug, Clone)]
pub struct LbphModel {
    radius: i32,
    neighbors: u32,
    grid_x: usize,
    grid_y: usize,
    histograms: Vec<Vec<f64>>,
    labels: Vec<usize>,
    width: u32,
    height: u32,
}

impl LbphModel {
    /// Train with radius 1, 8 neighbours and an 8x8 grid.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientTrainingData` if there are no faces or they differ in size
    pub fn train(faces: &[GrayImage], labels: &[usize]) -> Result<Self> {
        Self::train_with(faces, labels, 1, 8, 8, 8)
    }

    /// # Errors
    ///
    /// Returns `InsufficientTrainingData` if there are no faces or they differ in size,
    /// `InvalidInput` for unusable parameters
    pub fn train_with(
        faces: &[GrayImage],
        labels: &[usize],
        radius: i32,
        neighbors: u32,
        grid_x: usize,
        grid_y: usize,
    ) -> Result<Self> {
        let first = faces
            .first()
            .ok_or_else(|| Error::InsufficientTrainingData("no faces to train on".to_string()))?;
        if radius < 1 || neighbors == 0 || neighbors > 16 || grid_x == 0 || grid_y == 0 {
            return Err(Error::InvalidInput(format!(
                "invalid LBPH parameters: radius {radius}, neighbors {neighbors}, grid {grid_x}x{grid_y}"
            )));
        }
        let mut model = Self {
            radius,
            neighbors,
            grid_x,
            grid_y,
            histograms: Vec::with_capacity(faces.len()),
            labels: labels.to_vec(),
            width: first.width(),
            height: first.height(),
        };
        for face in faces {
            if face.dimensions() != first.dimensions() {
                return Err(Error::InsufficientTrainingData("faces differ in size".to_string()));
            }
            model.histograms.push(model.histogram(face));
        }
        Ok(model)
    }

    fn histogram(&self, face: &GrayImage) -> Vec<f64> {
        let codes = elbp(face, self.radius, self.neighbors);
        spatial_histogram(&codes, 1usize << self.neighbors, self.grid_x, self.grid_y)
    }
}

/// Circular (extended) LBP with bilinear sampling of the neighbours.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn elbp(src: &GrayImage, radius: i32, neighbors: u32) -> Array2<u32> {
    let (w, h) = src.dimensions();
    let rows = h as i32 - 2 * radius;
    let cols = w as i32 - 2 * radius;
    if rows <= 0 || cols <= 0 {
        return Array2::zeros((0, 0));
    }
    let mut dst = Array2::<u32>::zeros((rows as usize, cols as usize));
    let pixel = |x: i32, y: i32| f32::from(src.get_pixel(x as u32, y as u32).0[0]);

    for n in 0..neighbors {
        let angle = 2.0 * std::f32::consts::PI * n as f32 / neighbors as f32;
        let x = radius as f32 * angle.cos();
        let y = -(radius as f32) * angle.sin();
        let (fx, fy) = (x.floor() as i32, y.floor() as i32);
        let (cx, cy) = (x.ceil() as i32, y.ceil() as i32);
        let (tx, ty) = (x - fx as f32, y - fy as f32);
        let w1 = (1.0 - tx) * (1.0 - ty);
        let w2 = tx * (1.0 - ty);
        let w3 = (1.0 - tx) * ty;
        let w4 = tx * ty;

        for i in radius..(h as i32 - radius) {
            for j in radius..(w as i32 - radius) {
                // Interpolate differences to the centre so flat areas compare exactly equal
                let center = pixel(j, i);
                let t = w1 * (pixel(j + fx, i + fy) - center)
                    + w2 * (pixel(j + cx, i + fy) - center)
                    + w3 * (pixel(j + fx, i + cy) - center)
                    + w4 * (pixel(j + cx, i + cy) - center);
                if t > 0.0 || t.abs() < f32::EPSILON {
                    dst[[(i - radius) as usize, (j - radius) as usize]] += 1 << n;
                }
            }
        }
    }
    dst
}

#[allow(clippy::cast_precision_loss)]
fn spatial_histogram(codes: &Array2<u32>, bins: usize, grid_x: usize, grid_y: usize) -> Vec<f64> {
    let (rows, cols) = codes.dim();
    let cell_w = cols / grid_x;
    let cell_h = rows / grid_y;
    let mut out = vec![0.0; bins * grid_x * grid_y];
    if cell_w == 0 || cell_h == 0 {
        return out;
    }

    for gy in 0..grid_y {
        for gx in 0..grid_x {
            let cell = codes.slice(s![gy * cell_h..(gy + 1) * cell_h, gx * cell_w..(gx + 1) * cell_w]);
            let offset = (gy * grid_x + gx) * bins;
            for &code in &cell {
                out[offset + code as usize] += 1.0;
            }
            let total = (cell_w * cell_h) as f64;
            for v in &mut out[offset..offset + bins] {
                *v /= total;
            }
        }
    }
    out
}

/// Symmetric chi-square distance between two histograms
fn chi_square(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let sum = x + y;
            if sum > f64::EPSILON {
                2.0 * (x - y) * (x - y) / sum
            } else {
                0.0
            }
        })
        .sum()
}

impl FaceRecognizer for LbphModel {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Lbph
    }

    fn predict(&self, face: &GrayImage) -> Result<Prediction> {
        if face.dimensions() != (self.width, self.height) {
            return Err(Error::InvalidInput(format!(
                "face is {:?}, model was trained on {:?}",
                face.dimensions(),
                (self.width, self.height)
            )));
        }
        let query = self.histogram(face);
        self.histograms
            .iter()
            .zip(&self.labels)
            .map(|(h, &label)| Prediction {
                label,
                distance: chi_square(h, &query),
            })
            .fold(None, |best: Option<Prediction>, candidate| match best {
                Some(b) if b.distance <= candidate.distance => Some(b),
                _ => Some(candidate),
            })
            .ok_or_else(|| Error::ModelError("model has no training samples".to_string()))
    }

    fn subspace(&self) -> Option<&Subspace> {
        None
    }

    fn face_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn num_samples(&self) -> usize {
        self.labels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_for_dark_and_bright_centres() {
        let dark = GrayImage::from_fn(3, 3, |x, y| image::Luma([if (x, y) == (1, 1) { 10 } else { 200 }]));
        let codes = elbp(&dark, 1, 8);
        assert_eq!(codes.dim(), (1, 1));
        assert_eq!(codes[[0, 0]], 255);

        let bright = GrayImage::from_fn(3, 3, |x, y| image::Luma([if (x, y) == (1, 1) { 250 } else { 100 }]));
        assert_eq!(elbp(&bright, 1, 8)[[0, 0]], 0);
    }

    #[test]
    fn test_histogram_cells_are_normalized() {
        let img = GrayImage::from_fn(18, 18, |x, y| image::Luma([((x * 13 + y * 7) % 256) as u8]));
        let codes = elbp(&img, 1, 8);
        let hist = spatial_histogram(&codes, 256, 2, 2);
        for cell in hist.chunks(256) {
            let total: f64 = cell.iter().sum();
            assert!((total - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_chi_square() {
        assert_eq!(chi_square(&[0.5, 0.5], &[0.5, 0.5]), 0.0);
        assert!((chi_square(&[1.0, 0.0], &[0.0, 1.0]) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_predicts_matching_texture() {
        let stripes = GrayImage::from_fn(24, 24, |x, _| image::Luma([if x % 4 < 2 { 40 } else { 200 }]));
        let checks = GrayImage::from_fn(24, 24, |x, y| image::Luma([if (x / 3 + y / 3) % 2 == 0 { 40 } else { 200 }]));
        let model = LbphModel::train(&[stripes.clone(), checks.clone()], &[0, 1]).unwrap();
        assert_eq!(model.predict(&stripes).unwrap().label, 0);
        assert_eq!(model.predict(&checks).unwrap().label, 1);
        assert!(model.subspace().is_none());
    }
}
