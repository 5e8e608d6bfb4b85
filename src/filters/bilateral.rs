use image::GrayImage;
use ndarray::Array2;

use super::FaceFilter;
use crate::constants::{BILATERAL_SIGMA_COLOR, BILATERAL_SIGMA_SPACE};
use crate::geometry::cv_round;
use crate::utils::image_conversion::{array2_to_gray, gray_to_array2};

/// Edge-preserving smoothing.
///
/// Each output pixel is a weighted mean over a circular neighbourhood, the
/// weight being the product of a spatial Gaussian and a Gaussian on the
/// intensity difference to the centre pixel. Borders are reflected without
/// repeating the edge pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BilateralFilter {
    /// Neighbourhood diameter; 0 or less derives it from `sigma_space`
    pub diameter: i32,
    pub sigma_color: f64,
    pub sigma_space: f64,
}

impl Default for BilateralFilter {
    fn default() -> Self {
        Self::new(0, BILATERAL_SIGMA_COLOR, BILATERAL_SIGMA_SPACE)
    }
}

impl BilateralFilter {
    #[must_use]
    pub fn new(diameter: i32, sigma_color: f64, sigma_space: f64) -> Self {
        Self {
            diameter,
            sigma_color,
            sigma_space,
        }
    }

    /// Neighbourhood radius in pixels
    #[must_use]
    pub fn radius(&self) -> i32 {
        let sigma_space = if self.sigma_space <= 0.0 { 1.0 } else { self.sigma_space };
        let radius = if self.diameter <= 0 {
            cv_round(sigma_space * 1.5)
        } else {
            self.diameter / 2
        };
        radius.max(1)
    }

    /// Filter a gray image
    #[must_use]
    pub fn filter(&self, image: &GrayImage) -> GrayImage {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return image.clone();
        }

        let sigma_color = if self.sigma_color <= 0.0 { 1.0 } else { self.sigma_color };
        let sigma_space = if self.sigma_space <= 0.0 { 1.0 } else { self.sigma_space };
        #[allow(clippy::cast_possible_truncation)]
        let color_coeff = (-0.5 / (sigma_color * sigma_color)) as f32;
        #[allow(clippy::cast_possible_truncation)]
        let space_coeff = (-0.5 / (sigma_space * sigma_space)) as f32;

        let color_weight: Vec<f32> = (0..256)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let d = i as f32;
                (d * d * color_coeff).exp()
            })
            .collect();

        let radius = self.radius();
        let mut kernel: Vec<(isize, isize, f32)> = Vec::new();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let r = f64::from(dx * dx + dy * dy).sqrt();
                if r > f64::from(radius) {
                    continue;
                }
                #[allow(clippy::cast_possible_truncation)]
                let weight = ((r * r) as f32 * space_coeff).exp();
                kernel.push((dy as isize, dx as isize, weight));
            }
        }

        let src = gray_to_array2(image);
        let (rows, cols) = src.dim();
        let out = Array2::from_shape_fn((rows, cols), |(r, c)| {
            let center = src[[r, c]];
            let mut sum = 0.0f32;
            let mut wsum = 0.0f32;
            for &(dy, dx, space_w) in &kernel {
                let sr = reflect_101(r as isize + dy, rows);
                let sc = reflect_101(c as isize + dx, cols);
                let value = src[[sr, sc]];
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let diff = (value - center).abs() as usize;
                let weight = space_w * color_weight[diff.min(255)];
                sum += value * weight;
                wsum += weight;
            }
            sum / wsum
        });
        array2_to_gray(&out)
    }
}

/// Mirror an out-of-range index back into `0..len` without repeating the edge (`dcb|abcd|cba`).
fn reflect_101(index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let n = len as isize;
    let mut i = index;
    while i < 0 || i >= n {
        if i < 0 {
            i = -i;
        }
        if i >= n {
            i = 2 * n - 2 - i;
        }
    }
    #[allow(clippy::cast_sign_loss)]
    let idx = i as usize;
    idx
}

impl FaceFilter for BilateralFilter {
    fn apply(&self, image: &GrayImage) -> GrayImage {
        self.filter(image)
    }

    fn name(&self) -> &str {
        "BilateralFilter"
    }
}
