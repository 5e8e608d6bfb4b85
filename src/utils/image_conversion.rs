//! Image conversion utilities between `image` buffers, `nalgebra` vectors and `ndarray` arrays.

use crate::{Error, Result};
use image::{DynamicImage, GrayImage};
use nalgebra::{DMatrix, DVector};
use ndarray::Array2;

use super::safe_cast::f64_to_u8_saturate;

/// Convert any frame to 8-bit grayscale.
///
/// Uses the ITU-R BT.601 luma weights in the same 14-bit fixed point form
/// as OpenCV's colour conversion, so gray levels match a BGR->GRAY camera
/// pipeline exactly. Alpha is ignored.
#[must_use]
pub fn to_grayscale(frame: &DynamicImage) -> GrayImage {
    match frame {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA16(_) => {
            frame.to_luma8()
        }
        _ => {
            let rgb = frame.to_rgb8();
            GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                let [r, g, b] = rgb.get_pixel(x, y).0;
                let luma = (u32::from(r) * 4899 + u32::from(g) * 9617 + u32::from(b) * 1868 + 8192) >> 14;
                #[allow(clippy::cast_possible_truncation)] // Weighted mean of u8 values fits in u8
                image::Luma([luma as u8])
            })
        }
    }
}

/// Flatten a face into a row-major column vector of intensities.
#[must_use]
pub fn flatten_face(face: &GrayImage) -> DVector<f64> {
    DVector::from_iterator(face.as_raw().len(), face.as_raw().iter().map(|&v| f64::from(v)))
}

/// Stack faces as rows of a `samples x pixels` matrix.
///
/// # Errors
///
/// Returns an error if the list is empty or the faces differ in size
pub fn faces_to_matrix(faces: &[GrayImage]) -> Result<DMatrix<f64>> {
    let first = faces
        .first()
        .ok_or_else(|| Error::InsufficientTrainingData("no faces to stack".to_string()))?;
    let dims = first.dimensions();
    let pixels = first.as_raw().len();
    if pixels == 0 {
        return Err(Error::InvalidInput("faces must not be empty images".to_string()));
    }

    let mut data = DMatrix::<f64>::zeros(faces.len(), pixels);
    for (row, face) in faces.iter().enumerate() {
        if face.dimensions() != dims {
            return Err(Error::InsufficientTrainingData(format!(
                "face {row} is {}x{}, expected {}x{}",
                face.width(),
                face.height(),
                dims.0,
                dims.1
            )));
        }
        for (col, &v) in face.as_raw().iter().enumerate() {
            data[(row, col)] = f64::from(v);
        }
    }
    Ok(data)
}

/// Reshape a vector into an image, rounding and saturating to 0..=255.
///
/// # Errors
///
/// Returns an error if the vector length does not match `width * height`
pub fn vector_to_gray(values: &DVector<f64>, width: u32, height: u32) -> Result<GrayImage> {
    check_len(values.len(), width, height)?;
    let raw = values.iter().map(|&v| f64_to_u8_saturate(v)).collect();
    GrayImage::from_raw(width, height, raw)
        .ok_or_else(|| Error::InvalidInput("failed to build image from vector".to_string()))
}

/// Reshape a vector into an image, stretching its range to 0..=255.
///
/// A constant vector maps to a black image.
///
/// # Errors
///
/// Returns an error if the vector length does not match `width * height`
pub fn vector_to_gray_normalized(values: &DVector<f64>, width: u32, height: u32) -> Result<GrayImage> {
    check_len(values.len(), width, height)?;
    let min = values.min();
    let max = values.max();
    let range = max - min;
    let scale = if range > f64::EPSILON { 255.0 / range } else { 0.0 };
    let raw = values.iter().map(|&v| f64_to_u8_saturate((v - min) * scale)).collect();
    GrayImage::from_raw(width, height, raw)
        .ok_or_else(|| Error::InvalidInput("failed to build image from vector".to_string()))
}

/// View a gray image as a `rows x cols` float array.
#[must_use]
pub fn gray_to_array2(image: &GrayImage) -> Array2<f32> {
    let (w, h) = image.dimensions();
    Array2::from_shape_fn((h as usize, w as usize), |(r, c)| {
        #[allow(clippy::cast_possible_truncation)] // Indices come from u32 dimensions
        f32::from(image.get_pixel(c as u32, r as u32).0[0])
    })
}

/// Convert a `rows x cols` float array back to an 8-bit image, rounding and saturating.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Array shapes originate from u32 image sizes
pub fn array2_to_gray(array: &Array2<f32>) -> GrayImage {
    let (rows, cols) = array.dim();
    GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
        image::Luma([super::safe_cast::f32_to_u8_saturate(array[[y as usize, x as usize]])])
    })
}

fn check_len(len: usize, width: u32, height: u32) -> Result<()> {
    let expected = width as usize * height as usize;
    if len == expected {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "vector of length {len} cannot be reshaped to {width}x{height}"
        )))
    }
}
