//! Utility functions for image regions and numeric conversions.

pub mod image_conversion;
pub mod safe_cast;

use crate::geometry::Rect;
use image::GrayImage;
use safe_cast::i32_to_u32;

/// Copy the part of `image` covered by `region`.
///
/// The region is clipped to the image first; `None` if nothing remains.
#[must_use]
pub fn crop_gray(image: &GrayImage, region: &Rect) -> Option<GrayImage> {
    let (w, h) = image.dimensions();
    let bounded = region.crop_to_bounds(i32::try_from(w).ok()?, i32::try_from(h).ok()?)?;
    let x = i32_to_u32(bounded.x).ok()?;
    let y = i32_to_u32(bounded.y).ok()?;
    let width = i32_to_u32(bounded.width).ok()?;
    let height = i32_to_u32(bounded.height).ok()?;
    Some(image::imageops::crop_imm(image, x, y, width, height).to_image())
}

/// Horizontal mirror image
#[must_use]
pub fn mirror(image: &GrayImage) -> GrayImage {
    image::imageops::flip_horizontal(image)
}
