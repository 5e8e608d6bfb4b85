use image::GrayImage;

use super::FaceFilter;

/// Histogram equalization with the classic cumulative LUT.
///
/// The lowest occupied gray level maps to 0 and the rest are spread over
/// `0..=255` in proportion to the cumulative count above it. An image with a
/// single gray level is returned unchanged.
#[must_use]
pub fn equalize_hist(image: &GrayImage) -> GrayImage {
    let total = image.as_raw().len();
    if total == 0 {
        return image.clone();
    }

    let mut hist = [0usize; 256];
    for &v in image.as_raw() {
        hist[usize::from(v)] += 1;
    }

    let first = hist.iter().position(|&count| count > 0).unwrap_or(0);
    if hist[first] == total {
        return image.clone();
    }

    #[allow(clippy::cast_precision_loss)] // Pixel counts are far below f32 precision limits
    let scale = 255.0f32 / (total - hist[first]) as f32;
    let mut lut = [0u8; 256];
    let mut sum = 0usize;
    for level in (first + 1)..256 {
        sum += hist[level];
        #[allow(clippy::cast_precision_loss)]
        let mapped = sum as f32 * scale;
        lut[level] = crate::utils::safe_cast::f32_to_u8_saturate(mapped);
    }

    let mut out = image.clone();
    for v in out.iter_mut() {
        *v = lut[usize::from(*v)];
    }
    out
}

/// Equalize the left and right halves separately and blend them through the middle.
///
/// Lighting often differs between the two sides of a face. The outer quarters
/// take the half-equalized values, and the two middle quarters fade linearly
/// into the whole-face equalization so there is no seam at the centre line.
#[must_use]
pub fn equalize_left_and_right_halves(face: &GrayImage) -> GrayImage {
    let (w, h) = face.dimensions();
    if w < 2 || h == 0 {
        return equalize_hist(face);
    }

    let whole = equalize_hist(face);
    let mid_x = w / 2;
    let left = equalize_hist(&image::imageops::crop_imm(face, 0, 0, mid_x, h).to_image());
    let right = equalize_hist(&image::imageops::crop_imm(face, mid_x, 0, w - mid_x, h).to_image());

    let quarter = w / 4;
    let half = w * 2 / 4;
    let three_quarters = w * 3 / 4;
    #[allow(clippy::cast_precision_loss)]
    let span = w as f32 * 0.25;

    GrayImage::from_fn(w, h, |x, y| {
        let v = if x < quarter {
            left.get_pixel(x, y).0[0]
        } else if x < half {
            let lv = f32::from(left.get_pixel(x, y).0[0]);
            let wv = f32::from(whole.get_pixel(x, y).0[0]);
            #[allow(clippy::cast_precision_loss)]
            let f = (x - quarter) as f32 / span;
            blend(lv, wv, f)
        } else if x < three_quarters {
            let rv = f32::from(right.get_pixel(x - mid_x, y).0[0]);
            let wv = f32::from(whole.get_pixel(x, y).0[0]);
            #[allow(clippy::cast_precision_loss)]
            let f = (x - half) as f32 / span;
            blend(wv, rv, f)
        } else {
            right.get_pixel(x - mid_x, y).0[0]
        };
        image::Luma([v])
    })
}

fn blend(from: f32, to: f32, f: f32) -> u8 {
    crate::utils::safe_cast::f32_to_u8_saturate((1.0 - f) * from + f * to)
}

/// Whole-face histogram equalization
#[derive(Debug, Clone, Copy, Default)]
pub struct HistogramEqualizer;

impl FaceFilter for HistogramEqualizer {
    fn apply(&self, image: &GrayImage) -> GrayImage {
        equalize_hist(image)
    }

    fn name(&self) -> &str {
        "HistogramEqualizer"
    }
}

/// Split-half equalization, see [`equalize_left_and_right_halves`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SplitHalvesEqualizer;

impl FaceFilter for SplitHalvesEqualizer {
    fn apply(&self, image: &GrayImage) -> GrayImage {
        equalize_left_and_right_halves(image)
    }

    fn name(&self) -> &str {
        "SplitHalvesEqualizer"
    }
}
