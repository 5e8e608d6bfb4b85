use image::GrayImage;

use super::FaceFilter;
use crate::constants::{ELLIPSE_CENTER_Y, ELLIPSE_HALF_HEIGHT, ELLIPSE_HALF_WIDTH, FILL_GRAY};
use crate::geometry::cv_round;

/// Paint everything outside a centred ellipse with a flat gray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipticalMask {
    /// Vertical centre as a fraction of the height
    pub center_y: f64,
    /// Horizontal half-axis as a fraction of the width
    pub half_width: f64,
    /// Vertical half-axis as a fraction of the height
    pub half_height: f64,
    pub fill: u8,
}

impl Default for EllipticalMask {
    fn default() -> Self {
        Self {
            center_y: ELLIPSE_CENTER_Y,
            half_width: ELLIPSE_HALF_WIDTH,
            half_height: ELLIPSE_HALF_HEIGHT,
            fill: FILL_GRAY,
        }
    }
}

impl EllipticalMask {
    /// Whether pixel `(x, y)` of a `width x height` image lies inside the ellipse
    #[must_use]
    pub fn contains(&self, x: u32, y: u32, width: u32, height: u32) -> bool {
        let cx = f64::from(width / 2);
        let cy = f64::from(cv_round(f64::from(height) * self.center_y));
        let a = f64::from(cv_round(f64::from(width) * self.half_width)).max(1.0);
        let b = f64::from(cv_round(f64::from(height) * self.half_height)).max(1.0);
        let dx = (f64::from(x) - cx) / a;
        let dy = (f64::from(y) - cy) / b;
        dx * dx + dy * dy <= 1.0
    }

    #[must_use]
    pub fn mask(&self, image: &GrayImage) -> GrayImage {
        let (w, h) = image.dimensions();
        let mut out = image.clone();
        for (x, y, pixel) in out.enumerate_pixels_mut() {
            if !self.contains(x, y, w, h) {
                pixel.0[0] = self.fill;
            }
        }
        out
    }
}

impl FaceFilter for EllipticalMask {
    fn apply(&self, image: &GrayImage) -> GrayImage {
        self.mask(image)
    }

    fn name(&self) -> &str {
        "EllipticalMask"
    }
}
