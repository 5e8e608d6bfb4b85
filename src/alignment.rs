//! Geometric face alignment from two eye positions.
//!
//! The similarity transform rotates the face so the eyes are horizontal,
//! scales it so the eye distance matches the canonical distance, and
//! translates the eye midpoint to its canonical position in a square
//! output image.

use image::GrayImage;

use crate::constants::{DESIRED_LEFT_EYE_X, DESIRED_LEFT_EYE_Y};
use crate::geometry::{Point, Point2f};
use crate::utils::safe_cast::f64_to_u8_saturate;

/// 2x3 affine matrix mapping source to destination coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub m: [[f64; 3]; 2],
}

impl AffineTransform {
    /// Rotation by `angle` degrees about `center` combined with uniform `scale`.
    ///
    /// Positive angles rotate counter-clockwise in image coordinates (y down),
    /// matching the usual computer vision convention.
    #[must_use]
    pub fn rotation(center: Point2f, angle: f64, scale: f64) -> Self {
        let (sin, cos) = angle.to_radians().sin_cos();
        let alpha = scale * cos;
        let beta = scale * sin;
        Self {
            m: [
                [alpha, beta, (1.0 - alpha) * center.x - beta * center.y],
                [-beta, alpha, beta * center.x + (1.0 - alpha) * center.y],
            ],
        }
    }

    #[must_use]
    pub fn apply(&self, p: Point2f) -> Point2f {
        Point2f::new(
            self.m[0][0] * p.x + self.m[0][1] * p.y + self.m[0][2],
            self.m[1][0] * p.x + self.m[1][1] * p.y + self.m[1][2],
        )
    }

    /// Inverse transform, `None` if the linear part is singular
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let [[a, b, tx], [c, d, ty]] = self.m;
        let det = a * d - b * c;
        if det.abs() < f64::EPSILON {
            return None;
        }
        let inv = 1.0 / det;
        let ia = d * inv;
        let ib = -b * inv;
        let ic = -c * inv;
        let id = a * inv;
        Some(Self {
            m: [
                [ia, ib, -(ia * tx + ib * ty)],
                [ic, id, -(ic * tx + id * ty)],
            ],
        })
    }
}

/// Similarity transform that brings two eyes to their canonical positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeAlignment {
    /// Tilt of the eye line in degrees
    pub angle: f64,
    /// Zoom applied to reach the canonical eye distance
    pub scale: f64,
    pub eyes_center: Point2f,
    pub transform: AffineTransform,
}

impl EyeAlignment {
    /// Compute the alignment for a `face_size x face_size` output.
    ///
    /// `desired_left_eye` is the canonical left eye position as fractions of
    /// the output size; the right eye mirrors it. Returns `None` when both
    /// eyes are at the same spot.
    #[must_use]
    pub fn compute(left_eye: Point, right_eye: Point, face_size: u32, desired_left_eye: (f64, f64)) -> Option<Self> {
        let left = left_eye.to_f();
        let right = right_eye.to_f();
        let eyes_center = left.midpoint(right);
        let len = left.distance(right);
        if len <= f64::EPSILON {
            return None;
        }

        let size = f64::from(face_size);
        let angle = left.angle_to(right);
        let desired_len = (1.0 - 2.0 * desired_left_eye.0) * size;
        let scale = desired_len / len;

        let mut transform = AffineTransform::rotation(eyes_center, angle, scale);
        transform.m[0][2] += size * 0.5 - eyes_center.x;
        transform.m[1][2] += size * desired_left_eye.1 - eyes_center.y;

        Some(Self {
            angle,
            scale,
            eyes_center,
            transform,
        })
    }

    /// Alignment with the default canonical eye position
    #[must_use]
    pub fn with_default_eyes(left_eye: Point, right_eye: Point, face_size: u32) -> Option<Self> {
        Self::compute(left_eye, right_eye, face_size, (DESIRED_LEFT_EYE_X, DESIRED_LEFT_EYE_Y))
    }
}

/// Warp `src` into a `width x height` image with bilinear interpolation.
///
/// Source samples outside `src` take the value `fill`, so pixels near the
/// border of the covered area blend towards it.
#[must_use]
pub fn warp_affine(src: &GrayImage, transform: &AffineTransform, width: u32, height: u32, fill: u8) -> GrayImage {
    let Some(inv) = transform.inverse() else {
        return GrayImage::from_pixel(width, height, image::Luma([fill]));
    };

    let (sw, sh) = src.dimensions();
    let sample = |x: i64, y: i64| -> f64 {
        if x < 0 || y < 0 || x >= i64::from(sw) || y >= i64::from(sh) {
            f64::from(fill)
        } else {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let v = src.get_pixel(x as u32, y as u32).0[0];
            f64::from(v)
        }
    };

    GrayImage::from_fn(width, height, |x, y| {
        let p = inv.apply(Point2f::new(f64::from(x), f64::from(y)));
        let x0f = p.x.floor();
        let y0f = p.y.floor();
        let fx = p.x - x0f;
        let fy = p.y - y0f;
        #[allow(clippy::cast_possible_truncation)]
        let (x0, y0) = (x0f as i64, y0f as i64);

        let top = sample(x0, y0) * (1.0 - fx) + sample(x0 + 1, y0) * fx;
        let bottom = sample(x0, y0 + 1) * (1.0 - fx) + sample(x0 + 1, y0 + 1) * fx;
        image::Luma([f64_to_u8_saturate(top * (1.0 - fy) + bottom * fy)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_near(p: Point2f, x: f64, y: f64, tol: f64) {
        assert!(
            (p.x - x).abs() <= tol && (p.y - y).abs() <= tol,
            "({}, {}) not within {tol} of ({x}, {y})",
            p.x,
            p.y
        );
    }

    #[test]
    fn test_rotation_keeps_center_fixed() {
        let c = Point2f::new(12.0, -3.0);
        let t = AffineTransform::rotation(c, 33.0, 1.7);
        assert_near(t.apply(c), 12.0, -3.0, 1e-9);
    }

    #[test]
    fn test_inverse_round_trip() {
        let t = AffineTransform::rotation(Point2f::new(5.0, 8.0), -20.0, 0.8);
        let inv = t.inverse().unwrap();
        let p = Point2f::new(3.5, 41.0);
        assert_near(inv.apply(t.apply(p)), 3.5, 41.0, 1e-9);
    }

    #[test]
    fn test_eyes_land_on_canonical_positions() {
        let w = 70u32;
        for (left, right) in [
            (Point::new(30, 38), Point::new(70, 38)),
            (Point::new(25, 45), Point::new(75, 30)),
            (Point::new(100, 90), Point::new(160, 110)),
        ] {
            let a = EyeAlignment::with_default_eyes(left, right, w).unwrap();
            assert_near(a.transform.apply(left.to_f()), 0.16 * 70.0, 0.14 * 70.0, 1.0);
            assert_near(a.transform.apply(right.to_f()), 0.84 * 70.0, 0.14 * 70.0, 1.0);
        }
    }

    #[test]
    fn test_coincident_eyes_have_no_alignment() {
        assert!(EyeAlignment::with_default_eyes(Point::new(5, 5), Point::new(5, 5), 70).is_none());
    }

    #[test]
    fn test_warp_identity_and_fill() {
        let src = GrayImage::from_fn(10, 10, |x, y| image::Luma([(x * 20 + y) as u8]));
        let identity = AffineTransform::rotation(Point2f::new(0.0, 0.0), 0.0, 1.0);
        let out = warp_affine(&src, &identity, 10, 10, 128);
        assert_eq!(out, src);

        let shifted = AffineTransform {
            m: [[1.0, 0.0, 20.0], [0.0, 1.0, 0.0]],
        };
        let out = warp_affine(&src, &shifted, 10, 10, 128);
        assert!(out.pixels().all(|p| p.0[0] == 128));
    }
}
