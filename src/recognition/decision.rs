use image::GrayImage;
use log::warn;

use crate::constants::SIMILARITY_SENTINEL;

/// Normalized L2 distance between two images of equal size.
///
/// The score is `‖a − b‖₂ / (rows · cols)`; 0 means identical. Images of
/// different or empty size cannot be compared and score
/// [`SIMILARITY_SENTINEL`], so they are never accepted as a match.
#[must_use]
pub fn similarity(a: &GrayImage, b: &GrayImage) -> f64 {
    let pixels = a.as_raw().len();
    if a.dimensions() != b.dimensions() || pixels == 0 {
        warn!(
            "Images have a different size ({:?} vs {:?}) in similarity()",
            a.dimensions(),
            b.dimensions()
        );
        return SIMILARITY_SENTINEL;
    }
    let sum_sq: f64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let area = pixels as f64;
    sum_sq.sqrt() / area
}

/// Outcome of comparing a reconstruction error with the unknown-person threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The face resembles the training data; trust the model's prediction
    Accept,
    /// The face is not someone the model knows
    Unknown,
}

/// Accept strictly below `threshold`.
#[must_use]
pub fn decide(score: f64, threshold: f64) -> Decision {
    if score < threshold {
        Decision::Accept
    } else {
        Decision::Unknown
    }
}

/// Identity reported for a recognized face
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    Known(usize),
    Unknown,
}

impl Identity {
    #[must_use]
    pub fn label(&self) -> Option<usize> {
        match self {
            Identity::Known(label) => Some(*label),
            Identity::Unknown => None,
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Identity::Known(label) => write!(f, "person {label}"),
            Identity::Unknown => f.write_str("unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_identical_images_score_zero() {
        let a = GrayImage::from_fn(7, 5, |x, y| image::Luma([(x * 30 + y) as u8]));
        assert_eq!(similarity(&a, &a), 0.0);
    }

    #[test]
    fn test_known_score() {
        let a = GrayImage::from_pixel(2, 2, image::Luma([0]));
        let b = GrayImage::from_pixel(2, 2, image::Luma([10]));
        // sqrt(4 * 100) / 4
        assert!((similarity(&a, &b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_size_mismatch_is_sentinel() {
        let a = GrayImage::new(4, 4);
        let b = GrayImage::new(4, 5);
        assert_eq!(similarity(&a, &b), SIMILARITY_SENTINEL);
        assert_eq!(similarity(&GrayImage::new(0, 0), &GrayImage::new(0, 0)), SIMILARITY_SENTINEL);
        assert_eq!(decide(similarity(&a, &b), 0.7), Decision::Unknown);
    }

    #[test]
    fn test_decide_is_strict() {
        assert_eq!(decide(0.69, 0.7), Decision::Accept);
        assert_eq!(decide(0.7, 0.7), Decision::Unknown);
        assert_eq!(decide(0.0, 0.0), Decision::Unknown);
    }

    #[test]
    fn test_identity_display() {
        assert_eq!(Identity::Known(2).to_string(), "person 2");
        assert_eq!(Identity::Unknown.label(), None);
    }

    proptest! {
        #[test]
        fn prop_similarity_symmetric_and_non_negative(
            a in proptest::collection::vec(any::<u8>(), 36),
            b in proptest::collection::vec(any::<u8>(), 36)
        ) {
            let ia = GrayImage::from_raw(6, 6, a).unwrap();
            let ib = GrayImage::from_raw(6, 6, b).unwrap();
            let ab = similarity(&ia, &ib);
            prop_assert!(ab >= 0.0);
            prop_assert_eq!(ab, similarity(&ib, &ia));
            prop_assert_eq!(similarity(&ia, &ia), 0.0);
        }
    }
}
