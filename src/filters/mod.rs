//! Photometric filters applied to aligned faces.
//!
//! Every filter is a pure function from one 8-bit gray image to a new one;
//! inputs are never modified. The normalizer runs them as a [`FilterChain`]:
//! histogram equalization (whole face or split halves), bilateral smoothing,
//! then the elliptical mask.

/// Histogram equalization, whole image and split-half variants
pub mod equalize;

/// Edge-preserving bilateral smoothing
pub mod bilateral;

/// Elliptical vignette that hides hair and background
pub mod mask;

use image::GrayImage;

pub use bilateral::BilateralFilter;
pub use equalize::{equalize_hist, equalize_left_and_right_halves, HistogramEqualizer, SplitHalvesEqualizer};
pub use mask::EllipticalMask;

/// Trait for all face image filters
pub trait FaceFilter: Send + Sync {
    /// Apply the filter, returning a new image of the same size
    fn apply(&self, image: &GrayImage) -> GrayImage;

    /// Get filter name
    fn name(&self) -> &str;
}

/// Ordered sequence of filters
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn FaceFilter>>,
}

impl FilterChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter to the end of the chain
    #[must_use]
    pub fn with(mut self, filter: Box<dyn FaceFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Run every filter in order
    #[must_use]
    pub fn apply(&self, image: &GrayImage) -> GrayImage {
        self.filters
            .iter()
            .fold(image.clone(), |current, filter| filter.apply(&current))
    }

    /// Names of the filters, in order
    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_chain_is_identity() {
        let chain = FilterChain::new();
        let img = GrayImage::from_fn(8, 8, |x, y| image::Luma([(x * 8 + y) as u8]));
        assert!(chain.is_empty());
        assert_eq!(chain.apply(&img), img);
    }

    #[test]
    fn test_chain_runs_in_order() {
        let chain = FilterChain::new()
            .with(Box::new(HistogramEqualizer))
            .with(Box::new(EllipticalMask::default()));
        assert_eq!(chain.names(), vec!["HistogramEqualizer", "EllipticalMask"]);

        let img = GrayImage::from_fn(20, 20, |x, _| image::Luma([(x * 3) as u8]));
        let out = chain.apply(&img);
        assert_eq!(out, EllipticalMask::default().apply(&equalize_hist(&img)));
    }
}
