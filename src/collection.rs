//! Gate that decides whether a face is worth adding while collecting.
//!
//! Consecutive camera frames are almost identical, so a face is only
//! collected when it differs noticeably from the last collected one and
//! enough time has passed since then.

use std::time::Duration;

use image::GrayImage;
use log::trace;

use crate::constants::{CHANGE_IN_IMAGE_FOR_COLLECTION, CHANGE_IN_SECONDS_FOR_COLLECTION};
use crate::recognition::decision::similarity;

/// Image difference and elapsed time measured for one candidate face
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateDecision {
    pub accepted: bool,
    /// Similarity score to the previous collected face, `None` if there is none
    pub image_diff: Option<f64>,
    /// Time since the previous collected face, `None` if there is none
    pub elapsed: Option<Duration>,
}

/// Change and interval gate for face collection
#[derive(Debug, Clone)]
pub struct CollectionGate {
    change_threshold: f64,
    min_interval: Duration,
    previous: Option<(GrayImage, Duration)>,
}

impl Default for CollectionGate {
    fn default() -> Self {
        Self::new(
            CHANGE_IN_IMAGE_FOR_COLLECTION,
            Duration::from_secs_f64(CHANGE_IN_SECONDS_FOR_COLLECTION),
        )
    }
}

impl CollectionGate {
    #[must_use]
    pub fn new(change_threshold: f64, min_interval: Duration) -> Self {
        Self {
            change_threshold,
            min_interval,
            previous: None,
        }
    }

    /// Measure `face` at time `now` against the last collected face.
    ///
    /// With nothing collected yet, both conditions count as met.
    #[must_use]
    pub fn evaluate(&self, face: &GrayImage, now: Duration) -> GateDecision {
        let Some((previous, at)) = &self.previous else {
            return GateDecision {
                accepted: true,
                image_diff: None,
                elapsed: None,
            };
        };
        let image_diff = similarity(face, previous);
        let elapsed = now.saturating_sub(*at);
        let accepted = image_diff > self.change_threshold && elapsed > self.min_interval;
        trace!(
            "collection gate: diff {image_diff:.3}, elapsed {:.2}s -> {accepted}",
            elapsed.as_secs_f64()
        );
        GateDecision {
            accepted,
            image_diff: Some(image_diff),
            elapsed: Some(elapsed),
        }
    }

    /// Remember `face` as the last collected one
    pub fn record(&mut self, face: GrayImage, now: Duration) {
        self.previous = Some((face, now));
    }

    /// Evaluate and, if accepted, record in one step
    pub fn offer(&mut self, face: &GrayImage, now: Duration) -> GateDecision {
        let decision = self.evaluate(face, now);
        if decision.accepted {
            self.record(face.clone(), now);
        }
        decision
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }

    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_first_face_is_accepted() {
        let mut gate = CollectionGate::default();
        let face = GrayImage::from_pixel(10, 10, image::Luma([100]));
        let d = gate.offer(&face, secs(0.0));
        assert!(d.accepted);
        assert_eq!(d.image_diff, None);
        assert!(gate.has_previous());
    }

    #[test]
    fn test_needs_both_change_and_time() {
        let mut gate = CollectionGate::default();
        let a = GrayImage::from_pixel(10, 10, image::Luma([0]));
        // similarity(a, b) = sqrt(100 * 200^2) / 100 = 20
        let b = GrayImage::from_pixel(10, 10, image::Luma([200]));
        gate.offer(&a, secs(5.0));

        assert!(!gate.offer(&a, secs(7.0)).accepted, "unchanged face");
        assert!(!gate.offer(&b, secs(5.5)).accepted, "too soon");
        assert!(gate.offer(&b, secs(6.01)).accepted);
    }

    #[test]
    fn test_reset_forgets_previous() {
        let mut gate = CollectionGate::new(0.3, secs(1.0));
        let a = GrayImage::from_pixel(4, 4, image::Luma([10]));
        gate.offer(&a, secs(0.0));
        gate.reset();
        assert!(gate.offer(&a, secs(0.1)).accepted);
    }
}
