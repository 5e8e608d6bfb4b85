//! Training corpus and the registry of people being enrolled.

use image::GrayImage;
use log::{debug, warn};

use crate::recognition::{self, Algorithm, FaceRecognizer};
use crate::utils::mirror;
use crate::Result;

/// People in creation order; the index is the label.
///
/// Each entry holds the corpus index of the person's most recent
/// non-mirrored sample.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonRegistry {
    latest: Vec<Option<usize>>,
}

impl PersonRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a person and return their label
    pub fn add_person(&mut self) -> usize {
        self.latest.push(None);
        self.latest.len() - 1
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.latest.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }

    #[must_use]
    pub fn contains(&self, person: usize) -> bool {
        person < self.latest.len()
    }

    /// Corpus index of the person's latest sample
    #[must_use]
    pub fn latest_sample(&self, person: usize) -> Option<usize> {
        self.latest.get(person).copied().flatten()
    }

    /// Whether the most recently added person already has a sample
    #[must_use]
    pub fn last_has_sample(&self) -> bool {
        matches!(self.latest.last(), Some(Some(_)))
    }

    pub fn record_sample(&mut self, person: usize, index: usize) {
        match self.latest.get_mut(person) {
            Some(slot) => *slot = Some(index),
            None => warn!("Ignoring sample for unknown person {person}"),
        }
    }

    pub fn clear(&mut self) {
        self.latest.clear();
    }
}

/// Collected faces and their labels.
///
/// Every sample is stored twice: as captured and mirrored left to right.
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    faces: Vec<GrayImage>,
    labels: Vec<usize>,
}

impl TrainingSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `face` and its mirror image, both labelled `label`.
    ///
    /// Returns the index of the non-mirrored copy.
    pub fn add_sample(&mut self, face: GrayImage, label: usize) -> usize {
        let mirrored = mirror(&face);
        self.faces.push(face);
        self.labels.push(label);
        self.faces.push(mirrored);
        self.labels.push(label);
        let index = self.faces.len() - 2;
        debug!("Added sample {index} for person {label} ({} faces total)", self.faces.len());
        index
    }

    #[must_use]
    pub fn faces(&self) -> &[GrayImage] {
        &self.faces
    }

    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Non-empty with one label per face
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        !self.faces.is_empty() && self.faces.len() == self.labels.len()
    }

    /// Number of different labels in the corpus
    #[must_use]
    pub fn distinct_labels(&self) -> usize {
        self.labels.iter().collect::<std::collections::BTreeSet<_>>().len()
    }

    /// # Errors
    ///
    /// Returns `InsufficientTrainingData` if the corpus cannot train `algorithm`
    pub fn check_sufficient(&self, algorithm: Algorithm) -> Result<()> {
        recognition::validate_training_data(&self.faces, &self.labels, algorithm)
    }

    /// Train a fresh model on the whole corpus.
    ///
    /// Passing [`TrainingSet::check_sufficient`] does not guarantee success:
    /// Fisherfaces also fails when no person shows any variation between
    /// samples.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientTrainingData` if the corpus cannot train `algorithm`
    pub fn train(&self, algorithm: Algorithm) -> Result<Box<dyn FaceRecognizer>> {
        recognition::train(&self.faces, &self.labels, algorithm)
    }

    pub fn clear(&mut self) {
        self.faces.clear();
        self.labels.clear();
    }
}
