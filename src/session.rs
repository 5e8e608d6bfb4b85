//! Session state machine: detection, collection, training and recognition.
//!
//! [`SessionState`] holds the mode, the enrolled people and the selected
//! person, and changes only through [`SessionState::on_event`], a pure
//! function. [`Session`] owns that state together with the normalizer, the
//! training corpus and the current model, and does the per-frame work for
//! whatever mode the state is in.
//!
//! ```text
//! Startup -> Detecting --AddPerson/SelectPerson--> CollectingFaces --Train--> Training
//!                ^                                        ^                   |    |
//!                |                                        +---- insufficient -+    |
//!                +---- ResettingAll <--Reset-- (any)          Recognizing <--------+
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use image::{DynamicImage, GrayImage};
use log::{debug, info, warn};

use crate::collection::CollectionGate;
use crate::constants::{
    CHANGE_IN_IMAGE_FOR_COLLECTION, CHANGE_IN_SECONDS_FOR_COLLECTION, DEFAULT_FACE_WIDTH,
    SIMILARITY_SENTINEL, UNKNOWN_PERSON_THRESHOLD_FISHERFACES,
};
use crate::preprocess::{FaceDetection, FaceNormalizer};
use crate::recognition::decision::{decide, similarity, Decision, Identity};
use crate::recognition::diagnostics::ModelDiagnostics;
use crate::recognition::{self, Algorithm, FaceRecognizer, Prediction};
use crate::training::{PersonRegistry, TrainingSet};
use crate::{Error, Result};

/// What the session does with each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Startup,
    Detecting,
    CollectingFaces,
    Training,
    Recognizing,
    ResettingAll,
}

impl Mode {
    pub const ALL: [Mode; 6] = [
        Mode::Startup,
        Mode::Detecting,
        Mode::CollectingFaces,
        Mode::Training,
        Mode::Recognizing,
        Mode::ResettingAll,
    ];

    /// Label shown to the user
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Startup => "Startup",
            Mode::Detecting => "Detection",
            Mode::CollectingFaces => "Collect Faces",
            Mode::Training => "Training",
            Mode::Recognizing => "Recognition",
            Mode::ResettingAll => "Delete All",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "startup" => Ok(Mode::Startup),
            "detection" | "detecting" => Ok(Mode::Detecting),
            "collectfaces" | "collectingfaces" => Ok(Mode::CollectingFaces),
            "training" => Ok(Mode::Training),
            "recognition" | "recognizing" => Ok(Mode::Recognizing),
            "deleteall" | "resettingall" => Ok(Mode::ResettingAll),
            _ => Err(Error::ConfigError(format!("Unknown session mode: {s}"))),
        }
    }
}

/// User input that changes the session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Start enrolling a new person (or keep enrolling an empty one)
    AddPerson,
    /// Continue collecting faces for an existing person
    SelectPerson(usize),
    /// Forget every person, face and model
    Reset,
    /// Train on what has been collected
    Train,
    /// Toggle model introspection output
    ToggleDebug,
}

/// Mode, people and selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub mode: Mode,
    pub selected_person: Option<usize>,
    pub persons: PersonRegistry,
    pub debug: bool,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Leave `Startup` once the session is ready
    #[must_use]
    pub fn started(mut self) -> Self {
        if self.mode == Mode::Startup {
            self.mode = Mode::Detecting;
        }
        self
    }

    /// Apply a user event
    #[must_use]
    pub fn on_event(mut self, event: Event) -> Self {
        match event {
            Event::AddPerson => {
                // Reuse the last person if nothing was collected for them yet
                if self.persons.is_empty() || self.persons.last_has_sample() {
                    let label = self.persons.add_person();
                    info!("Added new person {label}");
                }
                self.selected_person = Some(self.persons.len() - 1);
                self.mode = Mode::CollectingFaces;
            }
            Event::SelectPerson(person) => {
                if self.persons.contains(person) {
                    self.selected_person = Some(person);
                    self.mode = Mode::CollectingFaces;
                } else {
                    warn!("Cannot select person {person}, only {} enrolled", self.persons.len());
                }
            }
            Event::Reset => self.mode = Mode::ResettingAll,
            Event::Train => {
                if self.mode == Mode::CollectingFaces {
                    self.mode = Mode::Training;
                } else {
                    debug!("Train ignored in mode {}", self.mode);
                }
            }
            Event::ToggleDebug => self.debug = !self.debug,
        }
        self
    }
}

/// Per-session tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSettings {
    pub face_width: u32,
    /// Equalize the two halves of the face separately
    pub separate_halves: bool,
    pub algorithm: Algorithm,
    /// Reconstruction error at or above which a face is unknown
    pub unknown_threshold: f64,
    /// Minimum similarity score between consecutively collected faces
    pub change_threshold: f64,
    /// Minimum time between consecutively collected faces
    pub collection_interval: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            face_width: DEFAULT_FACE_WIDTH,
            separate_halves: true,
            algorithm: Algorithm::Fisherfaces,
            unknown_threshold: UNKNOWN_PERSON_THRESHOLD_FISHERFACES,
            change_threshold: CHANGE_IN_IMAGE_FOR_COLLECTION,
            collection_interval: Duration::from_secs_f64(CHANGE_IN_SECONDS_FOR_COLLECTION),
        }
    }
}

/// A face added to the corpus
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollectedSample {
    pub person: usize,
    /// Corpus index of the non-mirrored copy
    pub index: usize,
}

/// Result of a training request
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingOutcome {
    Trained { faces: usize, persons: usize },
    Insufficient(String),
}

/// Recognition result for one face
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub identity: Identity,
    /// Reconstruction error; [`SIMILARITY_SENTINEL`] if it could not be computed
    pub similarity: f64,
    /// Nearest training sample, only looked up for accepted faces
    pub prediction: Option<Prediction>,
    pub reconstruction: Option<GrayImage>,
}

/// What happened during one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Mode the frame was processed in
    pub mode: Mode,
    pub detection: FaceDetection,
    pub collected: Option<CollectedSample>,
    pub training: Option<TrainingOutcome>,
    pub recognition: Option<Recognition>,
}

impl FrameReport {
    fn new(mode: Mode, detection: FaceDetection) -> Self {
        Self {
            mode,
            detection,
            collected: None,
            training: None,
            recognition: None,
        }
    }
}

/// Interactive recognition session
pub struct Session {
    state: SessionState,
    normalizer: FaceNormalizer,
    settings: SessionSettings,
    training: TrainingSet,
    model: Option<Box<dyn FaceRecognizer>>,
    gate: CollectionGate,
}

impl Session {
    #[must_use]
    pub fn new(normalizer: FaceNormalizer, settings: SessionSettings) -> Self {
        if !settings.algorithm.supports_reconstruction() {
            warn!(
                "{} cannot reconstruct faces; every recognized face will be reported as unknown",
                settings.algorithm
            );
        }
        Self {
            state: SessionState::new().started(),
            normalizer,
            gate: CollectionGate::new(settings.change_threshold, settings.collection_interval),
            settings,
            training: TrainingSet::new(),
            model: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    #[must_use]
    pub fn training_set(&self) -> &TrainingSet {
        &self.training
    }

    #[must_use]
    pub fn model(&self) -> Option<&dyn FaceRecognizer> {
        self.model.as_deref()
    }

    pub fn handle_event(&mut self, event: Event) {
        let state = std::mem::take(&mut self.state);
        self.state = state.on_event(event);
        debug!("{event:?} -> mode {}", self.state.mode);
    }

    /// Normalize the face in `frame` and run the current mode on it.
    ///
    /// `timestamp` is the frame time since an arbitrary fixed origin.
    ///
    /// # Errors
    ///
    /// Returns an error if a detector backend fails
    pub fn process_frame(&mut self, frame: &DynamicImage, timestamp: Duration) -> Result<FrameReport> {
        let detection =
            self.normalizer
                .preprocess(frame, self.settings.face_width, self.settings.separate_halves)?;
        self.step(detection, timestamp)
    }

    /// Run the current mode on an already normalized detection.
    ///
    /// # Errors
    ///
    /// Returns an error if identification of an accepted face fails
    pub fn step(&mut self, detection: FaceDetection, timestamp: Duration) -> Result<FrameReport> {
        let mode = self.state.mode;
        let mut report = FrameReport::new(mode, detection);
        match mode {
            Mode::Startup => self.state.mode = Mode::Detecting,
            Mode::Detecting => {}
            Mode::CollectingFaces => {
                if let Some(face) = &report.detection.face {
                    report.collected = self.collect(face, timestamp);
                }
            }
            Mode::Training => report.training = Some(self.train()),
            Mode::Recognizing => {
                if let Some(face) = &report.detection.face {
                    report.recognition = self.recognize_face(face)?;
                }
            }
            Mode::ResettingAll => self.reset_all(),
        }
        Ok(report)
    }

    fn collect(&mut self, face: &GrayImage, timestamp: Duration) -> Option<CollectedSample> {
        let person = self.state.selected_person?;
        let decision = self.gate.offer(face, timestamp);
        if !decision.accepted {
            return None;
        }
        let index = self.training.add_sample(face.clone(), person);
        self.state.persons.record_sample(person, index);
        info!(
            "Added face {} for person {} (diff {})",
            self.training.len() / 2,
            person,
            decision.image_diff.map_or_else(|| "n/a".to_string(), |d| format!("{d:.3}"))
        );
        Some(CollectedSample { person, index })
    }

    fn train(&mut self) -> TrainingOutcome {
        let algorithm = self.settings.algorithm;
        match self
            .training
            .check_sufficient(algorithm)
            .and_then(|()| self.training.train(algorithm))
        {
            Ok(model) => {
                self.model = Some(model);
                self.state.mode = Mode::Recognizing;
                if self.state.debug {
                    self.log_diagnostics();
                }
                TrainingOutcome::Trained {
                    faces: self.training.len(),
                    persons: self.training.distinct_labels(),
                }
            }
            Err(e) => {
                warn!("Cannot train yet: {e}");
                self.state.mode = Mode::CollectingFaces;
                TrainingOutcome::Insufficient(e.to_string())
            }
        }
    }

    fn log_diagnostics(&self) {
        match self.diagnostics() {
            Ok(diag) => diag.log_summary(),
            Err(e) => warn!("No model diagnostics: {e}"),
        }
    }

    /// Introspect the current model.
    ///
    /// # Errors
    ///
    /// Returns `ModelIncompatible` without a model or for models without a subspace
    pub fn diagnostics(&self) -> Result<ModelDiagnostics> {
        let model = self
            .model
            .as_deref()
            .ok_or_else(|| Error::ModelIncompatible("no model trained yet".to_string()))?;
        ModelDiagnostics::from_model(model, crate::constants::MAX_DIAGNOSTIC_EIGENFACES)
    }

    /// Reconstruct, score and, if close enough, identify a normalized face.
    ///
    /// Returns `None` when there is no model or the corpus is not usable.
    ///
    /// # Errors
    ///
    /// Returns an error if identification of an accepted face fails
    pub fn recognize_face(&self, face: &GrayImage) -> Result<Option<Recognition>> {
        let Some(model) = self.model.as_deref() else {
            return Ok(None);
        };
        if !self.training.is_consistent() {
            return Ok(None);
        }

        let (score, reconstruction) = match recognition::reconstruct(model, face) {
            Ok(rebuilt) => (similarity(face, &rebuilt), Some(rebuilt)),
            Err(e) => {
                warn!("Reconstruction failed: {e}");
                (SIMILARITY_SENTINEL, None)
            }
        };

        let (identity, prediction) = match decide(score, self.settings.unknown_threshold) {
            Decision::Accept => {
                let prediction = recognition::identify(model, face)?;
                (Identity::Known(prediction.label), Some(prediction))
            }
            Decision::Unknown => (Identity::Unknown, None),
        };
        debug!("Identity: {identity}. Similarity: {score:.4}");

        Ok(Some(Recognition {
            identity,
            similarity: score,
            prediction,
            reconstruction,
        }))
    }

    fn reset_all(&mut self) {
        self.training.clear();
        self.model = None;
        self.gate.reset();
        self.state.persons.clear();
        self.state.selected_person = None;
        self.state.mode = Mode::Detecting;
        info!("Deleted all collected faces and the model");
    }
}
