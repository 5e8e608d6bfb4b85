//! Training, reconstruction and identity decisions on synthetic corpora


use image::{GrayImage, Luma};
use test_helpers::{pattern_a, pattern_b, person_samples, random_face, sample, FACE_WIDTH};
use webcam_face_rec::recognition::decision::{decide, similarity, Decision};
use webcam_face_rec::recognition::diagnostics::ModelDiagnostics;
use webcam_face_rec::recognition::{self, Algorithm, FaceRecognizer};
use webcam_face_rec::training::TrainingSet;
use webcam_face_rec::Error;

/// Three samples of each person, stored with their mirror images
fn corpus() -> TrainingSet {
    let mut set = TrainingSet::new();
    for face in person_samples(pattern_a, 1) {
        set.add_sample(face, 0);
    }
    for face in person_samples(pattern_b, 2) {
        set.add_sample(face, 1);
    }
    set
}

fn score(model: &dyn FaceRecognizer, face: &GrayImage) -> f64 {
    let rebuilt = recognition::reconstruct(model, face).unwrap();
    similarity(face, &rebuilt)
}

#[test]
fn test_corpus_shape() {
    let set = corpus();
    assert_eq!(set.len(), 12);
    assert_eq!(set.labels(), &[0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1]);
    assert_eq!(set.distinct_labels(), 2);
}

#[test]
fn test_subspace_models_accept_and_identify_known_people() {
    let set = corpus();
    let held_out_a = sample(pattern_a, 12.0, 901);
    let held_out_b = sample(pattern_b, -12.0, 902);

    for algorithm in [Algorithm::Eigenfaces, Algorithm::Fisherfaces] {
        let model = set.train(algorithm).unwrap();
        let threshold = algorithm.default_unknown_threshold();

        for (face, label) in [(&held_out_a, 0), (&held_out_b, 1)] {
            let s = score(model.as_ref(), face);
            assert_eq!(decide(s, threshold), Decision::Accept, "{algorithm}: similarity {s}");
            assert_eq!(recognition::identify(model.as_ref(), face).unwrap().label, label, "{algorithm}");
        }
    }
}

#[test]
fn test_subspace_models_reject_strangers() {
    let set = corpus();
    for algorithm in [Algorithm::Eigenfaces, Algorithm::Fisherfaces] {
        let model = set.train(algorithm).unwrap();
        for seed in [5, 6, 7] {
            let stranger = random_face(seed);
            let s = score(model.as_ref(), &stranger);
            assert!(s > 0.9, "{algorithm}: similarity {s}");
            assert_eq!(decide(s, algorithm.default_unknown_threshold()), Decision::Unknown);
        }
    }
}

#[test]
fn test_eigenfaces_reconstruct_training_faces_almost_exactly() {
    let set = corpus();
    let model = set.train(Algorithm::Eigenfaces).unwrap();
    for face in set.faces() {
        assert!(score(model.as_ref(), face) < 0.01);
    }
}

#[test]
fn test_training_faces_recognize_themselves() {
    let set = corpus();
    for algorithm in [Algorithm::Eigenfaces, Algorithm::Fisherfaces] {
        let model = set.train(algorithm).unwrap();
        for (face, &label) in set.faces().iter().zip(set.labels()) {
            let s = score(model.as_ref(), face);
            assert!(s < algorithm.default_unknown_threshold(), "{algorithm}: similarity {s}");
            assert_eq!(recognition::identify(model.as_ref(), face).unwrap().label, label);
        }
    }
}

#[test]
fn test_fisherfaces_keeps_one_direction_for_two_people() {
    let set = corpus();
    let model = set.train(Algorithm::Fisherfaces).unwrap();
    let space = model.subspace().unwrap();
    assert_eq!(space.num_components(), 1);
    assert_eq!(model.num_samples(), 12);
    assert_eq!(model.face_size(), (FACE_WIDTH, FACE_WIDTH));

    let coords = recognition::project(model.as_ref(), &set.faces()[0]).unwrap();
    assert_eq!(coords.len(), 1);
}

fn stripes(horizontal: bool, shift: u8) -> GrayImage {
    GrayImage::from_fn(32, 32, |x, y| {
        let band = if horizontal { y / 4 } else { x / 4 };
        Luma([100 + shift + 50 * (band % 2) as u8])
    })
}

#[test]
fn test_lbph_identifies_but_cannot_reconstruct() {
    let faces = vec![stripes(true, 0), stripes(true, 20), stripes(false, 0), stripes(false, 20)];
    let model = recognition::train(&faces, &[0, 0, 1, 1], Algorithm::Lbph).unwrap();
    assert!(model.subspace().is_none());

    // LBP codes do not change under a uniform brightness shift
    let probe = stripes(true, 12);
    let prediction = recognition::identify(model.as_ref(), &probe).unwrap();
    assert_eq!(prediction.label, 0);
    assert!(prediction.distance.abs() < 1e-9);
    assert_eq!(recognition::identify(model.as_ref(), &stripes(false, 7)).unwrap().label, 1);

    assert!(matches!(
        recognition::reconstruct(model.as_ref(), &probe),
        Err(Error::ModelIncompatible(_))
    ));
    assert!(matches!(
        recognition::project(model.as_ref(), &probe),
        Err(Error::ModelIncompatible(_))
    ));
    assert!(matches!(
        ModelDiagnostics::from_model(model.as_ref(), 4),
        Err(Error::ModelIncompatible(_))
    ));
}

/// A noise-free face of `pattern`; both patterns are left-right symmetric
fn clean_face(pattern: fn(u32, u32) -> f64) -> GrayImage {
    GrayImage::from_fn(FACE_WIDTH, FACE_WIDTH, |x, y| Luma([(128.0 + pattern(x, y)).round() as u8]))
}

#[test]
fn test_fisherfaces_trains_on_one_collection_per_person() {
    let mut set = TrainingSet::new();
    set.add_sample(sample(pattern_a, 0.0, 31), 0);
    set.add_sample(sample(pattern_b, 0.0, 32), 1);
    assert_eq!(set.len(), 4);
    assert!(set.check_sufficient(Algorithm::Fisherfaces).is_ok());

    let model = set.train(Algorithm::Fisherfaces).unwrap();
    assert_eq!(model.num_samples(), 4);
    for (face, &label) in set.faces().iter().zip(set.labels()) {
        assert_eq!(recognition::identify(model.as_ref(), face).unwrap().label, label);
    }
}

#[test]
fn test_fisherfaces_rejects_faces_equal_to_their_mirror() {
    // Each person's only sample equals its mirror image, so there is no
    // within-person variation to whiten
    let mut set = TrainingSet::new();
    set.add_sample(clean_face(pattern_a), 0);
    set.add_sample(clean_face(pattern_b), 1);
    assert_eq!(set.faces()[0], set.faces()[1]);
    assert!(set.check_sufficient(Algorithm::Fisherfaces).is_ok());

    assert!(matches!(
        set.train(Algorithm::Fisherfaces),
        Err(Error::InsufficientTrainingData(_))
    ));
    // Eigenfaces has no such requirement
    assert!(set.train(Algorithm::Eigenfaces).is_ok());
}

#[test]
fn test_wrong_face_size_is_rejected() {
    let set = corpus();
    let model = set.train(Algorithm::Eigenfaces).unwrap();
    let small = GrayImage::new(FACE_WIDTH / 2, FACE_WIDTH / 2);
    assert!(matches!(
        recognition::identify(model.as_ref(), &small),
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        recognition::reconstruct(model.as_ref(), &small),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn test_fisherfaces_needs_two_people() {
    let mut set = TrainingSet::new();
    for face in person_samples(pattern_a, 3) {
        set.add_sample(face, 0);
    }
    assert!(set.train(Algorithm::Eigenfaces).is_ok());
    assert!(matches!(
        set.train(Algorithm::Fisherfaces),
        Err(Error::InsufficientTrainingData(_))
    ));
}

#[test]
fn test_diagnostics_describe_the_model() {
    let set = corpus();
    let model = set.train(Algorithm::Eigenfaces).unwrap();
    let diag = ModelDiagnostics::from_model(model.as_ref(), 3).unwrap();

    assert_eq!(diag.mean_face.dimensions(), (FACE_WIDTH, FACE_WIDTH));
    assert_eq!(diag.eigenfaces.len(), 3);
    assert_eq!(diag.labels, set.labels());
    assert_eq!(diag.projections.nrows(), set.len());
    // Eigenvalues come sorted, largest first
    let values: Vec<f64> = diag.eigenvalues.iter().copied().collect();
    assert!(values.windows(2).all(|w| w[0] >= w[1]));
}
