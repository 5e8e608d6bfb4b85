//! Tests for command-line argument parsing
//!
//! Note: These tests verify the argument parser configuration by creating
//! a test parser with the same structure as the main application.

use clap::{Arg, ArgAction, Command as ClapCommand};
use webcam_face_rec::config::Config;
use webcam_face_rec::recognition::Algorithm;

/// Create a command with the same argument structure as the main binary
fn create_test_command() -> ClapCommand {
    ClapCommand::new("webcam-face-rec")
        .version("0.1.0")
        .about("Webcam face recognition")
        .arg(
            Arg::new("cam")
                .long("cam")
                .value_name("INDEX")
                .value_parser(clap::value_parser!(i32))
                .help("Camera index to use"),
        )
        .arg(
            Arg::new("algorithm")
                .short('a')
                .long("algorithm")
                .value_name("NAME")
                .help("Recognizer (eigenfaces, fisherfaces, lbph)"),
        )
        .arg(
            Arg::new("threshold")
                .short('t')
                .long("threshold")
                .value_name("VALUE")
                .value_parser(clap::value_parser!(f64))
                .help("Unknown person threshold"),
        )
        .arg(
            Arg::new("config")
                .short('C')
                .long("config")
                .value_name("PATH")
                .help("Configuration file path"),
        )
        .arg(
            Arg::new("print-config")
                .long("print-config")
                .action(ArgAction::SetTrue)
                .help("Print an example configuration file and exit"),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .action(ArgAction::SetTrue)
                .help("Enable debug output"),
        )
}

#[test]
fn test_help_argument() {
    let cmd = create_test_command();
    let result = cmd.try_get_matches_from(vec!["webcam-face-rec", "--help"]);

    // Help should cause an error (but a specific help error)
    assert!(result.is_err());
    let err = result.unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
}

#[test]
fn test_no_arguments() {
    let cmd = create_test_command();
    let matches = cmd.try_get_matches_from(vec!["webcam-face-rec"]).unwrap();

    assert_eq!(matches.get_one::<i32>("cam"), None);
    assert_eq!(matches.get_one::<String>("algorithm"), None);
    assert!(!matches.get_flag("debug"));
    assert!(!matches.get_flag("print-config"));
}

#[test]
fn test_cam_argument() {
    let cmd = create_test_command();
    let matches = cmd.try_get_matches_from(vec!["webcam-face-rec", "--cam", "1"]).unwrap();
    assert_eq!(matches.get_one::<i32>("cam"), Some(&1));

    let cmd = create_test_command();
    assert!(cmd.try_get_matches_from(vec!["webcam-face-rec", "--cam", "front"]).is_err());
}

#[test]
fn test_algorithm_arguments() {
    for name in ["eigenfaces", "fisherfaces", "lbph", "Fisherfaces"] {
        let cmd = create_test_command();
        let matches = cmd
            .try_get_matches_from(vec!["webcam-face-rec", "--algorithm", name])
            .unwrap();
        let value = matches.get_one::<String>("algorithm").unwrap();
        assert!(value.parse::<Algorithm>().is_ok(), "Should accept algorithm: {name}");
    }
}

#[test]
fn test_threshold_argument() {
    let cmd = create_test_command();
    let matches = cmd
        .try_get_matches_from(vec!["webcam-face-rec", "-t", "0.45"])
        .unwrap();
    assert_eq!(matches.get_one::<f64>("threshold"), Some(&0.45));

    let cmd = create_test_command();
    assert!(cmd.try_get_matches_from(vec!["webcam-face-rec", "-t", "low"]).is_err());
}

#[test]
fn test_overrides_applied_to_config() {
    let cmd = create_test_command();
    let matches = cmd
        .try_get_matches_from(vec![
            "webcam-face-rec",
            "--cam",
            "2",
            "--algorithm",
            "eigenfaces",
            "--threshold",
            "0.4",
        ])
        .unwrap();

    let mut config = Config::default();
    if let Some(&cam) = matches.get_one::<i32>("cam") {
        config.camera.index = cam;
    }
    if let Some(algorithm) = matches.get_one::<String>("algorithm") {
        config.recognition.algorithm = algorithm.clone();
    }
    if let Some(&threshold) = matches.get_one::<f64>("threshold") {
        config.recognition.unknown_threshold = Some(threshold);
    }

    let settings = config.session_settings().unwrap();
    assert_eq!(config.camera.index, 2);
    assert_eq!(settings.algorithm, Algorithm::Eigenfaces);
    assert!((settings.unknown_threshold - 0.4).abs() < f64::EPSILON);
}

#[test]
fn test_flags() {
    let cmd = create_test_command();
    let matches = cmd
        .try_get_matches_from(vec!["webcam-face-rec", "-d", "--print-config", "-C", "face.yaml"])
        .unwrap();
    assert!(matches.get_flag("debug"));
    assert!(matches.get_flag("print-config"));
    assert_eq!(matches.get_one::<String>("config").map(String::as_str), Some("face.yaml"));
}
