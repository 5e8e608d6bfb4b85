//! Webcam face recognition: collect faces per person, train and recognize in real time.

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use webcam_face_rec::app::FaceRecApp;
use webcam_face_rec::config::{Config, EXAMPLE_CONFIG};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Camera index to use
    #[arg(long)]
    cam: Option<i32>,

    /// Recognizer (eigenfaces, fisherfaces, lbph)
    #[arg(short, long)]
    algorithm: Option<String>,

    /// Reconstruction error at or above which a face is reported as unknown
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_config: bool,

    /// Enable debug output and model introspection
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    info!("Webcam Face Recognition");

    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {config_path}");
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to load config file: {e}. Using defaults.");
                Config::default()
            }
        }
    } else {
        Config::default()
    };

    if let Some(cam) = args.cam {
        config.camera.index = cam;
    }
    if let Some(algorithm) = args.algorithm {
        config.recognition.algorithm = algorithm;
    }
    if let Some(threshold) = args.threshold {
        config.recognition.unknown_threshold = Some(threshold);
    }

    let mut app = FaceRecApp::new(&config, args.debug).context("Failed to start the application")?;
    app.run()?;

    Ok(())
}
