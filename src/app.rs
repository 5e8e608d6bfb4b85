//! Interactive webcam application: capture, session, overlay and keyboard.

use std::path::PathBuf;
use std::time::Instant;

use image::{DynamicImage, GrayImage, RgbImage};
use log::{info, warn};
use opencv::{
    core::{Mat, Point as CvPoint, Rect as CvRect, Scalar, CV_8UC3},
    highgui::{self, WINDOW_AUTOSIZE},
    imgproc::{self, FONT_HERSHEY_PLAIN, LINE_AA},
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
};

use crate::{
    config::Config,
    detection::{opencv_cascade::OpenCvCascade, ObjectDetector},
    geometry::Rect,
    preprocess::FaceNormalizer,
    recognition::decision::Identity,
    session::{Event, FrameReport, Mode, Session, TrainingOutcome},
    utils::safe_cast::{i32_to_u32, u32_to_i32, usize_to_i32},
    Error, Result,
};

const WINDOW_NAME: &str = "WebcamFaceRec";

/// Gap between overlay elements and the frame border
const BORDER: i32 = 8;

const DIAGNOSTICS_DIR: &str = "debug_output";

/// What a key press asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Session(Event),
    Quit,
    None,
}

/// Map a `highgui::wait_key` code to an action
#[must_use]
pub fn key_action(key: i32) -> KeyAction {
    if key < 0 {
        return KeyAction::None;
    }
    let Ok(byte) = u8::try_from(key & 0xFF) else {
        return KeyAction::None;
    };
    match char::from(byte) {
        'q' | '\u{1b}' => KeyAction::Quit,
        'a' => KeyAction::Session(Event::AddPerson),
        'd' | 'r' => KeyAction::Session(Event::Reset),
        't' => KeyAction::Session(Event::Train),
        'g' => KeyAction::Session(Event::ToggleDebug),
        '0'..='9' => KeyAction::Session(Event::SelectPerson(usize::from(byte - b'0'))),
        _ => KeyAction::None,
    }
}

/// Webcam face recognition application
pub struct FaceRecApp {
    session: Session,
    capture: VideoCapture,
    diagnostics_dir: PathBuf,
    started: Instant,
}

impl FaceRecApp {
    /// Load cascades, open the camera and create the window
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, a required cascade
    /// cannot be loaded or the camera cannot be opened
    pub fn new(config: &Config, debug: bool) -> Result<Self> {
        info!("Initializing face recognition application");
        config.validate()?;
        config.check_model_files()?;

        let face: Box<dyn ObjectDetector> = Box::new(OpenCvCascade::from_file(&config.models.face_cascade)?);
        let eyes: Box<dyn ObjectDetector> = Box::new(OpenCvCascade::from_file(&config.models.eye_cascade)?);
        let fallback = match &config.models.eye_cascade_fallback {
            Some(path) => match OpenCvCascade::from_file(path) {
                Ok(cascade) => Some(Box::new(cascade) as Box<dyn ObjectDetector>),
                Err(e) => {
                    warn!("Fallback eye cascade unavailable: {e}");
                    None
                }
            },
            None => None,
        };
        let normalizer = FaceNormalizer::new(face, eyes, fallback, config.normalizer_settings())?;

        let settings = config.session_settings()?;
        info!(
            "Recognizer: {}, unknown person threshold {:.2}",
            settings.algorithm, settings.unknown_threshold
        );
        let mut session = Session::new(normalizer, settings);
        if debug {
            session.handle_event(Event::ToggleDebug);
        }

        info!("Opening camera {}", config.camera.index);
        let mut capture = VideoCapture::new(config.camera.index, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(Error::InvalidInput(format!(
                "Could not access camera {}",
                config.camera.index
            )));
        }
        capture.set(CAP_PROP_FRAME_WIDTH, f64::from(config.camera.width))?;
        capture.set(CAP_PROP_FRAME_HEIGHT, f64::from(config.camera.height))?;

        highgui::named_window(WINDOW_NAME, WINDOW_AUTOSIZE)?;

        Ok(Self {
            session,
            capture,
            diagnostics_dir: PathBuf::from(DIAGNOSTICS_DIR),
            started: Instant::now(),
        })
    }

    /// Run until the user quits
    ///
    /// # Errors
    ///
    /// Returns an error if a camera frame cannot be read or displayed
    pub fn run(&mut self) -> Result<()> {
        info!("Keys: a = add person, 0-9 = select person, t = train, r = delete all, g = debug, q = quit");

        loop {
            let mut frame = Mat::default();
            if !self.capture.read(&mut frame)? || frame.empty() {
                return Err(Error::InvalidInput("Could not grab the next camera frame".to_string()));
            }

            let image = DynamicImage::ImageRgb8(mat_to_rgb(&frame)?);
            let report = self.session.process_frame(&image, self.started.elapsed())?;

            if self.session.state().debug && matches!(report.training, Some(TrainingOutcome::Trained { .. })) {
                self.save_diagnostics();
            }

            let mut canvas = image.into_rgb8();
            self.paste_faces(&mut canvas, &report);
            let mut display = rgb_to_bgr_mat(&canvas)?;
            self.draw_overlay(&mut display, &report)?;
            highgui::imshow(WINDOW_NAME, &display)?;

            match key_action(highgui::wait_key(20)?) {
                KeyAction::Quit => break,
                KeyAction::Session(event) => self.handle_event(event),
                KeyAction::None => {}
            }
        }

        info!("Application shutting down");
        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        self.session.handle_event(event);
        if event == Event::ToggleDebug {
            info!("Debug output {}", if self.session.state().debug { "on" } else { "off" });
            if self.session.state().debug && self.session.model().is_some() {
                self.save_diagnostics();
            }
        }
    }

    fn save_diagnostics(&self) {
        let diagnostics = self.session.diagnostics().and_then(|diag| {
            diag.log_summary();
            diag.save_to_dir(&self.diagnostics_dir)
        });
        if let Err(e) = diagnostics {
            warn!("Could not save model diagnostics: {e}");
        }
    }

    /// Copy the normalized face, its reconstruction and each person's latest sample into the frame
    fn paste_faces(&self, canvas: &mut RgbImage, report: &FrameReport) {
        let face_w = i64::from(self.session.settings().face_width);
        let cx = (i64::from(canvas.width()) - face_w) / 2;
        let border = i64::from(BORDER);

        if let Some(face) = &report.detection.face {
            paste_gray(canvas, face, cx, border);
        }
        if let Some(rebuilt) = report.recognition.as_ref().and_then(|r| r.reconstruction.as_ref()) {
            paste_gray(canvas, rebuilt, cx + face_w + border, border);
        }

        let persons = &self.session.state().persons;
        let faces = self.session.training_set().faces();
        let left = i64::from(canvas.width()) - border - face_w;
        for person in 0..persons.len() {
            if let Some(face) = persons.latest_sample(person).and_then(|i| faces.get(i)) {
                #[allow(clippy::cast_possible_wrap)] // Bounded by the number of people
                let top = border + person as i64 * face_w;
                paste_gray(canvas, face, left, top);
            }
        }
    }

    fn draw_overlay(&self, display: &mut Mat, report: &FrameReport) -> Result<()> {
        let face_w = u32_to_i32(self.session.settings().face_width)?;

        if let Some(face_rect) = report.detection.face_rect {
            let colour = if report.collected.is_some() {
                Scalar::new(255.0, 255.0, 255.0, 0.0)
            } else {
                Scalar::new(0.0, 255.0, 255.0, 0.0)
            };
            imgproc::rectangle(display, to_cv_rect(&face_rect), colour, 2, LINE_AA, 0)?;

            let eye_colour = Scalar::new(255.0, 200.0, 0.0, 0.0);
            let eyes = [
                (report.detection.left_eye, report.detection.searched_left_eye),
                (report.detection.right_eye, report.detection.searched_right_eye),
            ];
            for (eye, window) in eyes {
                match (eye, window) {
                    (Some(eye), _) => {
                        let centre = CvPoint::new(face_rect.x + eye.x, face_rect.y + eye.y);
                        imgproc::circle(display, centre, 6, eye_colour, 1, LINE_AA, 0)?;
                    }
                    (None, Some(window)) => {
                        let window = window.offset(face_rect.origin());
                        imgproc::rectangle(display, to_cv_rect(&window), Scalar::new(200.0, 0.0, 200.0, 0.0), 1, LINE_AA, 0)?;
                    }
                    (None, None) => {}
                }
            }
        }

        let state = self.session.state();
        if let Some(selected) = state.selected_person.filter(|_| state.mode == Mode::CollectingFaces) {
            let left = display.cols() - BORDER - face_w;
            let top = BORDER + usize_to_i32(selected)? * face_w;
            imgproc::rectangle(
                display,
                CvRect::new(left - 1, top - 1, face_w + 2, face_w + 2),
                Scalar::new(0.0, 0.0, 255.0, 0.0),
                2,
                LINE_AA,
                0,
            )?;
        }

        if let Some(recognition) = &report.recognition {
            let text = match recognition.identity {
                Identity::Known(label) => format!("Person {label}"),
                Identity::Unknown => "Unknown".to_string(),
            };
            draw_string(display, &text, CvPoint::new(BORDER, BORDER + 2 * face_w), Scalar::new(0.0, 255.0, 255.0, 0.0))?;

            // Confidence bar left of the normalized face
            let cx = (display.cols() - face_w) / 2;
            #[allow(clippy::cast_possible_truncation)] // 0..=face_w
            let filled = ((1.0 - recognition.similarity.clamp(0.0, 1.0)) * f64::from(face_w)).round() as i32;
            let outline = CvRect::new(cx - 15, BORDER, 10, face_w);
            imgproc::rectangle(display, outline, Scalar::new(200.0, 200.0, 200.0, 0.0), 1, LINE_AA, 0)?;
            if filled > 0 {
                let bar = CvRect::new(cx - 15, BORDER + face_w - filled, 10, filled);
                imgproc::rectangle(display, bar, Scalar::new(0.0, 255.0, 255.0, 0.0), -1, LINE_AA, 0)?;
            }
        }

        let help = match state.mode {
            Mode::Startup | Mode::Detecting => "Press 'a' to add a person".to_string(),
            Mode::CollectingFaces => format!(
                "Collecting faces of person {}, press 't' to train",
                state.selected_person.map_or_else(|| "?".to_string(), |p| p.to_string())
            ),
            Mode::Training => "Training...".to_string(),
            Mode::Recognizing => "Press 'a' or 0-9 to collect more faces".to_string(),
            Mode::ResettingAll => "Deleting all faces".to_string(),
        };
        let bottom = display.rows() - BORDER;
        draw_string(display, &help, CvPoint::new(BORDER, bottom), Scalar::new(255.0, 255.0, 255.0, 0.0))?;
        let mode = if state.debug {
            format!("{} (debug)", state.mode)
        } else {
            state.mode.to_string()
        };
        draw_string(display, &mode, CvPoint::new(BORDER, bottom - 20), Scalar::new(0.0, 255.0, 0.0, 0.0))?;

        Ok(())
    }
}

fn to_cv_rect(rect: &Rect) -> CvRect {
    CvRect::new(rect.x, rect.y, rect.width, rect.height)
}

fn paste_gray(canvas: &mut RgbImage, face: &GrayImage, x: i64, y: i64) {
    let rgb = DynamicImage::ImageLuma8(face.clone()).into_rgb8();
    image::imageops::replace(canvas, &rgb, x, y);
}

/// Text with a one pixel black shadow
fn draw_string(display: &mut Mat, text: &str, origin: CvPoint, colour: Scalar) -> Result<()> {
    let shadow = CvPoint::new(origin.x + 1, origin.y + 1);
    imgproc::put_text(display, text, shadow, FONT_HERSHEY_PLAIN, 1.0, Scalar::all(0.0), 1, LINE_AA, false)?;
    imgproc::put_text(display, text, origin, FONT_HERSHEY_PLAIN, 1.0, colour, 1, LINE_AA, false)?;
    Ok(())
}

fn mat_to_rgb(frame: &Mat) -> Result<RgbImage> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(frame, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;
    let width = i32_to_u32(rgb.cols())?;
    let height = i32_to_u32(rgb.rows())?;
    RgbImage::from_raw(width, height, rgb.data_bytes()?.to_vec())
        .ok_or_else(|| Error::InvalidInput("Camera frame is not 8-bit colour".to_string()))
}

fn rgb_to_bgr_mat(image: &RgbImage) -> Result<Mat> {
    let (w, h) = image.dimensions();
    let mut mat = Mat::new_rows_cols_with_default(u32_to_i32(h)?, u32_to_i32(w)?, CV_8UC3, Scalar::all(0.0))?;
    for (dst, src) in mat.data_bytes_mut()?.chunks_exact_mut(3).zip(image.pixels()) {
        let [r, g, b] = src.0;
        dst.copy_from_slice(&[b, g, r]);
    }
    Ok(mat)
}
