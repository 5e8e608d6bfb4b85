use std::path::Path;

use image::GrayImage;
use log::info;
use opencv::core::{Mat, Scalar, Size, Vector, CV_8UC1};
use opencv::objdetect::{self, CascadeClassifier};
use opencv::prelude::*;

use super::{DetectionParams, ObjectDetector};
use crate::geometry::Rect;
use crate::utils::safe_cast::u32_to_i32;
use crate::{Error, Result};

/// Haar / LBP cascade loaded from an `OpenCV` XML file
pub struct OpenCvCascade {
    classifier: CascadeClassifier,
    name: String,
}

impl OpenCvCascade {
    /// Load a cascade from disk
    ///
    /// # Errors
    ///
    /// Returns `DetectorNotLoaded` if the file is missing or not a cascade
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| Error::InvalidInput(format!("Non UTF-8 cascade path: {}", path.display())))?;
        let classifier = CascadeClassifier::new(path_str)?;
        if classifier.empty()? {
            return Err(Error::DetectorNotLoaded(format!(
                "Could not load cascade classifier [{}]",
                path.display()
            )));
        }
        info!("Loaded cascade classifier {}", path.display());
        Ok(Self {
            classifier,
            name: path
                .file_stem()
                .map_or_else(|| "cascade".to_string(), |s| s.to_string_lossy().into_owned()),
        })
    }
}

fn gray_to_mat(image: &GrayImage) -> Result<Mat> {
    let (w, h) = image.dimensions();
    let mut mat = Mat::new_rows_cols_with_default(u32_to_i32(h)?, u32_to_i32(w)?, CV_8UC1, Scalar::all(0.0))?;
    mat.data_bytes_mut()?.copy_from_slice(image.as_raw());
    Ok(mat)
}

fn search_flags(params: &DetectionParams) -> i32 {
    let mut flags = 0;
    if params.flags.find_biggest_object {
        flags |= objdetect::CASCADE_FIND_BIGGEST_OBJECT;
    }
    if params.flags.scale_image {
        flags |= objdetect::CASCADE_SCALE_IMAGE;
    }
    if params.flags.do_rough_search {
        flags |= objdetect::CASCADE_DO_ROUGH_SEARCH;
    }
    flags
}

impl ObjectDetector for OpenCvCascade {
    fn detect_multi_scale(&mut self, image: &GrayImage, params: &DetectionParams) -> Result<Vec<Rect>> {
        let mat = gray_to_mat(image)?;
        let mut objects = Vector::<opencv::core::Rect>::new();
        let min_size = Size::new(
            u32_to_i32(params.min_feature_size.0)?,
            u32_to_i32(params.min_feature_size.1)?,
        );
        self.classifier.detect_multi_scale(
            &mat,
            &mut objects,
            f64::from(params.search_scale_factor),
            u32_to_i32(params.min_neighbors)?,
            search_flags(params),
            min_size,
            Size::new(0, 0),
        )?;
        Ok(objects
            .iter()
            .map(|r| Rect::new(r.x, r.y, r.width, r.height))
            .collect())
    }

    fn is_loaded(&self) -> bool {
        self.classifier.empty().map(|empty| !empty).unwrap_or(false)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
