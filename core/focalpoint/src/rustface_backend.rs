use std::path::Path;

use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};

use crate::error::FocalPointError;
use crate::face_detector::{Detection, FaceDetector, ScanParams};
use crate::geometry::rotate_point_into;

/// Minimum classifier score for a window to count as a face.
const SCORE_THRESHOLD: f64 = 2.0;

/// Face detector backed by the `rustface` crate (SeetaFace engine).
///
/// The model is loaded once and shared by every scan; each scan builds its
/// own short-lived rustface detector from a clone of it.
pub struct RustfaceDetector {
    model: rustface::Model,
}

impl RustfaceDetector {
    /// Load a SeetaFace model from its serialized bytes.
    pub fn from_model_bytes(model_data: &[u8]) -> Result<Self, FocalPointError> {
        let model = rustface::read_model(std::io::Cursor::new(model_data))
            .map_err(|e| FocalPointError::InvalidConfig(format!("bad SeetaFace model: {e}")))?;
        Ok(Self { model })
    }

    /// Load a SeetaFace model file, e.g. `seeta_fd_frontal_v1.0.bin`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FocalPointError> {
        let path = path.as_ref();
        let model_data = std::fs::read(path).map_err(|e| {
            FocalPointError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_model_bytes(&model_data)
    }

    fn scan(&self, gray: &[u8], width: u32, height: u32, params: &ScanParams) -> Vec<Detection> {
        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(params.min_size.max(20));
        detector.set_score_thresh(SCORE_THRESHOLD);
        detector.set_pyramid_scale_factor((1.0 / params.scale_factor.max(1.01)) as f32);
        let step = (params.min_size as f64 * params.shift_factor).round().max(1.0) as u32;
        detector.set_slide_window_step(step, step);

        detector
            .detect(&rustface::ImageData::new(gray, width, height))
            .iter()
            .filter(|face| face.bbox().width().max(face.bbox().height()) <= params.max_size)
            .map(|face| {
                let bbox = face.bbox();
                Detection {
                    row: bbox.y() + bbox.height() as i32 / 2,
                    col: bbox.x() + bbox.width() as i32 / 2,
                    scale: bbox.width().max(bbox.height()) as i32,
                    quality: face.score() as f32,
                }
            })
            .collect()
    }
}

impl FaceDetector for RustfaceDetector {
    /// SeetaFace only scans upright windows, so a non-zero angle is honoured
    /// by scanning a copy rotated about its centre and mapping hits back.
    fn detect(&self, gray: &[u8], width: u32, height: u32, params: &ScanParams) -> Vec<Detection> {
        if params.angle == 0.0 {
            return self.scan(gray, width, height, params);
        }
        let Some(image) = GrayImage::from_raw(width, height, gray.to_vec()) else {
            return Vec::new();
        };
        let rotated = rotate_about_center(
            &image,
            params.angle as f32,
            Interpolation::Bilinear,
            Luma([0]),
        );
        let back = -params.angle.to_degrees();
        self.scan(rotated.as_raw(), width, height, params)
            .into_iter()
            .map(|d| {
                let (col, row) =
                    rotate_point_into(d.col, d.row, (width, height), (width, height), back);
                Detection { row, col, ..d }
            })
            .collect()
    }
}
