//! Detection passes over rotated copies and in-plane scan angles.

use std::sync::Arc;

use image::RgbaImage;
use log::debug;

use crate::error::FocalPointError;
use crate::face_detector::{Detection, FaceDetector, ScanParams};
use crate::geometry::{inverse_degrees, normalize_degrees, rotate_point_into};
use crate::parallel::{CancelToken, WorkerPool};
use crate::transform::{rotate_image, to_gray};

/// Whole-image rotations (degrees) used by the multi-angle ensemble.
pub const DEFAULT_ROTATIONS: [f64; 3] = [0.0, 90.0, 270.0];

/// In-plane scan angles (radians) used by the multi-angle ensemble.
pub const DEFAULT_SCAN_ANGLES: [f64; 3] = [0.0, 0.13, 0.87];

/// Runs a shared detector over one image in several configurations.
///
/// Cloning is cheap; every field is shared.
#[derive(Clone)]
pub struct Ensemble {
    detector: Arc<dyn FaceDetector>,
    pool: Arc<WorkerPool>,
    presets: Arc<[ScanParams]>,
    rotations: Arc<[f64]>,
    scan_angles: Arc<[f64]>,
    min_quality: f32,
    cancel: CancelToken,
}

impl Ensemble {
    /// Share `detector` and `pool` across passes, falling back through
    /// `presets` in order. Passes stop early once `cancel` is tripped.
    pub fn new(
        detector: Arc<dyn FaceDetector>,
        pool: Arc<WorkerPool>,
        presets: Arc<[ScanParams]>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            detector,
            pool,
            presets,
            rotations: Arc::from(DEFAULT_ROTATIONS),
            scan_angles: Arc::from(DEFAULT_SCAN_ANGLES),
            min_quality: 0.0,
            cancel,
        }
    }

    /// Use these whole-image rotations (degrees) and scan angles (radians) in
    /// [`detect_multi_angle`](Self::detect_multi_angle).
    pub fn with_angles(mut self, rotations: Arc<[f64]>, scan_angles: Arc<[f64]>) -> Self {
        self.rotations = rotations;
        self.scan_angles = scan_angles;
        self
    }

    /// Drop detections whose quality is below `min_quality`.
    ///
    /// Detections with a non-positive scale or a non-finite score are always
    /// dropped.
    pub fn with_min_quality(mut self, min_quality: f32) -> Self {
        self.min_quality = min_quality;
        self
    }

    /// Run the detector once per scan angle (concurrently) and return the
    /// merged detections of the first preset that finds anything.
    ///
    /// An empty `angles` slice scans upright only.
    pub fn detect(
        &self,
        image: &RgbaImage,
        angles: &[f64],
    ) -> Result<Vec<Detection>, FocalPointError> {
        let angles = if angles.is_empty() {
            vec![0.0]
        } else {
            angles.to_vec()
        };
        let gray = Arc::new(to_gray(image));
        let frame = gray.dimensions();

        for (preset_index, preset) in self.presets.iter().copied().enumerate() {
            let detector = Arc::clone(&self.detector);
            let pass_gray = Arc::clone(&gray);
            let per_angle = self.pool.map(
                angles.clone(),
                move |angle| {
                    detector.detect(
                        pass_gray.as_raw(),
                        pass_gray.width(),
                        pass_gray.height(),
                        &preset.with_angle(angle),
                    )
                },
                &self.cancel,
            )?;

            let detections: Vec<Detection> = per_angle
                .into_iter()
                .flatten()
                .filter_map(|d| self.sanitize(d, frame))
                .collect();
            if !detections.is_empty() {
                debug!(
                    "preset {preset_index} found {} detections over {} angle(s)",
                    detections.len(),
                    angles.len()
                );
                return Ok(detections);
            }
            debug!("preset {preset_index} found nothing, trying next");
        }
        Ok(Vec::new())
    }

    /// Keep `detection` only if it can carry a weight, pulling its centre
    /// into the `width` × `height` frame that was scanned.
    fn sanitize(&self, detection: Detection, (width, height): (u32, u32)) -> Option<Detection> {
        let usable = detection.scale > 0
            && detection.quality.is_finite()
            && detection.quality >= self.min_quality
            && detection.weight().is_finite();
        if !usable {
            debug!("dropping unusable detection {detection:?}");
            return None;
        }
        let max_col = width.saturating_sub(1).min(i32::MAX as u32) as i32;
        let max_row = height.saturating_sub(1).min(i32::MAX as u32) as i32;
        Some(Detection {
            col: detection.col.clamp(0, max_col),
            row: detection.row.clamp(0, max_row),
            ..detection
        })
    }

    /// Rotate the image, [`detect`](Self::detect) on the rotated copy, and map
    /// detections back into the original image's coordinates.
    pub fn detect_with_rotation(
        &self,
        image: &RgbaImage,
        rotation_degrees: f64,
        angles: &[f64],
    ) -> Result<Vec<Detection>, FocalPointError> {
        let rotation = normalize_degrees(rotation_degrees);
        if rotation == 0.0 {
            return self.detect(image, angles);
        }

        let rotated = rotate_image(image, rotation);
        let detections = self.detect(&rotated, angles)?;

        let original = image.dimensions();
        let rotated_dims = rotated.dimensions();
        let inverse = inverse_degrees(rotation);
        Ok(detections
            .into_iter()
            .map(|d| {
                let (col, row) = rotate_point_into(d.col, d.row, rotated_dims, original, inverse);
                Detection { row, col, ..d }
            })
            .collect())
    }

    /// Every configured rotation crossed with every scan angle, run
    /// concurrently and flattened.
    pub fn detect_multi_angle(
        &self,
        image: &RgbaImage,
    ) -> Result<Vec<Detection>, FocalPointError> {
        let passes: Vec<(f64, f64)> = self
            .rotations
            .iter()
            .flat_map(|&rotation| self.scan_angles.iter().map(move |&angle| (rotation, angle)))
            .collect();
        let pass_count = passes.len();

        let image = Arc::new(image.clone());
        let ensemble = self.clone();
        let per_pass = self.pool.map(
            passes,
            move |(rotation, angle)| ensemble.detect_with_rotation(&image, rotation, &[angle]),
            &self.cancel,
        )?;

        let detections = per_pass
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        debug!(
            "multi-angle ensemble found {} detections over {pass_count} passes",
            detections.len()
        );
        Ok(detections)
    }
}
