//! Subject-aware crop anchoring: find where the dominant subject (usually a
//! face) sits along the axis a target aspect ratio will crop.
//!
//! Detections from a pluggable [`FaceDetector`] are optionally gathered over
//! several rotated copies and scan angles, projected onto the dominant axis,
//! clustered by proximity, and the heaviest cluster is reduced to a single
//! normalized position.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use focalpoint::{Detection, FaceDetector, FocalPoint, ScanParams, Strategy};
//!
//! struct MyDetector;
//! impl FaceDetector for MyDetector {
//!     fn detect(&self, _gray: &[u8], _w: u32, _h: u32, _p: &ScanParams) -> Vec<Detection> {
//!         vec![]
//!     }
//! }
//!
//! let locator = FocalPoint::builder(Arc::new(MyDetector)).build().unwrap();
//! let bytes = std::fs::read("photo.jpg").unwrap();
//! let result = locator.locate_bytes(&bytes, 3.0 / 4.0, Strategy::Ensemble).unwrap();
//! if result.found {
//!     println!("subject at {:.2} along {:?}", result.position, result.axis);
//! }
//! ```
#![warn(missing_docs)]

/// Dominant-axis selection and position aggregation.
pub mod axis;
/// Proximity clustering and group ranking.
pub mod cluster;
mod crop;
/// Multi-pass detection over rotations and scan angles.
pub mod ensemble;
mod error;
/// Face detection traits and data types.
pub mod face_detector;
/// Point rotation between an image and its rotated copy.
pub mod geometry;
/// Bounded, index-preserving parallel map.
pub mod parallel;
/// Stable weight ranking.
pub mod ranking;
#[cfg(feature = "rustface")]
/// Built-in SeetaFace-based face detector backend.
pub mod rustface_backend;
mod transform;
/// Positions, vectors and weighted vectors.
pub mod vector;

use std::sync::Arc;
use std::time::Duration;

use image::{DynamicImage, RgbaImage};
use log::debug;

/// Dominant axis and the located position along it.
pub use axis::{Axis, AxisPosition};
/// Clustered detections.
pub use cluster::Group;
/// Crop planning from a located position.
pub use crop::{crop_to_ratio, CropRegion};
/// Error type returned by focalpoint operations.
pub use error::FocalPointError;
/// Face detection trait, detections and scan parameters.
pub use face_detector::{Detection, FaceDetector, ScanParams, DEFAULT_PRESETS};
#[cfg(feature = "rustface")]
/// Built-in detector that loads a SeetaFace model.
pub use rustface_backend::RustfaceDetector;

use cluster::DEFAULT_THRESHOLD;
use ensemble::{Ensemble, DEFAULT_ROTATIONS, DEFAULT_SCAN_ANGLES};
use parallel::{CancelToken, WorkerPool};

/// Widest working image; larger inputs are downsampled before detection.
const DEFAULT_MAX_WORKING_WIDTH: u32 = 650;

/// How much detection work to spend on an image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strategy {
    /// One upright pass per scan preset.
    #[default]
    Single,

    /// Every configured rotation crossed with every scan angle.
    Ensemble,
}

/// Receives intermediate results of a locate call, for debugging.
///
/// Closures taking `(&RgbaImage, &[Detection], &[Group])` implement this.
pub trait DetectionObserver {
    /// Called once per locate call with the working image, every raw
    /// detection, and the groups as clustered (before ranking).
    fn observe(&self, working: &RgbaImage, detections: &[Detection], groups: &[Group]);
}

impl<F> DetectionObserver for F
where
    F: Fn(&RgbaImage, &[Detection], &[Group]),
{
    fn observe(&self, working: &RgbaImage, detections: &[Detection], groups: &[Group]) {
        self(working, detections, groups)
    }
}

/// Builder for [`FocalPoint`].
///
/// Settings are validated in [`build`](Self::build).
pub struct FocalPointBuilder {
    detector: Arc<dyn FaceDetector>,
    max_working_width: u32,
    cluster_threshold: f64,
    rotations: Vec<f64>,
    scan_angles: Vec<f64>,
    presets: Vec<ScanParams>,
    min_quality: f32,
    workers: usize,
    timeout: Option<Duration>,
}

impl FocalPointBuilder {
    /// Set the widest image scanned (default: 650). Wider inputs are
    /// downsampled with nearest-neighbour resizing.
    pub fn max_working_width(mut self, width: u32) -> Self {
        self.max_working_width = width;
        self
    }

    /// Set the clustering tolerance in normalized units (default: 0.05).
    pub fn cluster_threshold(mut self, threshold: f64) -> Self {
        self.cluster_threshold = threshold;
        self
    }

    /// Set the whole-image rotations in degrees used by
    /// [`Strategy::Ensemble`] (default: 0, 90, 270).
    pub fn rotations(mut self, degrees: impl Into<Vec<f64>>) -> Self {
        self.rotations = degrees.into();
        self
    }

    /// Set the in-plane scan angles in radians used by
    /// [`Strategy::Ensemble`] (default: 0.00, 0.13, 0.87).
    pub fn scan_angles(mut self, radians: impl Into<Vec<f64>>) -> Self {
        self.scan_angles = radians.into();
        self
    }

    /// Set the scan presets, tried in order until one finds something
    /// (default: [`DEFAULT_PRESETS`]).
    pub fn presets(mut self, presets: impl Into<Vec<ScanParams>>) -> Self {
        self.presets = presets.into();
        self
    }

    /// Drop detections scoring below `quality` (default: 0.0).
    pub fn min_quality(mut self, quality: f32) -> Self {
        self.min_quality = quality;
        self
    }

    /// Set the number of worker threads (default: available cores, at most 9).
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Bound how long one batch of parallel detection passes may take
    /// (default: no limit).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validate the settings and start the worker pool.
    pub fn build(self) -> Result<FocalPoint, FocalPointError> {
        if self.max_working_width == 0 {
            return Err(FocalPointError::InvalidMaxWidth);
        }
        if !self.cluster_threshold.is_finite() || self.cluster_threshold < 0.0 {
            return Err(FocalPointError::InvalidThreshold(self.cluster_threshold));
        }
        if !self.min_quality.is_finite() || self.min_quality < 0.0 {
            return Err(FocalPointError::InvalidConfig(format!(
                "min quality must be a non-negative number, got {}",
                self.min_quality
            )));
        }
        if self.presets.is_empty() {
            return Err(FocalPointError::InvalidConfig(
                "at least one scan preset is required".to_string(),
            ));
        }
        if self.rotations.is_empty() || self.scan_angles.is_empty() {
            return Err(FocalPointError::InvalidConfig(
                "ensemble needs at least one rotation and one scan angle".to_string(),
            ));
        }
        if self
            .rotations
            .iter()
            .chain(&self.scan_angles)
            .any(|angle| !angle.is_finite())
        {
            return Err(FocalPointError::InvalidConfig(
                "angles must be finite".to_string(),
            ));
        }

        let pool = WorkerPool::new(self.workers, self.timeout)?;
        debug!("focalpoint started with {} workers", pool.threads());

        Ok(FocalPoint {
            detector: self.detector,
            pool: Arc::new(pool),
            max_working_width: self.max_working_width,
            cluster_threshold: self.cluster_threshold,
            rotations: self.rotations.into(),
            scan_angles: self.scan_angles.into(),
            presets: self.presets.into(),
            min_quality: self.min_quality,
        })
    }
}

/// Locates the dominant subject of images along their crop axis.
///
/// Holds a shared detector handle and a worker pool; one instance can serve
/// many images, from many threads.
pub struct FocalPoint {
    detector: Arc<dyn FaceDetector>,
    pool: Arc<WorkerPool>,
    max_working_width: u32,
    cluster_threshold: f64,
    rotations: Arc<[f64]>,
    scan_angles: Arc<[f64]>,
    presets: Arc<[ScanParams]>,
    min_quality: f32,
}

impl FocalPoint {
    /// Start configuring a locator around `detector`.
    pub fn builder(detector: Arc<dyn FaceDetector>) -> FocalPointBuilder {
        FocalPointBuilder {
            detector,
            max_working_width: DEFAULT_MAX_WORKING_WIDTH,
            cluster_threshold: DEFAULT_THRESHOLD,
            rotations: DEFAULT_ROTATIONS.to_vec(),
            scan_angles: DEFAULT_SCAN_ANGLES.to_vec(),
            presets: DEFAULT_PRESETS.to_vec(),
            min_quality: 0.0,
            workers: WorkerPool::default_threads(),
            timeout: None,
        }
    }

    /// Position of the dominant subject along the axis a crop to
    /// `target_ratio` (width / height) affects.
    ///
    /// `found` is `false` when nothing was detected; that is not an error.
    pub fn find_primary_axis_position(
        &self,
        image: &DynamicImage,
        target_ratio: f64,
        strategy: Strategy,
    ) -> Result<AxisPosition, FocalPointError> {
        self.locate(image, target_ratio, strategy, None)
    }

    /// Like [`find_primary_axis_position`](Self::find_primary_axis_position),
    /// reporting intermediate results to `observer`.
    pub fn find_primary_axis_position_with_observer(
        &self,
        image: &DynamicImage,
        target_ratio: f64,
        strategy: Strategy,
        observer: &dyn DetectionObserver,
    ) -> Result<AxisPosition, FocalPointError> {
        self.locate(image, target_ratio, strategy, Some(observer))
    }

    /// Decode `input` (JPEG, PNG or WebP) and locate its subject.
    pub fn locate_bytes(
        &self,
        input: &[u8],
        target_ratio: f64,
        strategy: Strategy,
    ) -> Result<AxisPosition, FocalPointError> {
        let decoded = transform::decode_image(input)?;
        self.find_primary_axis_position(&decoded, target_ratio, strategy)
    }

    /// Locate the subject and return the `target_ratio` crop of `image`
    /// anchored on it.
    pub fn plan_crop(
        &self,
        image: &DynamicImage,
        target_ratio: f64,
        strategy: Strategy,
    ) -> Result<CropRegion, FocalPointError> {
        let anchor = self.find_primary_axis_position(image, target_ratio, strategy)?;
        Ok(crop_to_ratio(
            image.width(),
            image.height(),
            target_ratio,
            Some(&anchor),
        ))
    }

    fn locate(
        &self,
        image: &DynamicImage,
        target_ratio: f64,
        strategy: Strategy,
        observer: Option<&dyn DetectionObserver>,
    ) -> Result<AxisPosition, FocalPointError> {
        if !target_ratio.is_finite() || target_ratio <= 0.0 {
            return Err(FocalPointError::InvalidRatio(target_ratio));
        }
        if image.width() == 0 || image.height() == 0 {
            return Err(FocalPointError::ZeroDimensions);
        }

        let working = transform::working_image(image, self.max_working_width);
        let ensemble = Ensemble::new(
            Arc::clone(&self.detector),
            Arc::clone(&self.pool),
            Arc::clone(&self.presets),
            CancelToken::new(),
        )
        .with_angles(Arc::clone(&self.rotations), Arc::clone(&self.scan_angles))
        .with_min_quality(self.min_quality);

        let detections = match strategy {
            Strategy::Single => ensemble.detect(&working, &[])?,
            Strategy::Ensemble => ensemble.detect_multi_angle(&working)?,
        };
        debug!(
            "{strategy:?} strategy found {} detections on {}x{} working image",
            detections.len(),
            working.width(),
            working.height()
        );

        axis::primary_axis_position(
            &detections,
            working.dimensions(),
            target_ratio,
            self.cluster_threshold,
            |groups| {
                if let Some(observer) = observer {
                    observer.observe(&working, &detections, groups);
                }
            },
        )
    }
}
