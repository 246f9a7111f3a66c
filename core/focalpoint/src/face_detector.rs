/// A face (or other subject) candidate reported by a detector.
///
/// `row` and `col` locate the centre of the detected region in pixels of the
/// buffer that was scanned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// Vertical pixel offset of the region centre.
    pub row: i32,
    /// Horizontal pixel offset of the region centre.
    pub col: i32,
    /// Side length of the detected region (pixels).
    pub scale: i32,
    /// Detector confidence score.
    pub quality: f32,
}

impl Detection {
    /// Importance of this detection when aggregating: `scale × quality`.
    pub fn weight(&self) -> f64 {
        self.scale as f64 * self.quality as f64
    }
}

/// Parameters for a single detector scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanParams {
    /// Smallest region size to look for (pixels).
    pub min_size: u32,
    /// Largest region size to look for (pixels).
    pub max_size: u32,
    /// Window shift as a fraction of the current window size.
    pub shift_factor: f64,
    /// Multiplicative step between successive window sizes (> 1).
    pub scale_factor: f64,
    /// In-plane scan angle in radians.
    pub angle: f64,
}

impl ScanParams {
    /// Copy of these parameters scanning at `angle` radians.
    pub fn with_angle(self, angle: f64) -> Self {
        Self { angle, ..self }
    }
}

/// Scan presets tried in order until one yields detections.
///
/// The first preset is cheap and favours large, confident faces; later ones
/// scan smaller windows with finer steps.
pub const DEFAULT_PRESETS: [ScanParams; 3] = [
    ScanParams {
        min_size: 60,
        max_size: 1000,
        shift_factor: 0.1,
        scale_factor: 1.1,
        angle: 0.0,
    },
    ScanParams {
        min_size: 30,
        max_size: 1000,
        shift_factor: 0.1,
        scale_factor: 1.1,
        angle: 0.0,
    },
    ScanParams {
        min_size: 20,
        max_size: 1000,
        shift_factor: 0.05,
        scale_factor: 1.05,
        angle: 0.0,
    },
];

/// Pluggable face detection backend.
///
/// Implementations must be stateless from the caller's point of view: the same
/// handle is shared by every parallel detection pass. A backend that fails
/// internally should return no detections rather than panic.
pub trait FaceDetector: Send + Sync {
    /// Detect faces in a row-major grayscale buffer of `width` × `height` bytes.
    fn detect(
        &self,
        gray: &[u8],
        width: u32,
        height: u32,
        params: &ScanParams,
    ) -> Vec<Detection>;
}
