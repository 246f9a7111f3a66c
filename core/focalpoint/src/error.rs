use std::time::Duration;

use thiserror::Error;

/// Errors returned by focalpoint operations.
#[derive(Debug, Error)]
pub enum FocalPointError {
    /// Input bytes are not a decodable image.
    #[error("failed to decode image: {0}")]
    DecodeError(String),

    /// Image has zero width or height.
    #[error("image dimensions are zero")]
    ZeroDimensions,

    /// Two vectors of different dimension were combined.
    #[error("vector dimensions differ: {left} vs {right}")]
    DimensionMismatch {
        /// Dimension of the left operand.
        left: usize,
        /// Dimension of the right operand.
        right: usize,
    },

    /// An axis index beyond the vector's dimension was selected.
    #[error("axis index {index} is out of range for a {dimension}-dimensional vector")]
    IndexOutOfRange {
        /// Requested axis index.
        index: usize,
        /// Dimension of the vector.
        dimension: usize,
    },

    /// Weight is negative or not finite.
    #[error("weight must be a non-negative number, got {0}")]
    InvalidWeight(f64),

    /// Target aspect ratio is not a positive finite number.
    #[error("target ratio must be a positive finite number, got {0}")]
    InvalidRatio(f64),

    /// Clustering threshold is negative or not finite.
    #[error("cluster threshold must be a non-negative finite number, got {0}")]
    InvalidThreshold(f64),

    /// Maximum working width is zero.
    #[error("max working width must be > 0")]
    InvalidMaxWidth,

    /// Other invalid setting.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Worker pool could not be built or lost a task.
    #[error("worker pool error: {0}")]
    WorkerPool(String),

    /// A parallel task panicked.
    #[error("parallel task {index} panicked")]
    TaskPanicked {
        /// Input index of the failed task.
        index: usize,
    },

    /// A parallel batch exceeded the configured timeout.
    #[error("parallel batch did not finish within {0:?}")]
    Timeout(Duration),

    /// Work was cancelled before it started.
    #[error("detection was cancelled")]
    Cancelled,
}
