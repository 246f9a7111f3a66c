//! Reduce detections to one normalized position along the dominant axis.

use log::debug;

use crate::cluster::{group_by_distance, sort_groups_by_weight, Group};
use crate::error::FocalPointError;
use crate::face_detector::Detection;
use crate::vector::{Vector, WeightedVector};

/// An image axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// X: positions are fractions of the image width.
    Horizontal,
    /// Y: positions are fractions of the image height.
    Vertical,
}

impl Axis {
    /// The axis a crop to `target_ratio` (width / height) removes content
    /// from: horizontal when the image is wider than the target, vertical
    /// otherwise.
    pub fn dominant(width: u32, height: u32, target_ratio: f64) -> Axis {
        if height as f64 * target_ratio < width as f64 {
            Axis::Horizontal
        } else {
            Axis::Vertical
        }
    }

    /// Index of this axis in an `(x, y)` vector.
    pub fn index(self) -> usize {
        match self {
            Axis::Horizontal => 0,
            Axis::Vertical => 1,
        }
    }
}

/// Where the subject sits along the dominant axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisPosition {
    /// Normalized position in `[0, 1]`; `0.0` when nothing was found.
    pub position: f64,
    /// Whether any subject was located.
    pub found: bool,
    /// The axis `position` is measured along.
    pub axis: Axis,
}

impl AxisPosition {
    /// Result for an image where nothing was located along `axis`.
    pub fn not_found(axis: Axis) -> Self {
        Self {
            position: 0.0,
            found: false,
            axis,
        }
    }
}

/// Normalized `(col / width, row / height)` of a detection, weighted by
/// `scale × quality`. Centres outside the frame are pulled onto its edge.
pub fn detection_to_weighted_vector(
    detection: &Detection,
    width: u32,
    height: u32,
) -> Result<WeightedVector, FocalPointError> {
    if width == 0 || height == 0 {
        return Err(FocalPointError::ZeroDimensions);
    }
    let col = (detection.col as f64).clamp(0.0, (width - 1) as f64);
    let row = (detection.row as f64).clamp(0.0, (height - 1) as f64);
    let vector = Vector::new([col / width as f64, row / height as f64]);
    WeightedVector::new(vector, detection.weight())
}

/// Cluster detections along the dominant axis and return the weighted mean
/// of the heaviest group.
///
/// `observe` receives the groups straight after clustering, before ranking.
pub fn primary_axis_position(
    detections: &[Detection],
    (width, height): (u32, u32),
    target_ratio: f64,
    threshold: f64,
    mut observe: impl FnMut(&[Group]),
) -> Result<AxisPosition, FocalPointError> {
    let axis = Axis::dominant(width, height, target_ratio);

    let projected = detections
        .iter()
        .map(|d| detection_to_weighted_vector(d, width, height)?.select(&[axis.index()]))
        .collect::<Result<Vec<_>, _>>()?;

    let mut groups = group_by_distance(&projected, threshold)?;
    observe(&groups);
    debug!(
        "{} detections form {} group(s) along {axis:?}",
        detections.len(),
        groups.len()
    );

    sort_groups_by_weight(&mut groups);
    let Some(top) = groups.first() else {
        return Ok(AxisPosition::not_found(axis));
    };

    let reduced = top.average()?;
    match reduced.components() {
        [position] => {
            debug!(
                "dominant group of {} (weight {:.2}) sits at {:.3}",
                top.len(),
                top.total_weight(),
                position.value()
            );
            Ok(AxisPosition {
                position: position.value(),
                found: true,
                axis,
            })
        }
        _ => Ok(AxisPosition::not_found(axis)),
    }
}
