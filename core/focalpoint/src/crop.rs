use crate::axis::{Axis, AxisPosition};

/// Vertical bias toward the top of the image when no subject was found.
/// 0.0 = top, 0.5 = center, 1.0 = bottom.
const VERTICAL_BIAS: f64 = 0.2;

/// Crop region within the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    /// Left edge, in source pixels.
    pub x: u32,
    /// Top edge, in source pixels.
    pub y: u32,
    /// Region width in pixels.
    pub width: u32,
    /// Region height in pixels.
    pub height: u32,
}

/// Largest region of `target_ratio` (width / height) inside the source,
/// anchored on the located subject.
///
/// With a found `anchor` the region is centred on it along the anchor's axis
/// and clamped inside the image. Without one it is centred horizontally and
/// biased toward the top vertically. An empty source yields an empty region.
pub fn crop_to_ratio(
    source_width: u32,
    source_height: u32,
    target_ratio: f64,
    anchor: Option<&AxisPosition>,
) -> CropRegion {
    if source_width == 0 || source_height == 0 {
        return CropRegion {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        };
    }

    let (crop_width, crop_height) =
        if (source_width as f64 / source_height as f64) > target_ratio {
            // Source is wider than the target: constrain by height
            let h = source_height;
            let w = ((h as f64 * target_ratio).round() as u32).clamp(1, source_width);
            (w, h)
        } else {
            // Source is taller than (or equal to) the target: constrain by width
            let w = source_width;
            let h = ((w as f64 / target_ratio).round() as u32).clamp(1, source_height);
            (w, h)
        };

    let horizontal_slack = source_width.saturating_sub(crop_width);
    let vertical_slack = source_height.saturating_sub(crop_height);

    let found = anchor.filter(|a| a.found);
    let x = match found {
        Some(a) if a.axis == Axis::Horizontal => {
            centred_offset(a.position, source_width, crop_width)
        }
        _ => horizontal_slack / 2,
    };
    let y = match found {
        Some(a) if a.axis == Axis::Vertical => {
            centred_offset(a.position, source_height, crop_height)
        }
        _ => (vertical_slack as f64 * VERTICAL_BIAS).round() as u32,
    };

    CropRegion {
        x,
        y,
        width: crop_width,
        height: crop_height,
    }
}

/// Offset that centres a `crop` long window on `position × source`, kept
/// inside the source.
fn centred_offset(position: f64, source: u32, crop: u32) -> u32 {
    let slack = source.saturating_sub(crop) as f64;
    let centre = position.clamp(0.0, 1.0) * source as f64;
    (centre - crop as f64 / 2.0).round().clamp(0.0, slack) as u32
}
