use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};

use crate::error::FocalPointError;
use crate::geometry::{normalize_degrees, rotated_bounds};

/// Fill used for canvas exposed by rotation.
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Decode input bytes (JPEG, PNG or WebP) into a `DynamicImage`.
pub(crate) fn decode_image(input: &[u8]) -> Result<DynamicImage, FocalPointError> {
    let decoded =
        image::load_from_memory(input).map_err(|e| FocalPointError::DecodeError(e.to_string()))?;
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(FocalPointError::ZeroDimensions);
    }
    Ok(decoded)
}

/// Convert to RGBA and downsample with nearest-neighbour when wider than
/// `max_width`, keeping the aspect ratio.
pub(crate) fn working_image(image: &DynamicImage, max_width: u32) -> RgbaImage {
    let rgba = image.to_rgba8();
    let (src_w, src_h) = rgba.dimensions();
    if src_w <= max_width {
        return rgba;
    }
    let new_h = ((src_h as f64 / src_w as f64) * max_width as f64).round() as u32;
    imageops::resize(&rgba, max_width, new_h.max(1), FilterType::Nearest)
}

/// Rotate clockwise by `degrees` about the centre, expanding the canvas to the
/// rotated bounding box and filling exposed area with transparent pixels.
pub(crate) fn rotate_image(image: &RgbaImage, degrees: f64) -> RgbaImage {
    let degrees = normalize_degrees(degrees);
    if is_angle(degrees, 0.0) {
        return image.clone();
    }
    if is_angle(degrees, 90.0) {
        return imageops::rotate90(image);
    }
    if is_angle(degrees, 180.0) {
        return imageops::rotate180(image);
    }
    if is_angle(degrees, 270.0) {
        return imageops::rotate270(image);
    }

    // Pad to the diagonal so no content is lost, rotate, then trim to the
    // rotated bounding box.
    let (w, h) = image.dimensions();
    let diagonal = (w as f64).hypot(h as f64).ceil() as u32;
    let mut canvas = RgbaImage::from_pixel(diagonal, diagonal, TRANSPARENT);
    imageops::overlay(
        &mut canvas,
        image,
        ((diagonal - w) / 2) as i64,
        ((diagonal - h) / 2) as i64,
    );
    let rotated = rotate_about_center(
        &canvas,
        degrees.to_radians() as f32,
        Interpolation::Bilinear,
        TRANSPARENT,
    );

    let (out_w, out_h) = rotated_bounds(w, h, degrees);
    let (out_w, out_h) = (out_w.min(diagonal), out_h.min(diagonal));
    imageops::crop_imm(
        &rotated,
        (diagonal - out_w) / 2,
        (diagonal - out_h) / 2,
        out_w,
        out_h,
    )
    .to_image()
}

/// 8-bit luma of `image`, as consumed by detectors.
pub(crate) fn to_gray(image: &RgbaImage) -> GrayImage {
    imageops::grayscale(image)
}

fn is_angle(degrees: f64, target: f64) -> bool {
    (degrees - target).abs() < 1e-9
}
