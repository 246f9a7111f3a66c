//! Point rotation between an image and its rotated copy.
//!
//! Rotations are clockwise in image coordinates (y pointing down), matching
//! `image::imageops::rotate90` and `imageproc`'s `rotate_about_center`.

/// Tolerance used when snapping angles and extents to whole values.
const EPSILON: f64 = 1e-6;

/// Normalize an angle in degrees into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let normalized = degrees.rem_euclid(360.0);
    if (360.0 - normalized).abs() < EPSILON {
        0.0
    } else {
        normalized
    }
}

/// Inverse of a rotation: `(360 − degrees) mod 360`.
pub fn inverse_degrees(degrees: f64) -> f64 {
    normalize_degrees(360.0 - normalize_degrees(degrees))
}

/// Size of the bounding box of a `width` × `height` image rotated by `degrees`.
///
/// Right angles swap or keep the dimensions exactly.
pub fn rotated_bounds(width: u32, height: u32, degrees: f64) -> (u32, u32) {
    let (sin, cos) = normalize_degrees(degrees).to_radians().sin_cos();
    let (w, h) = (width as f64, height as f64);
    let new_w = w * cos.abs() + h * sin.abs();
    let new_h = w * sin.abs() + h * cos.abs();
    (
        (new_w - EPSILON).ceil().max(1.0) as u32,
        (new_h - EPSILON).ceil().max(1.0) as u32,
    )
}

/// Map `(x, y)` from a `width` × `height` image into the frame of that image
/// rotated by `degrees` about its centre.
///
/// The result is expressed in the rotated image's bounding box (see
/// [`rotated_bounds`]) and clamped into it.
pub fn rotate_point(x: i32, y: i32, width: u32, height: u32, degrees: f64) -> (i32, i32) {
    let (dst_w, dst_h) = rotated_bounds(width, height, degrees);
    rotate_point_into(x, y, (width, height), (dst_w, dst_h), degrees)
}

/// Rotate `(x, y)` about the centre of a `src` sized frame and re-express it
/// relative to the centre of a `dst` sized frame, clamped into `dst`.
///
/// With `dst` equal to the original size and the inverse angle, this maps a
/// point found on a rotated copy back into the original image.
pub fn rotate_point_into(
    x: i32,
    y: i32,
    src: (u32, u32),
    dst: (u32, u32),
    degrees: f64,
) -> (i32, i32) {
    let (sin, cos) = normalize_degrees(degrees).to_radians().sin_cos();
    let (src_cx, src_cy) = (centre(src.0), centre(src.1));
    let (dst_cx, dst_cy) = (centre(dst.0), centre(dst.1));

    let dx = x as f64 - src_cx;
    let dy = y as f64 - src_cy;
    let rx = dx * cos - dy * sin + dst_cx;
    let ry = dx * sin + dy * cos + dst_cy;

    (clamp_axis(rx, dst.0), clamp_axis(ry, dst.1))
}

/// Centre of a pixel axis of `len` pixels, in pixel-centre coordinates.
fn centre(len: u32) -> f64 {
    (len as f64 - 1.0) / 2.0
}

fn clamp_axis(value: f64, len: u32) -> i32 {
    let max = len.saturating_sub(1) as f64;
    value.round().clamp(0.0, max) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_wraps_into_range() {
        assert_eq!(normalize_degrees(450.0), 90.0);
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(inverse_degrees(90.0), 270.0);
        assert_eq!(inverse_degrees(0.0), 0.0);
    }

    #[test]
    fn right_angles_swap_bounds_exactly() {
        assert_eq!(rotated_bounds(640, 480, 0.0), (640, 480));
        assert_eq!(rotated_bounds(640, 480, 90.0), (480, 640));
        assert_eq!(rotated_bounds(640, 480, 180.0), (640, 480));
        assert_eq!(rotated_bounds(640, 480, 270.0), (480, 640));
    }

    #[test]
    fn diagonal_bounds_grow() {
        let (w, h) = rotated_bounds(100, 100, 45.0);
        // 100 * sqrt(2) ≈ 141.42
        assert_eq!((w, h), (142, 142));
    }

    #[test]
    fn quarter_turn_matches_imageops_rotate90() {
        // rotate90 sends (x, y) in a w×h image to (h - 1 - y, x).
        let (w, h) = (7, 4);
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                assert_eq!(rotate_point(x, y, w, h, 90.0), (h as i32 - 1 - y, x));
                assert_eq!(rotate_point(x, y, w, h, 270.0), (y, w as i32 - 1 - x));
                assert_eq!(
                    rotate_point(x, y, w, h, 180.0),
                    (w as i32 - 1 - x, h as i32 - 1 - y)
                );
            }
        }
    }

    #[test]
    fn round_trip_stays_within_one_pixel() {
        let sizes = [(64u32, 48u32), (31, 77), (10, 10)];
        let angles = [0.0, 13.0, 30.0, 45.0, 90.0, 135.0, 180.0, 270.0, 333.0];
        for &(w, h) in &sizes {
            for &angle in &angles {
                let rotated = rotated_bounds(w, h, angle);
                for y in (0..h as i32).step_by(3) {
                    for x in (0..w as i32).step_by(3) {
                        let (rx, ry) = rotate_point(x, y, w, h, angle);
                        let (bx, by) =
                            rotate_point_into(rx, ry, rotated, (w, h), inverse_degrees(angle));
                        assert!(
                            (bx - x).abs() <= 1 && (by - y).abs() <= 1,
                            "{w}x{h} @ {angle}: ({x}, {y}) came back as ({bx}, {by})"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn results_are_clamped_into_destination() {
        let (x, y) = rotate_point_into(500, -20, (100, 100), (50, 50), 0.0);
        assert_eq!((x, y), (49, 0));
    }
}
