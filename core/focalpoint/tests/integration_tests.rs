use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use focalpoint::{
    crop_to_ratio, Axis, Detection, FaceDetector, FocalPoint, FocalPointError, Group, ScanParams,
    Strategy,
};
use image::{DynamicImage, ImageEncoder, Rgba, RgbaImage};

/// Reports the centroid of all bright pixels as a single face.
struct BrightBlobDetector {
    calls: AtomicUsize,
}

impl BrightBlobDetector {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

impl FaceDetector for BrightBlobDetector {
    fn detect(&self, gray: &[u8], width: u32, _height: u32, _: &ScanParams) -> Vec<Detection> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (mut sum_x, mut sum_y, mut count) = (0u64, 0u64, 0u64);
        for (index, &value) in gray.iter().enumerate() {
            if value > 200 {
                sum_x += index as u64 % width as u64;
                sum_y += index as u64 / width as u64;
                count += 1;
            }
        }
        if count == 0 {
            return Vec::new();
        }
        vec![Detection {
            row: (sum_y / count) as i32,
            col: (sum_x / count) as i32,
            scale: (count as f64).sqrt().round() as i32,
            quality: 10.0,
        }]
    }
}

/// Mock face detector returning canned detections.
struct MockDetector {
    faces: Vec<Detection>,
}

impl FaceDetector for MockDetector {
    fn detect(&self, _: &[u8], _: u32, _: u32, _: &ScanParams) -> Vec<Detection> {
        self.faces.clone()
    }
}

struct SlowDetector;

impl FaceDetector for SlowDetector {
    fn detect(&self, _: &[u8], _: u32, _: u32, _: &ScanParams) -> Vec<Detection> {
        thread::sleep(Duration::from_millis(400));
        Vec::new()
    }
}

struct PanickingDetector;

impl FaceDetector for PanickingDetector {
    fn detect(&self, _: &[u8], _: u32, _: u32, _: &ScanParams) -> Vec<Detection> {
        panic!("detector crashed");
    }
}

fn face(col: i32, row: i32, scale: i32, quality: f32) -> Detection {
    Detection {
        row,
        col,
        scale,
        quality,
    }
}

/// Dark image with a bright square of side `size` centred at `(cx, cy)`.
fn image_with_blob(width: u32, height: u32, cx: u32, cy: u32, size: u32) -> DynamicImage {
    let mut img = RgbaImage::from_pixel(width, height, Rgba([20, 20, 20, 255]));
    let half = size / 2;
    for y in cy.saturating_sub(half)..(cy + half).min(height) {
        for x in cx.saturating_sub(half)..(cx + half).min(width) {
            img.put_pixel(x, y, Rgba([250, 250, 250, 255]));
        }
    }
    DynamicImage::ImageRgba8(img)
}

fn encode_png(image: &DynamicImage) -> Vec<u8> {
    let rgba = image.to_rgba8();
    let mut buffer = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buffer)
        .write_image(
            rgba.as_raw(),
            rgba.width(),
            rgba.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
    buffer
}

#[test]
fn single_pass_finds_subject_on_wide_image() {
    let detector = Arc::new(BrightBlobDetector::new());
    let locator = FocalPoint::builder(detector.clone()).build().unwrap();
    let image = image_with_blob(1200, 400, 900, 200, 80);

    let result = locator
        .find_primary_axis_position(&image, 3.0 / 4.0, Strategy::Single)
        .unwrap();

    assert!(result.found);
    assert_eq!(result.axis, Axis::Horizontal);
    assert!(
        (result.position - 0.75).abs() < 0.02,
        "position {}",
        result.position
    );
    // First preset hits, one upright scan.
    assert_eq!(detector.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn ensemble_agrees_with_single_pass() {
    let detector = Arc::new(BrightBlobDetector::new());
    let locator = FocalPoint::builder(detector.clone()).build().unwrap();
    let image = image_with_blob(300, 900, 150, 270, 60);

    let single = locator
        .find_primary_axis_position(&image, 16.0 / 9.0, Strategy::Single)
        .unwrap();
    let ensemble = locator
        .find_primary_axis_position(&image, 16.0 / 9.0, Strategy::Ensemble)
        .unwrap();

    assert_eq!(single.axis, Axis::Vertical);
    assert_eq!(ensemble.axis, Axis::Vertical);
    assert!(single.found && ensemble.found);
    assert!((single.position - 0.3).abs() < 0.02, "single {}", single.position);
    assert!(
        (ensemble.position - single.position).abs() < 0.01,
        "ensemble {} vs single {}",
        ensemble.position,
        single.position
    );
    // 1 single pass + 3 rotations x 3 scan angles.
    assert_eq!(detector.calls.load(Ordering::SeqCst), 10);
}

#[test]
fn heaviest_cluster_beats_largest_cluster() {
    // Three weak detections on the left, two strong ones on the right.
    let faces = vec![
        face(100, 100, 10, 1.0),
        face(110, 100, 10, 1.0),
        face(118, 110, 10, 2.0),
        face(900, 100, 30, 1.0),
        face(910, 120, 30, 1.0),
    ];
    let locator = FocalPoint::builder(Arc::new(MockDetector { faces }))
        .max_working_width(1000)
        .build()
        .unwrap();
    let image = DynamicImage::ImageRgba8(RgbaImage::new(1000, 300));

    let result = locator
        .find_primary_axis_position(&image, 1.0, Strategy::Single)
        .unwrap();

    assert!(result.found);
    assert!((result.position - 0.905).abs() < 1e-9, "{}", result.position);
}

#[test]
fn observer_receives_every_detection_and_group() {
    let faces = vec![
        face(100, 100, 10, 1.0),
        face(105, 100, 10, 1.0),
        face(500, 100, 10, 1.0),
    ];
    let locator = FocalPoint::builder(Arc::new(MockDetector { faces }))
        .build()
        .unwrap();
    let image = DynamicImage::ImageRgba8(RgbaImage::new(600, 200));

    let captured: Mutex<Vec<usize>> = Mutex::new(Vec::new());
    let observer = |_: &RgbaImage, detections: &[Detection], groups: &[Group]| {
        let mut captured = captured.lock().unwrap();
        captured.push(detections.len());
        captured.extend(groups.iter().map(Group::len));
    };
    locator
        .find_primary_axis_position_with_observer(&image, 1.0, Strategy::Single, &observer)
        .unwrap();

    assert_eq!(*captured.lock().unwrap(), vec![3, 2, 1]);
}

#[test]
fn blank_image_is_not_found() {
    let locator = FocalPoint::builder(Arc::new(BrightBlobDetector::new()))
        .build()
        .unwrap();
    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        800,
        600,
        Rgba([10, 10, 10, 255]),
    ));

    let result = locator
        .find_primary_axis_position(&image, 1.0, Strategy::Ensemble)
        .unwrap();
    assert!(!result.found);
    assert_eq!(result.position, 0.0);
}

#[test]
fn locate_bytes_decodes_png() {
    let locator = FocalPoint::builder(Arc::new(BrightBlobDetector::new()))
        .build()
        .unwrap();
    let png = encode_png(&image_with_blob(400, 200, 100, 100, 30));

    let result = locator.locate_bytes(&png, 1.0, Strategy::Single).unwrap();
    assert!(result.found);
    assert!((result.position - 0.25).abs() < 0.02, "{}", result.position);
}

#[test]
fn locate_bytes_rejects_invalid_input() {
    let locator = FocalPoint::builder(Arc::new(BrightBlobDetector::new()))
        .build()
        .unwrap();
    let result = locator.locate_bytes(b"not an image", 1.0, Strategy::Single);
    assert!(matches!(result, Err(FocalPointError::DecodeError(_))));
}

#[test]
fn plan_crop_keeps_subject_in_frame() {
    let locator = FocalPoint::builder(Arc::new(BrightBlobDetector::new()))
        .build()
        .unwrap();
    let image = image_with_blob(1600, 600, 1400, 300, 100);

    let crop = locator.plan_crop(&image, 1.0, Strategy::Single).unwrap();

    assert_eq!((crop.width, crop.height), (600, 600));
    assert!(crop.x <= 1350 && crop.x + crop.width >= 1450, "{crop:?}");
    // Subject near the right edge pushes the window against it.
    assert_eq!(crop.x, 1000);
}

#[test]
fn plan_crop_without_subject_uses_heuristic() {
    let locator = FocalPoint::builder(Arc::new(MockDetector { faces: vec![] }))
        .build()
        .unwrap();
    let image = DynamicImage::ImageRgba8(RgbaImage::new(300, 800));

    let crop = locator.plan_crop(&image, 3.0 / 4.0, Strategy::Single).unwrap();
    assert_eq!(crop, crop_to_ratio(300, 800, 3.0 / 4.0, None));
    assert_eq!(crop.y, 80);
}

#[test]
fn slow_detector_times_out() {
    let locator = FocalPoint::builder(Arc::new(SlowDetector))
        .workers(2)
        .timeout(Duration::from_millis(50))
        .build()
        .unwrap();
    let image = DynamicImage::ImageRgba8(RgbaImage::new(100, 100));

    let result = locator.find_primary_axis_position(&image, 1.0, Strategy::Ensemble);
    assert!(matches!(result, Err(FocalPointError::Timeout(_))));
}

#[test]
fn panicking_detector_surfaces_as_error() {
    let locator = FocalPoint::builder(Arc::new(PanickingDetector))
        .workers(2)
        .build()
        .unwrap();
    let image = DynamicImage::ImageRgba8(RgbaImage::new(100, 100));

    let result = locator.find_primary_axis_position(&image, 1.0, Strategy::Single);
    assert!(matches!(result, Err(FocalPointError::TaskPanicked { .. })));
}

#[test]
fn one_locator_serves_many_threads() {
    let locator = FocalPoint::builder(Arc::new(BrightBlobDetector::new()))
        .workers(3)
        .build()
        .unwrap();
    let positions = [0.2, 0.4, 0.6, 0.8];

    thread::scope(|scope| {
        let handles: Vec<_> = positions
            .iter()
            .map(|&fraction| {
                let locator = &locator;
                scope.spawn(move || {
                    let cx = (fraction * 1000.0) as u32;
                    let image = image_with_blob(1000, 250, cx, 125, 40);
                    let result = locator
                        .find_primary_axis_position(&image, 1.0, Strategy::Ensemble)
                        .unwrap();
                    (fraction, result)
                })
            })
            .collect();
        for handle in handles {
            let (fraction, result) = handle.join().unwrap();
            assert!(result.found);
            assert!(
                (result.position - fraction).abs() < 0.02,
                "expected {fraction}, got {}",
                result.position
            );
        }
    });
}
