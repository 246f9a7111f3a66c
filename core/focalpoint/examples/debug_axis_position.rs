//! Debug subject location on images to see which detections and groups drive
//! the chosen crop anchor.
//!
//! Usage:
//!   cargo run --example debug_axis_position --features rustface -- \
//!     <seeta_fd_frontal_v1.0.bin> <ratio> <image>...
//!
//! Set `RUST_LOG=debug` to see per-pass detection counts.

use std::sync::Arc;

use focalpoint::{Detection, FocalPoint, Group, RustfaceDetector, Strategy};
use image::RgbaImage;

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let (Some(model_path), Some(ratio)) = (args.next(), args.next()) else {
        eprintln!("usage: debug_axis_position <model> <ratio> <image>...");
        std::process::exit(2);
    };
    let ratio: f64 = ratio.parse().expect("ratio must be a number, e.g. 0.75");

    let detector = RustfaceDetector::from_path(&model_path).expect("failed to load model");
    let locator = FocalPoint::builder(Arc::new(detector))
        .build()
        .expect("failed to start locator");

    for path in args {
        let image = image::open(&path).unwrap_or_else(|e| panic!("failed to open {path}: {e}"));
        println!("=== {path} ({}x{}) ===", image.width(), image.height());

        for strategy in [Strategy::Single, Strategy::Ensemble] {
            let observer = |working: &RgbaImage, detections: &[Detection], groups: &[Group]| {
                println!(
                    "  [{strategy:?}] working image {}x{}, {} detection(s)",
                    working.width(),
                    working.height(),
                    detections.len()
                );
                for (i, d) in detections.iter().enumerate() {
                    println!(
                        "    detection {i}: row={}, col={}, scale={}, quality={:.2}",
                        d.row, d.col, d.scale, d.quality
                    );
                }
                for (i, group) in groups.iter().enumerate() {
                    println!(
                        "    group {i}: {} item(s), weight={:.2}",
                        group.len(),
                        group.total_weight()
                    );
                }
            };

            let result = locator
                .find_primary_axis_position_with_observer(&image, ratio, strategy, &observer)
                .expect("locate failed");
            if result.found {
                println!(
                    "  → {strategy:?}: subject at {:.3} along {:?}",
                    result.position, result.axis
                );
            } else {
                println!("  → {strategy:?}: NO SUBJECT FOUND, falling back to heuristic");
            }

            let crop = locator
                .plan_crop(&image, ratio, strategy)
                .expect("crop planning failed");
            println!(
                "  → {strategy:?} crop: ({}, {}, {}x{})",
                crop.x, crop.y, crop.width, crop.height
            );
        }
        println!();
    }
}
