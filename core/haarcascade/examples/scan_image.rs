//! Run a cascade model over an image file and print the detections.
//!
//! Usage:
//!   RUST_LOG=debug cargo run --example scan_image -- <model.json> <image> [fast|balanced|thorough]
//!
//! Each detection is printed as `x y size`.

use haarcascade::{CascadeDetector, DetectOptions, Preset};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("usage: scan_image <model.json> <image> [fast|balanced|thorough]");
        std::process::exit(2);
    }

    let preset = match args.get(2).map(String::as_str) {
        None | Some("balanced") => Preset::Balanced,
        Some("fast") => Preset::Fast,
        Some("thorough") => Preset::Thorough,
        Some(other) => {
            eprintln!("unknown preset: {other}");
            std::process::exit(2);
        }
    };

    let model = std::fs::read_to_string(&args[0])
        .unwrap_or_else(|e| panic!("failed to read model {}: {e}", args[0]));
    let detector = CascadeDetector::from_json(&model).unwrap();

    let gray = image::open(&args[1])
        .unwrap_or_else(|e| panic!("failed to open image {}: {e}", args[1]))
        .into_luma8();
    println!("{} ({}x{})", args[1], gray.width(), gray.height());

    let options = DetectOptions::new().preset(preset);
    let start = std::time::Instant::now();
    let detections = detector.detect_image(&gray, &options).unwrap();
    println!(
        "  {} detection(s) in {:.1} ms",
        detections.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    for d in &detections {
        println!("  {} {} {}", d.x, d.y, d.size);
    }
}
