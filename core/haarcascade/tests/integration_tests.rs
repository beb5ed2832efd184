use haarcascade::{
    decode_packed, CascadeDetector, CascadeModel, DetectError, DetectOptions, Detection, Preset,
};

const FIXTURE_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn load_fixture(name: &str) -> String {
    let path = format!("{FIXTURE_DIR}/{name}");
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to load fixture {path}: {e}"))
}

fn center_surround() -> CascadeDetector {
    CascadeDetector::from_json(&load_fixture("center_surround.json")).unwrap()
}

/// Dark background (20) with bright (220) squares at the given positions.
fn squares(width: u32, height: u32, squares: &[(u32, u32, u32)]) -> Vec<u8> {
    let mut gray = vec![20u8; (width * height) as usize];
    for &(x0, y0, side) in squares {
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                gray[(y * width + x) as usize] = 220;
            }
        }
    }
    gray
}

fn boxes(detections: &[Detection]) -> Vec<(u32, u32, u32)> {
    detections.iter().map(|d| (d.x, d.y, d.size)).collect()
}

fn small_windows() -> DetectOptions {
    DetectOptions::new().min_size(20).max_size(40).scale_step(1.2)
}

#[test]
fn fixture_model_loads() {
    let detector = center_surround();
    assert_eq!(detector.model().base_size(), 20);
    assert_eq!(detector.model().stage_count(), 2);
    assert_eq!(detector.model().weak_classifier_count(), 2);
}

#[test]
fn constant_image_has_no_detections() {
    let detector = center_surround();
    let gray = vec![128u8; 240 * 240];
    for preset in [Preset::Fast, Preset::Balanced, Preset::Thorough] {
        let options = DetectOptions::new().preset(preset);
        assert!(detector.raw_hits(&gray, 240, 240, &options).unwrap().is_empty());
        assert!(detector.detect(&gray, 240, 240, &options).unwrap().is_empty());
    }
}

#[test]
fn two_squares_give_two_detections() {
    let detector = center_surround();
    let gray = squares(200, 150, &[(30, 40, 12), (130, 70, 12)]);
    let detections = detector.detect(&gray, 200, 150, &small_windows()).unwrap();
    assert_eq!(boxes(&detections), vec![(24, 34, 25), (124, 64, 25)]);
}

#[test]
fn detection_size_follows_object_size() {
    let detector = center_surround();
    let gray = squares(200, 150, &[(30, 40, 12), (120, 60, 20)]);
    let options = small_windows().max_size(60);
    let detections = detector.detect(&gray, 200, 150, &options).unwrap();
    assert_eq!(boxes(&detections), vec![(24, 34, 25), (111, 51, 39)]);
}

#[test]
fn thorough_preset_merges_dense_hits() {
    let detector = center_surround();
    let gray = squares(200, 150, &[(30, 40, 12), (130, 70, 12)]);
    let options = DetectOptions::new().preset(Preset::Thorough);
    assert_eq!(detector.raw_hits(&gray, 200, 150, &options).unwrap().len(), 198);
    let detections = detector.detect(&gray, 200, 150, &options).unwrap();
    assert_eq!(boxes(&detections), vec![(23, 33, 26), (123, 63, 26)]);
}

#[test]
fn raw_hits_merge_to_detect_output() {
    let detector = center_surround();
    let gray = squares(200, 150, &[(30, 40, 12), (130, 70, 12)]);
    let options = small_windows();

    let raw = detector
        .detect(&gray, 200, 150, &options.clone().post_process(false))
        .unwrap();
    assert_eq!(raw.len(), 18);

    let merged = options.merger().merge(&raw);
    assert_eq!(merged, detector.detect(&gray, 200, 150, &options).unwrap());
}

#[test]
fn merging_detect_output_again_changes_nothing() {
    let detector = center_surround();
    let gray = squares(200, 150, &[(30, 40, 12), (120, 60, 20)]);
    let options = small_windows().max_size(60).neighbor_threshold(0);
    let detections = detector.detect(&gray, 200, 150, &options).unwrap();
    assert_eq!(options.merger().merge(&detections), detections);
}

#[test]
fn packed_output_layout() {
    let detector = center_surround();
    let gray = squares(200, 150, &[(30, 40, 12), (130, 70, 12)]);
    let rgba: Vec<u8> = gray.iter().flat_map(|&v| [v, v, v, 255]).collect();

    let packed = detector
        .detect_packed(&rgba, 200, 150, &small_windows())
        .unwrap();
    assert_eq!(packed, vec![7, 24, 34, 25, 124, 64, 25]);
    assert_eq!(
        boxes(&decode_packed(&packed).unwrap()),
        vec![(24, 34, 25), (124, 64, 25)]
    );

    let empty = detector
        .detect_packed(&vec![128u8; 200 * 150 * 4], 200, 150, &small_windows())
        .unwrap();
    assert_eq!(empty, vec![1]);
}

#[test]
fn decoded_png_matches_raw_buffer() {
    let gray = squares(200, 150, &[(30, 40, 12), (130, 70, 12)]);
    let img = image::GrayImage::from_raw(200, 150, gray.clone()).unwrap();
    let mut png = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();

    let decoded = image::load_from_memory(&png).unwrap().into_luma8();
    let detector = center_surround();
    assert_eq!(
        detector.detect_image(&decoded, &small_windows()).unwrap(),
        detector.detect(&gray, 200, 150, &small_windows()).unwrap()
    );
}

#[test]
fn image_smaller_than_base_window() {
    let detector = center_surround();
    let gray = squares(19, 40, &[(2, 2, 10)]);
    assert!(detector
        .detect(&gray, 19, 40, &DetectOptions::new())
        .unwrap()
        .is_empty());
}

#[test]
fn bad_inputs_are_reported() {
    let detector = center_surround();
    assert!(matches!(
        detector.detect(&[0u8; 100], 20, 20, &DetectOptions::new()),
        Err(DetectError::InvalidImage(_))
    ));
    assert!(matches!(
        detector.detect_rgba(&[0u8; 400], 20, 20, &DetectOptions::new()),
        Err(DetectError::InvalidImage(_))
    ));
    assert!(matches!(
        detector.detect(&[0u8; 400], 20, 20, &DetectOptions::new().scale_step(0.9)),
        Err(DetectError::InvalidOptions(_))
    ));
}

#[test]
fn malformed_models_are_rejected() {
    for json in [
        "",
        "{",
        r#"{"baseSize": 20}"#,
        r#"{"baseSize": 20, "stages": []}"#,
        r#"{"baseSize": 0, "stages": [{"threshold": 0, "weakClassifiers": []}]}"#,
        r#"{"baseSize": 20, "stages": [{"threshold": 0, "weakClassifiers": [
            {"features": [{"x": 15, "y": 0, "width": 10, "height": 5, "weight": 1}],
             "threshold": 0, "left": -1, "right": 1}]}]}"#,
    ] {
        assert!(
            matches!(CascadeModel::from_json(json), Err(DetectError::ModelParse(_))),
            "{json}"
        );
    }
}

#[test]
fn legacy_base_resolution_key_is_accepted() {
    let json = load_fixture("center_surround.json").replace("baseSize", "baseResolution");
    let model = CascadeModel::from_json(&json).unwrap();
    assert_eq!(model.base_size(), 20);
}
