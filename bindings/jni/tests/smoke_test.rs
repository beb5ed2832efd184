use haarcascade_jni::*;

const MODEL: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../core/haarcascade/tests/fixtures/center_surround.json"
));

/// 200x150 grayscale image, dark background with two bright 12px squares.
fn make_test_gray() -> Vec<u8> {
    let mut gray = vec![20u8; 200 * 150];
    for (x0, y0) in [(30usize, 40usize), (130, 70)] {
        for y in y0..y0 + 12 {
            for x in x0..x0 + 12 {
                gray[y * 200 + x] = 220;
            }
        }
    }
    gray
}

fn small_windows() -> DetectOptions {
    DetectOptions {
        min_size: Some(20),
        max_size: Some(40),
        scale_step: Some(1.2),
        ..Default::default()
    }
}

fn bbox(x: u32, y: u32, size: u32) -> BoundingBox {
    BoundingBox { x, y, size }
}

#[test]
fn detect_with_all_parameters() {
    let detector = CascadeDetector::new(MODEL.to_string()).unwrap();
    assert_eq!(detector.base_size(), 20);
    let boxes = detector
        .detect(make_test_gray(), 200, 150, small_windows())
        .unwrap();
    assert_eq!(boxes, vec![bbox(24, 34, 25), bbox(124, 64, 25)]);
}

#[test]
fn detect_with_preset_works() {
    let detector = CascadeDetector::new(MODEL.to_string()).unwrap();
    let boxes = detector
        .detect_with_preset(make_test_gray(), 200, 150, Preset::Thorough)
        .unwrap();
    assert_eq!(boxes, vec![bbox(23, 33, 26), bbox(123, 63, 26)]);

    for preset in [Preset::Fast, Preset::Balanced, Preset::Thorough] {
        assert!(detector
            .detect_with_preset(vec![128u8; 64 * 64], 64, 64, preset)
            .unwrap()
            .is_empty());
    }
}

#[test]
fn rgba_and_packed_agree() {
    let detector = CascadeDetector::new(MODEL.to_string()).unwrap();
    let rgba: Vec<u8> = make_test_gray()
        .into_iter()
        .flat_map(|v| [v, v, v, 255])
        .collect();
    let boxes = detector
        .detect_rgba(rgba.clone(), 200, 150, small_windows())
        .unwrap();
    assert_eq!(boxes, vec![bbox(24, 34, 25), bbox(124, 64, 25)]);
    assert_eq!(
        detector
            .detect_packed(rgba, 200, 150, small_windows())
            .unwrap(),
        vec![7, 24, 34, 25, 124, 64, 25]
    );
}

#[test]
fn invalid_model_returns_error() {
    let result = CascadeDetector::new("not a model".to_string());
    assert!(matches!(result, Err(DetectError::ModelParse { .. })));
}

#[test]
fn invalid_inputs_return_errors() {
    let detector = CascadeDetector::new(MODEL.to_string()).unwrap();
    let result = detector.detect(vec![0u8; 10], 64, 64, DetectOptions::default());
    assert!(matches!(result, Err(DetectError::InvalidImage { .. })));

    let options = DetectOptions {
        overlap_threshold: Some(2.0),
        ..Default::default()
    };
    let result = detector.detect(vec![0u8; 64 * 64], 64, 64, options);
    assert!(matches!(result, Err(DetectError::InvalidOptions { .. })));
}
