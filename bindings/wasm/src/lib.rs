use serde::Deserialize;
use wasm_bindgen::prelude::*;

/// Options for one detection call, passed as a JavaScript object.
///
/// All fields are optional. When a `preset` is specified, its defaults apply
/// and individual fields override them.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectOptions {
    pub preset: Option<String>,
    pub scale_step: Option<f64>,
    pub sweep_delta: Option<f64>,
    pub min_size: Option<u32>,
    pub max_size: Option<u32>,
    pub post_process: Option<bool>,
    pub overlap_threshold: Option<f64>,
    pub neighbor_threshold: Option<u32>,
    pub variance_floor: Option<f64>,
}

fn string_to_preset(preset: &str) -> Result<haarcascade::Preset, JsValue> {
    match preset {
        "fast" => Ok(haarcascade::Preset::Fast),
        "balanced" => Ok(haarcascade::Preset::Balanced),
        "thorough" => Ok(haarcascade::Preset::Thorough),
        _ => Err(make_error(
            "INVALID_OPTIONS",
            &format!("unknown preset: {preset}"),
        )),
    }
}

/// Create a JS `Error` with a `code` property.
fn make_error(code: &str, message: &str) -> JsValue {
    let err = js_sys::Error::new(message);
    let _ = js_sys::Reflect::set(&err, &"code".into(), &JsValue::from_str(code));
    JsValue::from(err)
}

/// Convert a `DetectError` into a JS `Error` with a machine-readable `code` property.
fn to_js_error(e: haarcascade::DetectError) -> JsValue {
    let code = match &e {
        haarcascade::DetectError::ModelParse(_) => "MODEL_PARSE_ERROR",
        haarcascade::DetectError::InvalidImage(_) => "INVALID_IMAGE",
        haarcascade::DetectError::InvalidOptions(_) => "INVALID_OPTIONS",
        haarcascade::DetectError::MalformedPacked(_) => "MALFORMED_PACKED",
        haarcascade::DetectError::WireOverflow(_) => "WIRE_OVERFLOW",
    };
    make_error(code, &e.to_string())
}

fn parse_options(options: JsValue) -> Result<DetectOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(DetectOptions::default())
    } else {
        serde_wasm_bindgen::from_value(options)
            .map_err(|e| make_error("INVALID_OPTIONS", &format!("invalid options: {e}")))
    }
}

/// Translate parsed JS options into core `DetectOptions`.
fn apply_options(opts: &DetectOptions) -> Result<haarcascade::DetectOptions, JsValue> {
    let mut options = haarcascade::DetectOptions::new();
    if let Some(ref p) = opts.preset {
        options = options.preset(string_to_preset(p)?);
    }
    if let Some(step) = opts.scale_step {
        options = options.scale_step(step);
    }
    if let Some(delta) = opts.sweep_delta {
        options = options.sweep_delta(delta);
    }
    if let Some(size) = opts.min_size {
        options = options.min_size(size);
    }
    if let Some(size) = opts.max_size {
        options = options.max_size(size);
    }
    if let Some(enable) = opts.post_process {
        options = options.post_process(enable);
    }
    if let Some(threshold) = opts.overlap_threshold {
        options = options.overlap_threshold(threshold);
    }
    if let Some(threshold) = opts.neighbor_threshold {
        options = options.neighbor_threshold(threshold);
    }
    if let Some(floor) = opts.variance_floor {
        options = options.variance_floor(floor);
    }
    Ok(options)
}

/// A loaded cascade model.
///
/// The model stays in WebAssembly memory until `destroy()` (or `free()`) is
/// called; JavaScript does not reclaim it automatically.
#[wasm_bindgen]
pub struct Detector {
    inner: haarcascade::CascadeDetector,
}

#[wasm_bindgen]
impl Detector {
    /// Parse and validate a cascade model.
    ///
    /// @param model - Model JSON text (`baseSize` and `stages`)
    #[wasm_bindgen(constructor)]
    pub fn new(model: &str) -> Result<Detector, JsValue> {
        let inner = haarcascade::CascadeDetector::from_json(model).map_err(to_js_error)?;
        Ok(Detector { inner })
    }

    /// Edge length of the model's training window.
    #[wasm_bindgen(getter, js_name = "baseSize")]
    pub fn base_size(&self) -> u32 {
        self.inner.model().base_size()
    }

    /// Detect objects in a canvas `ImageData` buffer.
    ///
    /// Returns the packed layout `[len, x1, y1, s1, x2, y2, s2, ...]` where
    /// `len` counts every element including itself.
    ///
    /// @param rgba - RGBA pixels, 4 bytes per pixel, row-major
    /// @param width - Image width in pixels
    /// @param height - Image height in pixels
    /// @param options - Optional object with fields: preset, scaleStep,
    ///   sweepDelta, minSize, maxSize, postProcess, overlapThreshold,
    ///   neighborThreshold, varianceFloor
    pub fn detect(
        &self,
        rgba: &[u8],
        width: u32,
        height: u32,
        options: JsValue,
    ) -> Result<Vec<u16>, JsValue> {
        let options = apply_options(&parse_options(options)?)?;
        self.inner
            .detect_packed(rgba, width, height, &options)
            .map_err(to_js_error)
    }

    /// Detect objects and return them as an array of `{ x, y, size }` objects.
    #[wasm_bindgen(js_name = "detectBoxes")]
    pub fn detect_boxes(
        &self,
        rgba: &[u8],
        width: u32,
        height: u32,
        options: JsValue,
    ) -> Result<js_sys::Array, JsValue> {
        let options = apply_options(&parse_options(options)?)?;
        let detections = self
            .inner
            .detect_rgba(rgba, width, height, &options)
            .map_err(to_js_error)?;

        let boxes = js_sys::Array::new();
        for d in &detections {
            let obj = js_sys::Object::new();
            js_sys::Reflect::set(&obj, &"x".into(), &JsValue::from(d.x))?;
            js_sys::Reflect::set(&obj, &"y".into(), &JsValue::from(d.y))?;
            js_sys::Reflect::set(&obj, &"size".into(), &JsValue::from(d.size))?;
            boxes.push(&obj);
        }
        Ok(boxes)
    }

    /// Release the model. The object cannot be used afterwards.
    pub fn destroy(self) {}
}

/// Load a cascade model, equivalent to `new Detector(model)`.
#[wasm_bindgen]
pub fn create(model: &str) -> Result<Detector, JsValue> {
    Detector::new(model)
}
