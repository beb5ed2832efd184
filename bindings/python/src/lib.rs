use haarcascade_core::{DetectError, DetectOptions, Detection, Preset};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

fn to_py_err(e: DetectError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn string_to_preset(preset: &str) -> PyResult<Preset> {
    match preset {
        "fast" => Ok(Preset::Fast),
        "balanced" => Ok(Preset::Balanced),
        "thorough" => Ok(Preset::Thorough),
        _ => Err(PyValueError::new_err(format!("unknown preset: {preset}"))),
    }
}

#[allow(clippy::too_many_arguments)]
fn build_options(
    preset: Option<&str>,
    scale_step: Option<f64>,
    sweep_delta: Option<f64>,
    min_size: Option<u32>,
    max_size: Option<u32>,
    post_process: Option<bool>,
    overlap_threshold: Option<f64>,
    neighbor_threshold: Option<u32>,
    variance_floor: Option<f64>,
) -> PyResult<DetectOptions> {
    let mut options = DetectOptions::new();
    if let Some(p) = preset {
        options = options.preset(string_to_preset(p)?);
    }
    if let Some(step) = scale_step {
        options = options.scale_step(step);
    }
    if let Some(delta) = sweep_delta {
        options = options.sweep_delta(delta);
    }
    if let Some(size) = min_size {
        options = options.min_size(size);
    }
    if let Some(size) = max_size {
        options = options.max_size(size);
    }
    if let Some(enable) = post_process {
        options = options.post_process(enable);
    }
    if let Some(threshold) = overlap_threshold {
        options = options.overlap_threshold(threshold);
    }
    if let Some(threshold) = neighbor_threshold {
        options = options.neighbor_threshold(threshold);
    }
    if let Some(floor) = variance_floor {
        options = options.variance_floor(floor);
    }
    Ok(options)
}

fn to_tuples(detections: Vec<Detection>) -> Vec<(u32, u32, u32)> {
    detections.into_iter().map(|d| (d.x, d.y, d.size)).collect()
}

/// A loaded cascade classifier.
///
/// Args:
///     model: Model JSON text with `baseSize` and `stages`
#[pyclass(frozen)]
struct CascadeDetector {
    inner: haarcascade_core::CascadeDetector,
}

#[pymethods]
impl CascadeDetector {
    #[new]
    fn new(model: &str) -> PyResult<Self> {
        let inner = haarcascade_core::CascadeDetector::from_json(model).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Edge length of the model's training window.
    #[getter]
    fn base_size(&self) -> u32 {
        self.inner.model().base_size()
    }

    /// Model summary.
    ///
    /// Returns:
    ///     dict with keys: base_size (int), stages (int), weak_classifiers (int)
    fn info(&self, py: Python<'_>) -> PyResult<Py<PyDict>> {
        let model = self.inner.model();
        let dict = PyDict::new(py);
        dict.set_item("base_size", model.base_size())?;
        dict.set_item("stages", model.stage_count())?;
        dict.set_item("weak_classifiers", model.weak_classifier_count())?;
        Ok(dict.into())
    }

    /// Detect objects in an 8-bit grayscale image.
    ///
    /// Args:
    ///     gray: Row-major pixel bytes, width * height long
    ///     width: Image width in pixels
    ///     height: Image height in pixels
    ///     preset: "fast", "balanced", or "thorough" (optional, sets all defaults)
    ///     scale_step: Factor between window sizes (overrides preset, default: 1.25)
    ///     sweep_delta: Stride divisor (overrides preset, default: 10.0)
    ///     min_size: Smallest window edge (default: model base size)
    ///     max_size: Largest window edge (default: shorter image side)
    ///     post_process: Merge overlapping hits (default: True)
    ///     overlap_threshold: Overlap ratio for merging (default: 0.3)
    ///     neighbor_threshold: Minimum hits per merged box (default: 3)
    ///     variance_floor: Windows with lower intensity variance are skipped (default: 1.0)
    ///
    /// Returns:
    ///     list of (x, y, size) tuples
    #[pyo3(signature = (gray, width, height, *, preset=None, scale_step=None, sweep_delta=None, min_size=None, max_size=None, post_process=None, overlap_threshold=None, neighbor_threshold=None, variance_floor=None))]
    #[allow(clippy::too_many_arguments)]
    fn detect(
        &self,
        py: Python<'_>,
        gray: Vec<u8>,
        width: u32,
        height: u32,
        preset: Option<&str>,
        scale_step: Option<f64>,
        sweep_delta: Option<f64>,
        min_size: Option<u32>,
        max_size: Option<u32>,
        post_process: Option<bool>,
        overlap_threshold: Option<f64>,
        neighbor_threshold: Option<u32>,
        variance_floor: Option<f64>,
    ) -> PyResult<Vec<(u32, u32, u32)>> {
        let options = build_options(
            preset,
            scale_step,
            sweep_delta,
            min_size,
            max_size,
            post_process,
            overlap_threshold,
            neighbor_threshold,
            variance_floor,
        )?;
        let detections = py
            .allow_threads(|| self.inner.detect(&gray, width, height, &options))
            .map_err(to_py_err)?;
        Ok(to_tuples(detections))
    }

    /// Detect objects in an RGBA image (4 bytes per pixel).
    ///
    /// Takes the same keyword arguments as `detect`.
    ///
    /// Returns:
    ///     list of (x, y, size) tuples
    #[pyo3(signature = (rgba, width, height, *, preset=None, scale_step=None, sweep_delta=None, min_size=None, max_size=None, post_process=None, overlap_threshold=None, neighbor_threshold=None, variance_floor=None))]
    #[allow(clippy::too_many_arguments)]
    fn detect_rgba(
        &self,
        py: Python<'_>,
        rgba: Vec<u8>,
        width: u32,
        height: u32,
        preset: Option<&str>,
        scale_step: Option<f64>,
        sweep_delta: Option<f64>,
        min_size: Option<u32>,
        max_size: Option<u32>,
        post_process: Option<bool>,
        overlap_threshold: Option<f64>,
        neighbor_threshold: Option<u32>,
        variance_floor: Option<f64>,
    ) -> PyResult<Vec<(u32, u32, u32)>> {
        let options = build_options(
            preset,
            scale_step,
            sweep_delta,
            min_size,
            max_size,
            post_process,
            overlap_threshold,
            neighbor_threshold,
            variance_floor,
        )?;
        let detections = py
            .allow_threads(|| self.inner.detect_rgba(&rgba, width, height, &options))
            .map_err(to_py_err)?;
        Ok(to_tuples(detections))
    }
}

/// Cascade classifier object detection.
#[pymodule]
fn haarcascade(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<CascadeDetector>()?;
    Ok(())
}
