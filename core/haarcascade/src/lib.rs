//! Cascade classifier object detection: integral images, a multiscale
//! sliding-window scan, and grouping of overlapping hits.
//!
//! # Example
//!
//! ```no_run
//! use haarcascade::{CascadeDetector, DetectOptions, Preset};
//!
//! let model = std::fs::read_to_string("face.json").unwrap();
//! let detector = CascadeDetector::from_json(&model).unwrap();
//!
//! let gray = image::open("group.jpg").unwrap().into_luma8();
//! let options = DetectOptions::new().preset(Preset::Thorough).neighbor_threshold(4);
//! for d in detector.detect_image(&gray, &options).unwrap() {
//!     println!("{} {} {}", d.x, d.y, d.size);
//! }
//! ```
#![warn(missing_docs)]

mod error;
mod integral;
mod luma;
mod merge;
mod model;
/// Window-size enumeration and the sliding-window scan.
pub mod scanner;
mod scorer;
mod wire;

/// Error type returned by model construction and detection calls.
pub use error::DetectError;
pub use integral::{IntegralTables, WindowStats};
pub use luma::luma_from_rgba;
pub use merge::{Detection, DetectionMerger};
pub use model::{
    CascadeModel, FeatureDescription, ModelDescription, StageDescription,
    WeakClassifierDescription,
};
pub use scanner::{RawHit, ScanPlan};
pub use scorer::{ScaledCascade, Verdict, Window};
pub use wire::{decode_packed, encode_packed};

use log::debug;

/// Pre-configured scan settings trading speed for recall.
///
/// Apply a preset with [`DetectOptions::preset`], then override individual
/// settings as needed. A preset replaces every setting, including any window
/// size bounds set earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Coarse scan for live video.
    ///
    /// - scale step 2.0, sweep delta 2.0 (stride = half the window)
    /// - neighbor threshold 1
    Fast,

    /// The default settings.
    ///
    /// - scale step 1.25, sweep delta 10.0
    /// - neighbor threshold 3
    Balanced,

    /// Dense scan for still images.
    ///
    /// - scale step 1.1, sweep delta 20.0
    /// - neighbor threshold 5
    Thorough,
}

/// Scan and post-processing parameters for one detection call.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectOptions {
    scale_step: f64,
    sweep_delta: f64,
    min_size: Option<u32>,
    max_size: Option<u32>,
    post_process: bool,
    overlap_threshold: f64,
    neighbor_threshold: u32,
    /// Windows whose intensity variance is below this are rejected unscored.
    variance_floor: f64,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            scale_step: 1.25,
            sweep_delta: 10.0,
            min_size: None,
            max_size: None,
            post_process: true,
            overlap_threshold: 0.3,
            neighbor_threshold: 3,
            variance_floor: 1.0,
        }
    }
}

impl DetectOptions {
    /// Options with the [`Preset::Balanced`] settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a preset configuration. Individual settings can be overridden
    /// after this call.
    pub fn preset(self, preset: Preset) -> Self {
        let base = Self::default();
        match preset {
            Preset::Fast => Self {
                scale_step: 2.0,
                sweep_delta: 2.0,
                neighbor_threshold: 1,
                ..base
            },
            Preset::Balanced => base,
            Preset::Thorough => Self {
                scale_step: 1.1,
                sweep_delta: 20.0,
                neighbor_threshold: 5,
                ..base
            },
        }
    }

    /// Multiplicative factor between consecutive window sizes; must be > 1.
    pub fn scale_step(mut self, step: f64) -> Self {
        self.scale_step = step;
        self
    }

    /// Position stride divisor: stride = round(size / delta); must be > 0.
    pub fn sweep_delta(mut self, delta: f64) -> Self {
        self.sweep_delta = delta;
        self
    }

    /// Smallest window edge (default: the model's base size).
    pub fn min_size(mut self, size: u32) -> Self {
        self.min_size = Some(size);
        self
    }

    /// Largest window edge (default: the shorter image side).
    pub fn max_size(mut self, size: u32) -> Self {
        self.max_size = Some(size);
        self
    }

    /// Enable or disable grouping of overlapping hits (default: true).
    pub fn post_process(mut self, enable: bool) -> Self {
        self.post_process = enable;
        self
    }

    /// Overlap ratio in (0, 1] at which two hits are grouped (default: 0.3).
    pub fn overlap_threshold(mut self, threshold: f64) -> Self {
        self.overlap_threshold = threshold;
        self
    }

    /// Minimum raw hits a group needs to survive, inclusive (default: 3).
    pub fn neighbor_threshold(mut self, threshold: u32) -> Self {
        self.neighbor_threshold = threshold;
        self
    }

    /// Variance below which a window is treated as featureless (default: 1.0).
    pub fn variance_floor(mut self, floor: f64) -> Self {
        self.variance_floor = floor;
        self
    }

    /// Check every parameter against its valid range.
    pub fn validate(&self) -> Result<(), DetectError> {
        if !(self.scale_step.is_finite() && self.scale_step > 1.0) {
            return Err(DetectError::InvalidOptions(format!(
                "scale step must be a finite value > 1, got {}",
                self.scale_step
            )));
        }
        if !(self.sweep_delta.is_finite() && self.sweep_delta > 0.0) {
            return Err(DetectError::InvalidOptions(format!(
                "sweep delta must be a finite value > 0, got {}",
                self.sweep_delta
            )));
        }
        if !(self.overlap_threshold > 0.0 && self.overlap_threshold <= 1.0) {
            return Err(DetectError::InvalidOptions(format!(
                "overlap threshold must be in (0, 1], got {}",
                self.overlap_threshold
            )));
        }
        if !(self.variance_floor.is_finite() && self.variance_floor >= 0.0) {
            return Err(DetectError::InvalidOptions(format!(
                "variance floor must be a finite value >= 0, got {}",
                self.variance_floor
            )));
        }
        if self.min_size == Some(0) || self.max_size == Some(0) {
            return Err(DetectError::InvalidOptions(
                "window sizes must be > 0".to_string(),
            ));
        }
        if let (Some(min), Some(max)) = (self.min_size, self.max_size) {
            if min > max {
                return Err(DetectError::InvalidOptions(format!(
                    "min size {min} exceeds max size {max}"
                )));
            }
        }
        Ok(())
    }

    /// Resolve the scan geometry for a model and image size.
    pub fn plan(&self, model: &CascadeModel, width: u32, height: u32) -> ScanPlan {
        ScanPlan {
            min_size: self.min_size.unwrap_or(model.base_size()),
            max_size: self.max_size.unwrap_or(width.min(height)),
            scale_step: self.scale_step,
            sweep_delta: self.sweep_delta,
            variance_floor: self.variance_floor,
        }
    }

    /// The post-processing step configured by these options.
    pub fn merger(&self) -> DetectionMerger {
        DetectionMerger {
            enabled: self.post_process,
            overlap_threshold: self.overlap_threshold,
            neighbor_threshold: self.neighbor_threshold,
        }
    }
}

/// A loaded cascade ready to scan images.
///
/// Construct once per model and reuse it across frames. Detection calls take
/// `&self`, so one detector can be shared between threads.
#[derive(Debug, Clone)]
pub struct CascadeDetector {
    model: CascadeModel,
}

impl CascadeDetector {
    /// Wrap an already validated model.
    pub fn new(model: CascadeModel) -> Self {
        Self { model }
    }

    /// Parse and validate a JSON cascade description.
    pub fn from_json(json: &str) -> Result<Self, DetectError> {
        CascadeModel::from_json(json).map(Self::new)
    }

    /// The underlying model.
    pub fn model(&self) -> &CascadeModel {
        &self.model
    }

    /// Run the cascade over a grayscale buffer and return the accepted windows
    /// before post-processing.
    pub fn raw_hits(
        &self,
        gray: &[u8],
        width: u32,
        height: u32,
        options: &DetectOptions,
    ) -> Result<Vec<RawHit>, DetectError> {
        options.validate()?;
        let tables = IntegralTables::new(gray, width, height)?;
        let plan = options.plan(&self.model, width, height);
        Ok(scanner::scan(&tables, &self.model, &plan))
    }

    /// Detect objects in a row-major grayscale buffer of `width × height` bytes.
    pub fn detect(
        &self,
        gray: &[u8],
        width: u32,
        height: u32,
        options: &DetectOptions,
    ) -> Result<Vec<Detection>, DetectError> {
        let hits = self.raw_hits(gray, width, height, options)?;
        let hits: Vec<Detection> = hits.into_iter().map(Detection::from).collect();
        let detections = options.merger().merge(&hits);
        debug!(
            "detect {width}x{height}: {} raw hits, {} detections",
            hits.len(),
            detections.len()
        );
        Ok(detections)
    }

    /// Detect objects in an `image` crate grayscale buffer.
    pub fn detect_image(
        &self,
        image: &image::GrayImage,
        options: &DetectOptions,
    ) -> Result<Vec<Detection>, DetectError> {
        self.detect(image.as_raw(), image.width(), image.height(), options)
    }

    /// Detect objects in an RGBA buffer (4 bytes per pixel), converting to luma first.
    pub fn detect_rgba(
        &self,
        rgba: &[u8],
        width: u32,
        height: u32,
        options: &DetectOptions,
    ) -> Result<Vec<Detection>, DetectError> {
        let gray = luma_from_rgba(rgba, width, height)?;
        self.detect_image(&gray, options)
    }

    /// Detect objects in an RGBA buffer and return the packed `u16` layout
    /// (see [`encode_packed`]).
    pub fn detect_packed(
        &self,
        rgba: &[u8],
        width: u32,
        height: u32,
        options: &DetectOptions,
    ) -> Result<Vec<u16>, DetectError> {
        encode_packed(&self.detect_rgba(rgba, width, height, options)?)
    }
}
