use std::sync::Arc;

uniffi::setup_scaffolding!();

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum DetectError {
    #[error("failed to parse cascade model: {message}")]
    ModelParse { message: String },
    #[error("invalid image: {message}")]
    InvalidImage { message: String },
    #[error("invalid detection options: {message}")]
    InvalidOptions { message: String },
    #[error("malformed packed result: {message}")]
    MalformedPacked { message: String },
    #[error("value {value} does not fit in the packed u16 result")]
    WireOverflow { value: u64 },
}

impl From<haarcascade::DetectError> for DetectError {
    fn from(e: haarcascade::DetectError) -> Self {
        match e {
            haarcascade::DetectError::ModelParse(msg) => DetectError::ModelParse { message: msg },
            haarcascade::DetectError::InvalidImage(msg) => {
                DetectError::InvalidImage { message: msg }
            }
            haarcascade::DetectError::InvalidOptions(msg) => {
                DetectError::InvalidOptions { message: msg }
            }
            haarcascade::DetectError::MalformedPacked(msg) => {
                DetectError::MalformedPacked { message: msg }
            }
            haarcascade::DetectError::WireOverflow(value) => DetectError::WireOverflow {
                value: value as u64,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, uniffi::Enum)]
pub enum Preset {
    Fast,
    Balanced,
    Thorough,
}

impl From<Preset> for haarcascade::Preset {
    fn from(preset: Preset) -> Self {
        match preset {
            Preset::Fast => haarcascade::Preset::Fast,
            Preset::Balanced => haarcascade::Preset::Balanced,
            Preset::Thorough => haarcascade::Preset::Thorough,
        }
    }
}

/// Scan settings. `None` fields keep the preset's value (Balanced when no
/// preset is given).
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct DetectOptions {
    pub preset: Option<Preset>,
    pub scale_step: Option<f64>,
    pub sweep_delta: Option<f64>,
    pub min_size: Option<u32>,
    pub max_size: Option<u32>,
    pub post_process: Option<bool>,
    pub overlap_threshold: Option<f64>,
    pub neighbor_threshold: Option<u32>,
    pub variance_floor: Option<f64>,
}

impl From<DetectOptions> for haarcascade::DetectOptions {
    fn from(opts: DetectOptions) -> Self {
        let mut options = haarcascade::DetectOptions::new();
        if let Some(preset) = opts.preset {
            options = options.preset(preset.into());
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
        options
    }
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub size: u32,
}

fn convert_detections(detections: Vec<haarcascade::Detection>) -> Vec<BoundingBox> {
    detections
        .into_iter()
        .map(|d| BoundingBox {
            x: d.x,
            y: d.y,
            size: d.size,
        })
        .collect()
}

/// A loaded cascade model, shared by reference with the host.
#[derive(uniffi::Object)]
pub struct CascadeDetector {
    inner: haarcascade::CascadeDetector,
}

#[uniffi::export]
impl CascadeDetector {
    /// Parse and validate a JSON cascade model.
    #[uniffi::constructor]
    pub fn new(model: String) -> Result<Arc<Self>, DetectError> {
        let inner = haarcascade::CascadeDetector::from_json(&model)?;
        Ok(Arc::new(Self { inner }))
    }

    pub fn base_size(&self) -> u32 {
        self.inner.model().base_size()
    }

    /// Detect with a preset configuration on a grayscale buffer.
    pub fn detect_with_preset(
        &self,
        gray: Vec<u8>,
        width: u32,
        height: u32,
        preset: Preset,
    ) -> Result<Vec<BoundingBox>, DetectError> {
        let options = haarcascade::DetectOptions::new().preset(preset.into());
        let detections = self.inner.detect(&gray, width, height, &options)?;
        Ok(convert_detections(detections))
    }

    /// Detect with full control over scan settings on a grayscale buffer.
    pub fn detect(
        &self,
        gray: Vec<u8>,
        width: u32,
        height: u32,
        options: DetectOptions,
    ) -> Result<Vec<BoundingBox>, DetectError> {
        let detections = self.inner.detect(&gray, width, height, &options.into())?;
        Ok(convert_detections(detections))
    }

    /// Detect on an RGBA buffer (4 bytes per pixel).
    pub fn detect_rgba(
        &self,
        rgba: Vec<u8>,
        width: u32,
        height: u32,
        options: DetectOptions,
    ) -> Result<Vec<BoundingBox>, DetectError> {
        let detections = self
            .inner
            .detect_rgba(&rgba, width, height, &options.into())?;
        Ok(convert_detections(detections))
    }

    /// Detect on an RGBA buffer and return the packed `[len, x, y, size, ...]` layout.
    pub fn detect_packed(
        &self,
        rgba: Vec<u8>,
        width: u32,
        height: u32,
        options: DetectOptions,
    ) -> Result<Vec<u16>, DetectError> {
        Ok(self
            .inner
            .detect_packed(&rgba, width, height, &options.into())?)
    }
}
