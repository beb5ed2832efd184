//! Cascade classifier model.
//!
//! A model is deserialized from a [`ModelDescription`] (usually JSON) and then
//! flattened into three arenas of plain records: stages, weak classifiers and
//! weighted rectangles. Stages and weak classifiers refer to their children by
//! index span, so scoring a window walks contiguous slices and never chases
//! per-object allocations.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::DetectError;

/// Serialized cascade description, as produced by a training tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescription {
    /// Edge length of the square training window, in pixels.
    #[serde(alias = "baseResolution")]
    pub base_size: u32,
    /// Stages in evaluation order.
    pub stages: Vec<StageDescription>,
}

/// One boosted stage of the cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDescription {
    /// The stage accepts a window iff the summed weak outputs reach this value.
    pub threshold: f32,
    /// Weak classifiers summed by this stage.
    pub weak_classifiers: Vec<WeakClassifierDescription>,
}

/// A decision stump over a weighted sum of rectangle intensities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeakClassifierDescription {
    /// Weighted rectangles whose sums form the feature response.
    pub features: Vec<FeatureDescription>,
    /// Responses below this value emit `left`, all others emit `right`.
    pub threshold: f32,
    /// Output when the response is below `threshold`.
    pub left: f32,
    /// Output when the response is at or above `threshold`.
    pub right: f32,
}

/// A rectangle relative to the base window with a signed weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDescription {
    /// Left edge within the base window.
    pub x: u32,
    /// Top edge within the base window.
    pub y: u32,
    /// Rectangle width, at least 1.
    pub width: u32,
    /// Rectangle height, at least 1.
    pub height: u32,
    /// Signed multiplier applied to the rectangle's intensity sum.
    pub weight: i32,
}

/// Half-open index span into one of the model arenas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    start: u32,
    end: u32,
}

impl Span {
    fn new(start: usize, end: usize) -> Self {
        Self {
            start: start as u32,
            end: end as u32,
        }
    }

    pub(crate) fn range(self) -> Range<usize> {
        self.start as usize..self.end as usize
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct StageNode {
    pub(crate) threshold: f32,
    pub(crate) weak: Span,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct WeakNode {
    pub(crate) threshold: f32,
    pub(crate) left: f32,
    pub(crate) right: f32,
    pub(crate) rects: Span,
}

/// Feature rectangle in base-window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WeightedRect {
    pub(crate) x: u32,
    pub(crate) y: u32,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) weight: i32,
}

/// Immutable, validated cascade classifier.
///
/// Built once per session and shared read-only by every detection call; the
/// type is `Send + Sync` and holds no interior mutability.
#[derive(Debug, Clone)]
pub struct CascadeModel {
    base_size: u32,
    stages: Vec<StageNode>,
    weak: Vec<WeakNode>,
    rects: Vec<WeightedRect>,
}

impl CascadeModel {
    /// Parse and validate a JSON cascade description.
    pub fn from_json(json: &str) -> Result<Self, DetectError> {
        let description: ModelDescription =
            serde_json::from_str(json).map_err(|e| DetectError::ModelParse(e.to_string()))?;
        Self::from_description(&description)
    }

    /// Validate a description and flatten it into arenas.
    pub fn from_description(description: &ModelDescription) -> Result<Self, DetectError> {
        let base = description.base_size;
        if base == 0 {
            return Err(DetectError::ModelParse("base size must be > 0".into()));
        }
        if description.stages.is_empty() {
            return Err(DetectError::ModelParse("cascade has no stages".into()));
        }

        let mut stages = Vec::with_capacity(description.stages.len());
        let mut weak = Vec::new();
        let mut rects = Vec::new();

        for (s, stage) in description.stages.iter().enumerate() {
            ensure_finite(stage.threshold, || format!("stage {s} threshold"))?;
            if stage.weak_classifiers.is_empty() {
                return Err(DetectError::ModelParse(format!(
                    "stage {s} has no weak classifiers"
                )));
            }

            let weak_start = weak.len();
            for (c, classifier) in stage.weak_classifiers.iter().enumerate() {
                ensure_finite(classifier.threshold, || {
                    format!("stage {s} classifier {c} threshold")
                })?;
                ensure_finite(classifier.left, || format!("stage {s} classifier {c} left"))?;
                ensure_finite(classifier.right, || {
                    format!("stage {s} classifier {c} right")
                })?;
                if classifier.features.is_empty() {
                    return Err(DetectError::ModelParse(format!(
                        "stage {s} classifier {c} has no features"
                    )));
                }

                let rect_start = rects.len();
                for feature in &classifier.features {
                    rects.push(validate_feature(feature, base, s, c)?);
                }
                weak.push(WeakNode {
                    threshold: classifier.threshold,
                    left: classifier.left,
                    right: classifier.right,
                    rects: Span::new(rect_start, rects.len()),
                });
            }

            stages.push(StageNode {
                threshold: stage.threshold,
                weak: Span::new(weak_start, weak.len()),
            });
        }

        Ok(Self {
            base_size: base,
            stages,
            weak,
            rects,
        })
    }

    /// Edge length of the training window.
    pub fn base_size(&self) -> u32 {
        self.base_size
    }

    /// Number of stages in the cascade.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Total number of weak classifiers across all stages.
    pub fn weak_classifier_count(&self) -> usize {
        self.weak.len()
    }

    pub(crate) fn stages(&self) -> &[StageNode] {
        &self.stages
    }

    pub(crate) fn weak(&self) -> &[WeakNode] {
        &self.weak
    }

    pub(crate) fn rects(&self) -> &[WeightedRect] {
        &self.rects
    }
}

fn ensure_finite(value: f32, what: impl FnOnce() -> String) -> Result<(), DetectError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(DetectError::ModelParse(format!(
            "{} is not finite: {value}",
            what()
        )))
    }
}

fn validate_feature(
    feature: &FeatureDescription,
    base: u32,
    stage: usize,
    classifier: usize,
) -> Result<WeightedRect, DetectError> {
    let FeatureDescription {
        x,
        y,
        width,
        height,
        weight,
    } = *feature;

    if width == 0 || height == 0 {
        return Err(DetectError::ModelParse(format!(
            "stage {stage} classifier {classifier}: feature has zero size"
        )));
    }
    let inside = x
        .checked_add(width)
        .zip(y.checked_add(height))
        .is_some_and(|(right, bottom)| right <= base && bottom <= base);
    if !inside {
        return Err(DetectError::ModelParse(format!(
            "stage {stage} classifier {classifier}: feature ({x}, {y}, {width}x{height}) \
             exceeds the {base}x{base} base window"
        )));
    }

    Ok(WeightedRect {
        x,
        y,
        width,
        height,
        weight,
    })
}
