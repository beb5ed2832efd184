//! Cascade evaluation of a single window.

use crate::integral::IntegralTables;
use crate::model::CascadeModel;

/// A square region of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window {
    /// Left edge, in pixels.
    pub x: u32,
    /// Top edge, in pixels.
    pub y: u32,
    /// Edge length, in pixels.
    pub size: u32,
}

/// Outcome of scoring one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Every stage accepted.
    Accepted,
    /// A stage summed below its threshold.
    Rejected {
        /// Index of the rejecting stage.
        stage: usize,
    },
    /// Window variance is below the floor; the cascade was not run.
    Degenerate,
}

impl Verdict {
    /// True when every stage accepted the window.
    pub fn is_accepted(self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

#[derive(Debug, Clone, Copy)]
struct ScaledRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    weight: f64,
}

/// A model's feature rectangles resized for one window size.
///
/// Built once per scale by the scanner and reused for every window position
/// at that scale.
#[derive(Debug)]
pub struct ScaledCascade<'m> {
    model: &'m CascadeModel,
    size: u32,
    rects: Vec<ScaledRect>,
}

impl<'m> ScaledCascade<'m> {
    /// Scale every rectangle of `model` from its base size to `size`.
    ///
    /// A zero `size` yields a cascade that scores every window as
    /// [`Verdict::Degenerate`].
    pub fn new(model: &'m CascadeModel, size: u32) -> Self {
        if size == 0 {
            return Self {
                model,
                size,
                rects: Vec::new(),
            };
        }
        let scale = size as f64 / model.base_size() as f64;
        let rects = model
            .rects()
            .iter()
            .map(|r| {
                let x = ((r.x as f64 * scale).round() as u32).min(size.saturating_sub(1));
                let y = ((r.y as f64 * scale).round() as u32).min(size.saturating_sub(1));
                let width = ((r.width as f64 * scale).round() as u32).clamp(1, size - x);
                let height = ((r.height as f64 * scale).round() as u32).clamp(1, size - y);
                ScaledRect {
                    x,
                    y,
                    width,
                    height,
                    weight: r.weight as f64,
                }
            })
            .collect();
        Self { model, size, rects }
    }

    /// Window edge length this cascade was scaled to.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Score the window at `(x, y)` through every stage.
    pub fn score(&self, tables: &IntegralTables, x: u32, y: u32, variance_floor: f64) -> Verdict {
        self.score_stages(tables, x, y, variance_floor, self.model.stage_count())
    }

    /// Score the window through the first `stage_limit` stages only.
    pub fn score_stages(
        &self,
        tables: &IntegralTables,
        x: u32,
        y: u32,
        variance_floor: f64,
        stage_limit: usize,
    ) -> Verdict {
        let stats = tables.window_stats(x, y, self.size);
        if stats.variance < variance_floor || stats.norm <= 0.0 {
            return Verdict::Degenerate;
        }
        let inv_norm = 1.0 / stats.norm;

        let weak = self.model.weak();
        for (index, stage) in self.model.stages().iter().take(stage_limit).enumerate() {
            let mut stage_sum = 0.0f64;
            for node in &weak[stage.weak.range()] {
                let response: f64 = self.rects[node.rects.range()]
                    .iter()
                    .map(|r| {
                        r.weight * tables.rect_sum(x + r.x, y + r.y, r.width, r.height) as f64
                    })
                    .sum::<f64>()
                    * inv_norm;
                stage_sum += if response < node.threshold as f64 {
                    node.left as f64
                } else {
                    node.right as f64
                };
            }
            if stage_sum < stage.threshold as f64 {
                return Verdict::Rejected { stage: index };
            }
        }
        Verdict::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        FeatureDescription, ModelDescription, StageDescription, WeakClassifierDescription,
    };
    use proptest::prelude::*;

    fn whole_window_model(base: u32, thresholds: &[f32]) -> CascadeModel {
        let stages = thresholds
            .iter()
            .map(|&t| StageDescription {
                threshold: 0.0,
                weak_classifiers: vec![WeakClassifierDescription {
                    features: vec![FeatureDescription {
                        x: 0,
                        y: 0,
                        width: base,
                        height: base,
                        weight: 1,
                    }],
                    threshold: t,
                    left: -1.0,
                    right: 1.0,
                }],
            })
            .collect();
        CascadeModel::from_description(&ModelDescription {
            base_size: base,
            stages,
        })
        .unwrap()
    }

    fn left_white(width: u32, height: u32, split: u32) -> Vec<u8> {
        let mut gray = vec![0u8; (width * height) as usize];
        for y in 0..height {
            for x in 0..split {
                gray[(y * width + x) as usize] = 255;
            }
        }
        gray
    }

    #[test]
    fn uniform_window_is_degenerate() {
        let model = whole_window_model(10, &[0.0]);
        let tables = IntegralTables::new(&vec![90u8; 400], 20, 20).unwrap();
        let cascade = ScaledCascade::new(&model, 10);
        assert_eq!(cascade.score(&tables, 0, 0, 1.0), Verdict::Degenerate);
    }

    #[test]
    fn bright_window_accepted_dark_rejected() {
        // mean / stddev for a binary window grows with the white fraction;
        // a threshold of 1.0 accepts windows that are at least half white.
        let model = whole_window_model(20, &[1.0]);
        let gray = left_white(40, 20, 15);
        let tables = IntegralTables::new(&gray, 40, 20).unwrap();
        let cascade = ScaledCascade::new(&model, 20);

        // Origin 0: 15 of 20 columns white.
        assert_eq!(cascade.score(&tables, 0, 0, 1.0), Verdict::Accepted);
        // Origin 10: 5 of 20 columns white.
        assert_eq!(
            cascade.score(&tables, 10, 0, 1.0),
            Verdict::Rejected { stage: 0 }
        );
    }

    #[test]
    fn rejection_reports_first_failing_stage() {
        let model = whole_window_model(20, &[0.5, 5.0, 0.5]);
        let gray = left_white(40, 20, 15);
        let tables = IntegralTables::new(&gray, 40, 20).unwrap();
        let cascade = ScaledCascade::new(&model, 20);
        assert_eq!(
            cascade.score(&tables, 0, 0, 1.0),
            Verdict::Rejected { stage: 1 }
        );
    }

    #[test]
    fn scaled_rects_stay_inside_window() {
        let model = whole_window_model(24, &[0.0]);
        for size in [5, 24, 29, 37, 100] {
            let cascade = ScaledCascade::new(&model, size);
            for r in &cascade.rects {
                assert!(r.x + r.width <= size, "size {size}: {r:?}");
                assert!(r.y + r.height <= size, "size {size}: {r:?}");
                assert!(r.width >= 1 && r.height >= 1);
            }
        }
    }

    #[test]
    fn zero_size_window_is_degenerate() {
        let model = whole_window_model(10, &[0.0]);
        let gray: Vec<u8> = (0..400).map(|i| (i * 37 % 256) as u8).collect();
        let tables = IntegralTables::new(&gray, 20, 20).unwrap();
        let cascade = ScaledCascade::new(&model, 0);
        assert_eq!(cascade.size(), 0);
        assert_eq!(cascade.score(&tables, 3, 4, 1.0), Verdict::Degenerate);
    }

    #[test]
    fn response_is_scale_invariant() {
        // The same pattern at twice the resolution scores identically.
        let model = whole_window_model(10, &[1.0]);
        let small = left_white(10, 10, 6);
        let large = left_white(20, 20, 12);
        let t_small = IntegralTables::new(&small, 10, 10).unwrap();
        let t_large = IntegralTables::new(&large, 20, 20).unwrap();
        assert_eq!(
            ScaledCascade::new(&model, 10).score(&t_small, 0, 0, 1.0),
            ScaledCascade::new(&model, 20).score(&t_large, 0, 0, 1.0),
        );
    }

    fn random_model() -> impl Strategy<Value = CascadeModel> {
        let feature = (0u32..8, 0u32..8, 1u32..=8, 1u32..=8, -2i32..=2).prop_map(
            |(x, y, w, h, weight)| FeatureDescription {
                x,
                y,
                width: w.min(16 - x),
                height: h.min(16 - y),
                weight,
            },
        );
        let weak = (
            prop::collection::vec(feature, 1..4),
            -1.0f32..1.0,
            -1.0f32..1.0,
            -1.0f32..1.0,
        )
            .prop_map(|(features, threshold, left, right)| WeakClassifierDescription {
                features,
                threshold,
                left,
                right,
            });
        let stage = (prop::collection::vec(weak, 1..4), -1.0f32..1.0).prop_map(
            |(weak_classifiers, threshold)| StageDescription {
                threshold,
                weak_classifiers,
            },
        );
        prop::collection::vec(stage, 1..6).prop_map(|stages| {
            CascadeModel::from_description(&ModelDescription {
                base_size: 16,
                stages,
            })
            .unwrap()
        })
    }

    proptest! {
        #[test]
        fn early_exit_is_consistent_with_stage_prefixes(
            model in random_model(),
            gray in prop::collection::vec(any::<u8>(), 24 * 24),
            x in 0u32..=8,
            y in 0u32..=8,
        ) {
            let tables = IntegralTables::new(&gray, 24, 24).unwrap();
            let cascade = ScaledCascade::new(&model, 16);
            match cascade.score(&tables, x, y, 1.0) {
                Verdict::Rejected { stage } => {
                    // Stages before the rejecting one all passed.
                    prop_assert_eq!(
                        cascade.score_stages(&tables, x, y, 1.0, stage),
                        Verdict::Accepted
                    );
                    // Including the rejecting stage rejects at the same index.
                    for limit in stage + 1..=model.stage_count() {
                        prop_assert_eq!(
                            cascade.score_stages(&tables, x, y, 1.0, limit),
                            Verdict::Rejected { stage }
                        );
                    }
                }
                Verdict::Accepted => {
                    for limit in 0..=model.stage_count() {
                        prop_assert_eq!(
                            cascade.score_stages(&tables, x, y, 1.0, limit),
                            Verdict::Accepted
                        );
                    }
                }
                Verdict::Degenerate => {}
            }
        }
    }
}
