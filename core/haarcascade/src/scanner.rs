//! Multiscale sliding-window scan.

use log::{debug, trace};

use crate::integral::IntegralTables;
use crate::model::CascadeModel;
use crate::scorer::{ScaledCascade, Verdict, Window};

/// A window accepted by every stage of the cascade.
pub type RawHit = Window;

/// Resolved scan geometry for one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanPlan {
    /// Smallest window edge scanned.
    pub min_size: u32,
    /// Largest window edge scanned; clamped to the shorter image side.
    pub max_size: u32,
    /// Factor between consecutive window sizes.
    pub scale_step: f64,
    /// Stride divisor, see [`stride_for`].
    pub sweep_delta: f64,
    /// Windows with variance below this are skipped.
    pub variance_floor: f64,
}

/// Geometrically spaced window sizes from `min_size` up to `max_size`.
///
/// Sizes are `floor(min_size · scale_step^k)`; values that do not strictly
/// increase after flooring are skipped, so the result is strictly increasing.
pub fn window_sizes(min_size: u32, max_size: u32, scale_step: f64) -> Vec<u32> {
    let mut sizes = Vec::new();
    if min_size == 0 || !(scale_step > 1.0) || !scale_step.is_finite() {
        return sizes;
    }
    let mut size = min_size as f64;
    while size <= max_size as f64 {
        let edge = size.floor() as u32;
        if sizes.last().map_or(true, |&last| edge > last) {
            sizes.push(edge);
        }
        size *= scale_step;
    }
    sizes
}

/// Position stride for a window size: `round(size / sweep_delta)`, at least one pixel.
pub fn stride_for(size: u32, sweep_delta: f64) -> u32 {
    ((size as f64 / sweep_delta).round() as u32).max(1)
}

/// Evaluate the cascade at every scale and position of the plan.
///
/// Hits are ordered by scale, then row, then column.
pub fn scan(tables: &IntegralTables, model: &CascadeModel, plan: &ScanPlan) -> Vec<RawHit> {
    let (width, height) = (tables.width(), tables.height());
    let max_size = plan.max_size.min(width).min(height);
    let sizes = window_sizes(plan.min_size, max_size, plan.scale_step);

    let mut hits = Vec::new();
    let mut evaluated = 0usize;
    for &size in &sizes {
        let cascade = ScaledCascade::new(model, size);
        let stride = stride_for(size, plan.sweep_delta) as usize;

        let mut windows = 0usize;
        let mut degenerate = 0usize;
        let before = hits.len();
        for y in (0..=height - size).step_by(stride) {
            for x in (0..=width - size).step_by(stride) {
                windows += 1;
                match cascade.score(tables, x, y, plan.variance_floor) {
                    Verdict::Accepted => hits.push(Window { x, y, size }),
                    Verdict::Degenerate => degenerate += 1,
                    Verdict::Rejected { .. } => {}
                }
            }
        }
        evaluated += windows;
        trace!(
            "size {size}: stride {stride}, {windows} windows, {degenerate} degenerate, {} hits",
            hits.len() - before
        );
    }

    debug!(
        "scanned {width}x{height} at {} scales: {evaluated} windows, {} raw hits",
        sizes.len(),
        hits.len()
    );
    hits
}
