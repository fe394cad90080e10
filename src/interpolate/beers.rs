// src/interpolate/beers.rs

//! Beers ordinary six-point interpolation along the time axis.
//!
//! Snapshots five years apart are treated as pivotal values; the four
//! intermediate years of every interval are weighted sums of six neighbouring
//! pivots. The first two and last two intervals use the boundary panels (the
//! tail mirrored), so no extrapolation is needed. Every row of the table
//! reproduces polynomials up to degree four, and pivots are returned
//! unchanged. The operator is linear in the data, so cohorts sharing the same
//! snapshot years sum exactly to a total interpolated the same way.

use super::{densify_partitions, spline};
use crate::error::Result;
use crate::table::{GroupKey, Observation, Table};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, instrument};

/// Spacing between snapshots the coefficients are built for.
pub const BEERS_STEP: i32 = 5;

/// Pivots spanned by one coefficient row.
pub const BEERS_WINDOW: usize = 6;

/// First interval, positions 0.2 .. 0.8 from the first pivot.
const FIRST_PANEL: [[f64; 6]; 4] = [
    [0.6667, 0.4969, -0.1426, -0.1006, 0.1079, -0.0283],
    [0.4072, 0.8344, -0.2336, -0.0976, 0.1224, -0.0328],
    [0.2148, 1.0204, -0.2456, -0.0536, 0.0884, -0.0244],
    [0.0819, 1.0689, -0.1666, -0.0126, 0.0399, -0.0115],
];

/// Second interval, positions 1.2 .. 1.8.
const SECOND_PANEL: [[f64; 6]; 4] = [
    [-0.0404, 0.8404, 0.2344, -0.0216, -0.0196, 0.0068],
    [-0.0497, 0.6229, 0.5014, -0.0646, -0.0181, 0.0081],
    [-0.0389, 0.3849, 0.7534, -0.1006, -0.0041, 0.0053],
    [-0.0191, 0.1659, 0.9354, -0.0906, 0.0069, 0.0015],
];

/// Interior intervals, positions 2.2 .. 2.8 of a window starting two pivots back.
const MIDDLE_PANEL: [[f64; 6]; 4] = [
    [0.0117, -0.0921, 0.9234, 0.1854, -0.0311, 0.0027],
    [0.0137, -0.1101, 0.7194, 0.4454, -0.0771, 0.0087],
    [0.0087, -0.0771, 0.4454, 0.7194, -0.1101, 0.0137],
    [0.0027, -0.0311, 0.1854, 0.9234, -0.0921, 0.0117],
];

/// True when `points` are at least [`BEERS_WINDOW`] snapshots exactly
/// [`BEERS_STEP`] years apart.
pub fn beers_applicable(points: &[(i32, f64)]) -> bool {
    points.len() >= BEERS_WINDOW && points.windows(2).all(|w| w[1].0 - w[0].0 == BEERS_STEP)
}

/// Value `sub` fifths past pivot `interval` (1 ≤ sub ≤ 4).
fn beers_point(pivots: &[f64], interval: usize, sub: usize) -> f64 {
    let n = pivots.len();
    let weigh = |row: &[f64; 6], start: usize| -> f64 {
        row.iter().zip(&pivots[start..start + 6]).map(|(c, v)| c * v).sum()
    };
    let weigh_tail = |row: &[f64; 6]| -> f64 {
        row.iter().enumerate().map(|(k, c)| c * pivots[n - 1 - k]).sum()
    };

    if interval == 0 {
        weigh(&FIRST_PANEL[sub - 1], 0)
    } else if interval == 1 {
        weigh(&SECOND_PANEL[sub - 1], 0)
    } else if interval + 4 <= n {
        weigh(&MIDDLE_PANEL[sub - 1], interval - 2)
    } else if interval == n - 3 {
        weigh_tail(&SECOND_PANEL[4 - sub])
    } else {
        weigh_tail(&FIRST_PANEL[4 - sub])
    }
}

/// Annual values over an equally spaced 5-year snapshot series.
/// Caller must check [`beers_applicable`] first.
pub(crate) fn densify(points: &[(i32, f64)]) -> Vec<(i32, f64)> {
    let pivots: Vec<f64> = points.iter().map(|p| p.1).collect();
    let mut out = Vec::with_capacity((points.len() - 1) * BEERS_STEP as usize + 1);
    for (interval, (year, value)) in points.iter().enumerate() {
        out.push((*year, *value));
        if interval + 1 == points.len() {
            break;
        }
        for sub in 1..BEERS_STEP as usize {
            out.push((*year + sub as i32, beers_point(&pivots, interval, sub)));
        }
    }
    out
}

/// Densify demographic series with Beers coefficients, falling back to the
/// default spline for partitions too short or irregular for the window.
#[instrument(level = "info", skip(table, key), fields(rows = table.len()))]
pub fn interpolate_beers<R>(table: &Table<R>, key: &GroupKey) -> Result<Table<R>>
where
    R: Observation + Clone + Send + Sync,
{
    let beers = AtomicUsize::new(0);
    let fallback = AtomicUsize::new(0);

    let out = densify_partitions(table, key, |pk, points| {
        if beers_applicable(points) {
            beers.fetch_add(1, Ordering::Relaxed);
            densify(points)
        } else {
            debug!(partition = %pk, points = points.len(), "beers window not met, using spline");
            fallback.fetch_add(1, Ordering::Relaxed);
            spline::densify(points, spline::SplineMethod::default())
        }
    })?;

    info!(
        beers = beers.load(Ordering::Relaxed),
        spline_fallback = fallback.load(Ordering::Relaxed),
        rows_out = out.len(),
        "beers interpolation done"
    );
    Ok(out)
}
