// src/interpolate/mod.rs

//! Densification of sparse snapshot series into annual series.

pub mod beers;
pub mod cohort;
pub mod spline;

pub use beers::interpolate_beers;
pub use cohort::{check_cohort_consistency, CohortViolation};
pub use spline::{interpolate_spline, CubicSpline, SplineMethod};

use crate::error::{EngineError, Result};
use crate::table::{partition, GroupKey, Observation, PartitionKey, Table};
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::trace;

/// Sorted, finite (year, value) points of one partition, plus the row that
/// observed each year.
struct Snapshot<'a, R> {
    points: Vec<(i32, f64)>,
    observed: HashMap<i32, &'a R>,
}

/// Collect a partition's usable points. Non-finite values are dropped;
/// a repeated year is a defect and rejected.
fn snapshot<'a, R: Observation>(key: &PartitionKey, rows: &[&'a R]) -> Result<Snapshot<'a, R>> {
    let mut observed: HashMap<i32, &'a R> = HashMap::with_capacity(rows.len());
    for row in rows.iter().copied().filter(|r| r.value().is_finite()) {
        if observed.insert(row.year(), row).is_some() {
            return Err(EngineError::DuplicateYear {
                key: key.to_string(),
                year: row.year(),
            });
        }
    }
    let mut points: Vec<(i32, f64)> = observed.iter().map(|(y, r)| (*y, r.value())).collect();
    points.sort_by_key(|(y, _)| *y);
    Ok(Snapshot { points, observed })
}

/// Run `densify` over every partition of `table` in parallel.
///
/// `densify` receives at least two sorted points and must return one value
/// per integer year from the first to the last point. Observed years keep
/// their original row; gap years are cloned from the first observed row.
/// Partitions with a single usable point pass through unchanged.
pub(crate) fn densify_partitions<R, F>(table: &Table<R>, key: &GroupKey, densify: F) -> Result<Table<R>>
where
    R: Observation + Clone + Send + Sync,
    F: Fn(&PartitionKey, &[(i32, f64)]) -> Vec<(i32, f64)> + Sync,
{
    let parts: Vec<(PartitionKey, Vec<&R>)> = partition(table.rows(), key).into_iter().collect();

    let dense: Vec<Vec<R>> = parts
        .par_iter()
        .map(|(pk, rows)| {
            let snap = snapshot(pk, rows)?;
            if snap.points.len() < 2 {
                trace!(partition = %pk, points = snap.points.len(), "passing through");
                return Ok(snap.points.iter().map(|(y, _)| snap.observed[y].clone()).collect());
            }
            let template = snap.observed[&snap.points[0].0];
            let out = densify(pk, &snap.points)
                .into_iter()
                .map(|(year, value)| match snap.observed.get(&year) {
                    Some(row) => (*row).clone(),
                    None => template.with_point(year, value),
                })
                .collect();
            Ok(out)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(dense.into_iter().flatten().collect())
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::table::{Record, Table};

    pub fn series(variable: &str, points: &[(i32, f64)]) -> Vec<Record> {
        points
            .iter()
            .map(|(y, v)| Record::new("M", "SSP2", "FRA", variable, "million", *y, *v))
            .collect()
    }

    pub fn values_of(table: &Table, variable: &str) -> Vec<(i32, f64)> {
        table
            .iter()
            .filter(|r| r.variable == variable)
            .map(|r| (r.year, r.value))
            .collect()
    }
}
