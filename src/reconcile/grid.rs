// src/reconcile/grid.rs

use super::series_key;
use crate::table::{PartitionKey, Record};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{info, warn};

/// Value given to every combination absent from the reconciled rows.
pub const GRID_DEFAULT: f64 = 0.0;

/// Axes of the completed grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridAxes {
    pub series: usize,
    pub regions: usize,
    pub years: usize,
    pub scenarios: usize,
}

impl GridAxes {
    pub fn cells(&self) -> usize {
        self.series * self.regions * self.years * self.scenarios
    }
}

/// Materialize series × `regions` × years × scenarios.
///
/// Series (model, variable, unit, gender, cohort, education), years and
/// scenarios are the distinct values present in `rows`; `regions` is the full
/// region axis. Each cell takes its value from the matching row, or
/// [`GRID_DEFAULT`]. Rows for regions outside the axis are dropped before
/// any axis is built, so they add no series, years or scenarios.
pub fn complete_grid(rows: Vec<Record>, regions: &[String]) -> (Vec<Record>, GridAxes) {
    let series = series_key();
    let region_axis: HashSet<&str> = regions.iter().map(String::as_str).collect();

    let mut outside: BTreeSet<&str> = BTreeSet::new();
    let inside: Vec<&Record> = rows
        .iter()
        .filter(|&r| {
            let keep = region_axis.contains(r.region.as_str());
            if !keep {
                outside.insert(r.region.as_str());
            }
            keep
        })
        .collect();

    let mut templates: BTreeMap<PartitionKey, &Record> = BTreeMap::new();
    let mut years: BTreeSet<i32> = BTreeSet::new();
    let mut scenarios: BTreeSet<&str> = BTreeSet::new();
    for r in &inside {
        templates.entry(series.key_of(*r)).or_insert(*r);
        years.insert(r.year);
        scenarios.insert(r.scenario.as_str());
    }
    let index: HashMap<&PartitionKey, usize> =
        templates.keys().enumerate().map(|(i, k)| (k, i)).collect();

    let mut values: HashMap<(usize, &str, &str, i32), f64> = HashMap::with_capacity(inside.len());
    for r in &inside {
        let series_idx = index[&series.key_of(*r)];
        values.insert((series_idx, r.scenario.as_str(), r.region.as_str(), r.year), r.value);
    }
    if !outside.is_empty() {
        warn!(regions = ?outside, "dropping rows for regions outside the grid");
    }

    let axes = GridAxes {
        series: templates.len(),
        regions: regions.len(),
        years: years.len(),
        scenarios: scenarios.len(),
    };
    info!(?axes, cells = axes.cells(), filled = values.len(), "completing grid");

    let templates: Vec<&Record> = templates.into_values().collect();
    let years: Vec<i32> = years.into_iter().collect();
    let grid: Vec<Record> = templates
        .par_iter()
        .enumerate()
        .flat_map_iter(|(series_idx, template)| {
            let (values, years, scenarios) = (&values, &years, &scenarios);
            scenarios.iter().flat_map(move |scenario| {
                regions.iter().flat_map(move |region| {
                    years.iter().map(move |year| {
                        let value = values
                            .get(&(series_idx, *scenario, region.as_str(), *year))
                            .copied()
                            .unwrap_or(GRID_DEFAULT);
                        Record {
                            scenario: scenario.to_string(),
                            region: region.clone(),
                            year: *year,
                            value,
                            ..(*template).clone()
                        }
                    })
                })
            })
        })
        .collect();

    (grid, axes)
}
