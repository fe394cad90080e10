// src/interpolate/cohort.rs

use crate::table::{Record, Table};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Separator between the components of a composite demographic variable.
pub const VARIABLE_DELIMITER: char = '|';

/// A total whose leaf cohorts do not add up at one year.
#[derive(Debug, Clone, PartialEq)]
pub struct CohortViolation {
    pub model: String,
    pub scenario: String,
    pub region: String,
    pub year: i32,
    pub total_variable: String,
    pub total: f64,
    pub leaf_sum: f64,
}

/// Every proper prefix of `variable` ending before a delimiter,
/// e.g. `Population` and `Population|Male` for `Population|Male|Aged0-4`.
fn ancestors(variable: &str) -> impl Iterator<Item = &str> {
    variable
        .match_indices(VARIABLE_DELIMITER)
        .map(move |(i, _)| &variable[..i])
}

/// Compare each total row with the sum of its leaf descendants, per
/// (model, scenario, region, year). `tolerance` is relative to the total
/// (absolute below 1.0).
pub fn check_cohort_consistency(table: &Table<Record>, tolerance: f64) -> Vec<CohortViolation> {
    let mut snapshots: BTreeMap<(&str, &str, &str, i32), Vec<&Record>> = BTreeMap::new();
    for r in table.iter() {
        snapshots
            .entry((r.model.as_str(), r.scenario.as_str(), r.region.as_str(), r.year))
            .or_default()
            .push(r);
    }
    let snapshots: Vec<_> = snapshots.into_iter().collect();

    snapshots
        .par_iter()
        .flat_map_iter(|((model, scenario, region, year), rows)| {
            let present: HashMap<&str, f64> =
                rows.iter().map(|r| (r.variable.as_str(), r.value)).collect();
            let parents: HashSet<&str> = present.keys().flat_map(|v| ancestors(v)).collect();

            let mut leaf_sums: HashMap<&str, f64> = HashMap::new();
            for (variable, value) in present.iter().filter(|(v, _)| !parents.contains(*v)) {
                for parent in ancestors(variable).filter(|p| present.contains_key(p)) {
                    *leaf_sums.entry(parent).or_default() += value;
                }
            }

            let mut found: Vec<CohortViolation> = leaf_sums
                .into_iter()
                .filter_map(|(parent, leaf_sum)| {
                    let total = present[parent];
                    let allowed = tolerance * total.abs().max(1.0);
                    ((total - leaf_sum).abs() > allowed).then(|| CohortViolation {
                        model: model.to_string(),
                        scenario: scenario.to_string(),
                        region: region.to_string(),
                        year: *year,
                        total_variable: parent.to_string(),
                        total,
                        leaf_sum,
                    })
                })
                .collect();
            found.sort_by(|a, b| a.total_variable.cmp(&b.total_variable));
            found.into_iter()
        })
        .collect()
}
