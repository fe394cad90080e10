// src/reconcile/mod.rs

//! Merge of the spline and Beers outputs into one dense, labelled table.

pub mod decompose;
pub mod grid;
pub mod labels;
pub mod policy;
pub mod rescale;
pub mod scenario;

pub use decompose::decompose;
pub use grid::{complete_grid, GridAxes, GRID_DEFAULT};
pub use labels::{array_name, ArrayGroup, CohortLabel, LabelDictionaries, SENTINEL_LABEL};
pub use policy::TotalRowPolicy;
pub use rescale::RescaleTable;
pub use scenario::expand_baseline;

use crate::aggregate::Correspondence;
use crate::error::{EngineError, Result};
use crate::table::{Field, GroupKey, Observation, Record, Table};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Scenario whose rows seed every other scenario.
pub const BASELINE_SCENARIO: &str = "Historical Reference";

/// Identity of one reconciled cell, minus the year.
pub const RECONCILE_FIELDS: [Field; 8] = [
    Field::Model,
    Field::Scenario,
    Field::Region,
    Field::Variable,
    Field::Unit,
    Field::Gender,
    Field::Cohort,
    Field::Education,
];

/// Identity of a series independent of scenario and region.
pub const SERIES_FIELDS: [Field; 6] = [
    Field::Model,
    Field::Variable,
    Field::Unit,
    Field::Gender,
    Field::Cohort,
    Field::Education,
];

pub fn reconcile_key() -> GroupKey {
    GroupKey::fixed(&RECONCILE_FIELDS)
}

pub fn series_key() -> GroupKey {
    GroupKey::fixed(&SERIES_FIELDS)
}

/// A dense, labelled output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledRecord {
    pub model: String,
    pub scenario: String,
    pub region: String,
    pub variable: String,
    pub unit: String,
    pub gender: Option<String>,
    pub cohort: Option<String>,
    pub education: Option<String>,
    pub gender_label: String,
    pub cohort_label: String,
    pub education_label: String,
    /// Output array this row belongs to.
    pub array: String,
    pub year: i32,
    pub value: f64,
}

impl Observation for ReconciledRecord {
    fn field(&self, field: Field) -> Option<&str> {
        match field {
            Field::Model => Some(&self.model),
            Field::Scenario => Some(&self.scenario),
            Field::Region => Some(&self.region),
            Field::Variable => Some(&self.variable),
            Field::Unit => Some(&self.unit),
            Field::Gender => self.gender.as_deref(),
            Field::Cohort => self.cohort.as_deref(),
            Field::Education => self.education.as_deref(),
            Field::Year | Field::Value => None,
        }
    }

    fn year(&self) -> i32 {
        self.year
    }

    fn value(&self) -> f64 {
        self.value
    }

    fn with_point(&self, year: i32, value: f64) -> Self {
        Self {
            year,
            value,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOptions {
    pub baseline_scenario: String,
    pub labels: LabelDictionaries,
    pub rescale: RescaleTable,
    pub arrays: Vec<ArrayGroup>,
    /// Applied to the decomposed Beers rows when set.
    pub total_row_policy: Option<TotalRowPolicy>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            baseline_scenario: BASELINE_SCENARIO.to_string(),
            labels: LabelDictionaries::default(),
            rescale: RescaleTable::default(),
            arrays: ArrayGroup::defaults(),
            total_row_policy: None,
        }
    }
}

/// Combine interpolated outputs into exactly one row per
/// (series, region, year, scenario).
///
/// Beers rows are decomposed into their demographic components, the baseline
/// scenario is broadcast into every other scenario, the grid is completed
/// over every region code of `correspondence`, and labels, array names and
/// rescale factors are joined on.
#[instrument(level = "info", skip_all, fields(spline = spline_out.len(), beers = beers_out.len()))]
pub fn reconcile(
    spline_out: &Table<Record>,
    beers_out: &Table<Record>,
    correspondence: &Correspondence,
    opts: &ReconcileOptions,
) -> Result<Table<ReconciledRecord>> {
    if opts.baseline_scenario.trim().is_empty() {
        return Err(EngineError::Configuration(
            "baseline scenario must not be empty".into(),
        ));
    }
    let regions = region_axis(correspondence)?;

    let mut demographic: Vec<Record> = beers_out.rows().par_iter().map(decompose).collect();
    if let Some(policy) = &opts.total_row_policy {
        demographic = policy.apply(demographic, &opts.baseline_scenario);
    }

    let mut rows = spline_out.rows().to_vec();
    rows.extend(demographic);

    let expanded = expand_baseline(rows, &opts.baseline_scenario);
    let (grid, axes) = complete_grid(expanded, &regions);

    let out: Vec<ReconciledRecord> = grid.into_par_iter().map(|r| label(r, opts)).collect();
    info!(rows = out.len(), cells = axes.cells(), "reconciled");
    Ok(Table::new(out))
}

fn region_axis(correspondence: &Correspondence) -> Result<Vec<String>> {
    let regions = correspondence.region_codes();
    if regions.is_empty() {
        return Err(EngineError::Configuration(
            "correspondence table defines no target regions".into(),
        ));
    }
    Ok(regions)
}

fn label(r: Record, opts: &ReconcileOptions) -> ReconciledRecord {
    let labels = &opts.labels;
    let gender_label = labels.gender_label(r.gender.as_deref()).to_string();
    let cohort_label = labels.cohort_label(r.cohort.as_deref()).to_string();
    let education_label = labels
        .education_label(r.education.as_deref(), r.cohort.as_deref())
        .to_string();
    let array = array_name(&opts.arrays, &r.model, &r.variable).to_string();
    let value = opts.rescale.apply(&r.variable, r.value);

    ReconciledRecord {
        model: r.model,
        scenario: r.scenario,
        region: r.region,
        variable: r.variable,
        unit: r.unit,
        gender: r.gender,
        cohort: r.cohort,
        education: r.education,
        gender_label,
        cohort_label,
        education_label,
        array,
        year: r.year,
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::correspondence::test_support::row;
    use std::collections::HashSet;

    fn correspondence() -> Correspondence {
        Correspondence::new(vec![
            row(1, "fra", "xfr", "France"),
            row(2, "deu", "xde", "Germany"),
        ])
    }

    fn gdp(scenario: &str, region: &str, year: i32, value: f64) -> Record {
        Record::new("IIASA GDP 2023", scenario, region, "GDP|PPP", "billion US$2017/yr", year, value)
    }

    fn pop(scenario: &str, variable: &str, year: i32, value: f64) -> Record {
        Record::new("WiC", scenario, "fra", variable, "million", year, value)
    }

    #[test]
    fn grid_is_complete_with_one_row_per_cell() {
        let spline = Table::new(vec![
            gdp(BASELINE_SCENARIO, "fra", 2019, 1.0),
            gdp("SSP1", "fra", 2020, 2.0),
            gdp("SSP2", "deu", 2020, 3.0),
        ]);
        let beers = Table::new(vec![pop("SSP2", "Population|Male|Aged20-24|Bachelor", 2020, 0.5)]);

        let out = reconcile(&spline, &beers, &correspondence(), &ReconcileOptions::default()).unwrap();

        // 2 series × 2 regions × 2 years × 2 scenarios
        assert_eq!(out.len(), 16);
        let cells: HashSet<(String, String, String, i32)> = out
            .iter()
            .map(|r| (r.array.clone(), r.scenario.clone(), r.region.clone(), r.year))
            .collect();
        assert_eq!(cells.len(), out.len());
        assert!(out.iter().all(|r| r.value.is_finite()));
        assert!(out.iter().all(|r| r.scenario != BASELINE_SCENARIO));
    }

    #[test]
    fn scenario_rows_win_over_baseline_and_values_are_rescaled() {
        let spline = Table::new(vec![
            gdp(BASELINE_SCENARIO, "fra", 2020, 1.0),
            gdp("SSP1", "fra", 2020, 2.0),
            gdp("SSP2", "fra", 2021, 4.0),
        ]);
        let out = reconcile(&spline, &Table::default(), &correspondence(), &ReconcileOptions::default()).unwrap();
        let value = |s: &str, y: i32| {
            out.iter()
                .find(|r| r.scenario == s && r.region == "fra" && r.year == y)
                .map(|r| r.value)
        };
        assert_eq!(value("SSP1", 2020), Some(2000.0));
        assert_eq!(value("SSP2", 2020), Some(1000.0));
        assert_eq!(value("SSP2", 2021), Some(4000.0));
        assert_eq!(value("SSP1", 2021), Some(0.0));
    }

    #[test]
    fn labels_and_arrays_are_joined() {
        let beers = Table::new(vec![
            pop("SSP2", "Population|Female|Aged5-9", 2020, 1.0),
            pop("SSP2", "Population|Male|Aged30-34|Master and higher", 2020, 2.0),
        ]);
        let out = reconcile(&Table::default(), &beers, &correspondence(), &ReconcileOptions::default()).unwrap();
        let child = out
            .iter()
            .find(|r| r.cohort.as_deref() == Some("Aged5-9") && r.region == "fra")
            .unwrap();
        assert_eq!(child.array, "POP");
        assert_eq!(child.variable, "Population");
        assert_eq!(
            (child.gender_label.as_str(), child.cohort_label.as_str(), child.education_label.as_str()),
            ("FEML", "A0509", "U15")
        );
        let adult = out
            .iter()
            .find(|r| r.cohort.as_deref() == Some("Aged30-34") && r.region == "fra")
            .unwrap();
        assert_eq!(adult.education_label, "MAST");
        assert_eq!(adult.value, 2.0);
    }

    #[test]
    fn total_row_policy_drops_adult_totals() {
        let beers = Table::new(vec![
            pop("SSP2", "Population|Male|Aged30-34", 2020, 5.0),
            pop("SSP2", "Population|Male|Aged30-34|Bachelor", 2020, 2.0),
        ]);
        let opts = ReconcileOptions {
            total_row_policy: Some(TotalRowPolicy::default()),
            ..ReconcileOptions::default()
        };
        let out = reconcile(&Table::default(), &beers, &correspondence(), &opts).unwrap();
        assert!(out.iter().all(|r| r.education.is_some()));
    }

    #[test]
    fn total_row_policy_keeps_totals_of_a_custom_baseline() {
        let beers = Table::new(vec![
            pop("History", "Population|Male|Aged30-34", 2015, 5.0),
            pop("SSP2", "Population|Male|Aged30-34", 2020, 8.0),
            pop("SSP2", "Population|Male|Aged30-34|Bachelor", 2020, 2.0),
        ]);
        let opts = ReconcileOptions {
            baseline_scenario: "History".into(),
            total_row_policy: Some(TotalRowPolicy::default()),
            ..ReconcileOptions::default()
        };
        let out = reconcile(&Table::default(), &beers, &correspondence(), &opts).unwrap();
        let total_at = |year: i32| {
            out.iter()
                .find(|r| r.region == "fra" && r.education.is_none() && r.year == year)
                .map(|r| (r.scenario.as_str(), r.value))
        };
        assert_eq!(total_at(2015), Some(("SSP2", 5.0)));
        assert_eq!(total_at(2020), Some(("SSP2", 0.0)));
    }

    #[test]
    fn empty_region_axis_is_a_configuration_error() {
        let err = reconcile(
            &Table::new(vec![gdp("SSP1", "fra", 2020, 1.0)]),
            &Table::default(),
            &Correspondence::new(vec![]),
            &ReconcileOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }
}
