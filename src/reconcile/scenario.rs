// src/reconcile/scenario.rs

use super::reconcile_key;
use crate::table::{keyed_merge, ConflictPolicy, Record};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Broadcast `baseline` rows to every other scenario present.
///
/// A scenario's own row for the same (model, region, variable, unit, gender,
/// cohort, education, year) always wins over the baseline copy. Baseline rows
/// are not returned.
pub fn expand_baseline(rows: Vec<Record>, baseline: &str) -> Vec<Record> {
    let (seed, existing): (Vec<Record>, Vec<Record>) =
        rows.into_iter().partition(|r| r.scenario == baseline);

    let scenarios: BTreeSet<String> = existing.iter().map(|r| r.scenario.clone()).collect();
    if scenarios.is_empty() {
        warn!(baseline, "no scenarios besides the baseline; nothing to expand into");
        return Vec::new();
    }

    let broadcast: Vec<Record> = scenarios
        .iter()
        .flat_map(|s| {
            seed.iter().map(move |r| Record {
                scenario: s.clone(),
                ..r.clone()
            })
        })
        .collect();

    info!(
        seed = seed.len(),
        scenarios = scenarios.len(),
        existing = existing.len(),
        "expanding baseline scenario"
    );
    keyed_merge(existing, broadcast, &reconcile_key(), ConflictPolicy::KeepLeft)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::BASELINE_SCENARIO;

    fn row(scenario: &str, year: i32, value: f64) -> Record {
        Record::new("OECD", scenario, "FRA", "GDP|PPP", "bn", year, value)
    }

    #[test]
    fn baseline_fills_gaps_without_overwriting() {
        let rows = vec![
            row(BASELINE_SCENARIO, 2015, 1.0),
            row(BASELINE_SCENARIO, 2020, 2.0),
            row("SSP1", 2020, 20.0),
            row("SSP1", 2025, 25.0),
            row("SSP2", 2025, 35.0),
        ];
        let out = expand_baseline(rows, BASELINE_SCENARIO);
        let got: Vec<(&str, i32, f64)> = out.iter().map(|r| (r.scenario.as_str(), r.year, r.value)).collect();
        assert_eq!(
            got,
            vec![
                ("SSP1", 2015, 1.0),
                ("SSP1", 2020, 20.0),
                ("SSP1", 2025, 25.0),
                ("SSP2", 2015, 1.0),
                ("SSP2", 2020, 2.0),
                ("SSP2", 2025, 35.0),
            ]
        );
    }

    #[test]
    fn baseline_only_input_yields_nothing() {
        assert!(expand_baseline(vec![row(BASELINE_SCENARIO, 2020, 1.0)], BASELINE_SCENARIO).is_empty());
    }
}
