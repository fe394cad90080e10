// src/reconcile/policy.rs

use crate::table::Record;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which education-total rows of the demographic series survive.
///
/// A total row is a decomposed demographic row without an education
/// component. It is kept when it belongs to the run's baseline scenario (unless
/// `keep_baseline` is off), when its scenario is listed, or when its cohort is
/// listed. All other totals are dropped so the education dimension is not
/// counted twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TotalRowPolicy {
    pub keep_baseline: bool,
    /// Scenarios kept in addition to the baseline.
    pub keep_scenarios: Vec<String>,
    pub keep_cohorts: Vec<String>,
}

impl Default for TotalRowPolicy {
    fn default() -> Self {
        Self {
            keep_baseline: true,
            keep_scenarios: Vec::new(),
            keep_cohorts: vec!["Aged0-4".into(), "Aged5-9".into(), "Aged10-14".into()],
        }
    }
}

impl TotalRowPolicy {
    pub fn is_total(record: &Record) -> bool {
        record.education.is_none()
    }

    pub fn keeps(&self, record: &Record, baseline: &str) -> bool {
        !Self::is_total(record)
            || (self.keep_baseline && record.scenario == baseline)
            || self.keep_scenarios.iter().any(|s| *s == record.scenario)
            || record
                .cohort
                .as_ref()
                .is_some_and(|c| self.keep_cohorts.contains(c))
    }

    pub fn apply(&self, rows: Vec<Record>, baseline: &str) -> Vec<Record> {
        let before = rows.len();
        let kept: Vec<Record> = rows.into_iter().filter(|r| self.keeps(r, baseline)).collect();
        debug!(dropped = before - kept.len(), baseline, "total-row policy applied");
        kept
    }
}
