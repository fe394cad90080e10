// src/reconcile/rescale.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fixed multipliers keyed on the variable label. Variables not listed are
/// left as they are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RescaleTable(pub BTreeMap<String, f64>);

impl Default for RescaleTable {
    /// GDP is published in billion US$; the model expects million.
    fn default() -> Self {
        Self(BTreeMap::from([("GDP|PPP".to_string(), 1000.0)]))
    }
}

impl RescaleTable {
    pub fn factor(&self, variable: &str) -> f64 {
        self.0.get(variable).copied().unwrap_or(1.0)
    }

    pub fn apply(&self, variable: &str, value: f64) -> f64 {
        value * self.factor(variable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_only_listed_variables() {
        let t = RescaleTable::default();
        assert_eq!(t.apply("GDP|PPP", 2.5), 2500.0);
        assert_eq!(t.apply("Population", 2.5), 2.5);
    }
}
