// src/reconcile/labels.rs

//! Static code → label dictionaries joined onto reconciled rows.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label used for unset or unmapped codes.
pub const SENTINEL_LABEL: &str = "TOTL";

/// Display label of an age cohort plus its broad age group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortLabel {
    pub label: String,
    /// Education label used for this cohort's education totals in place of
    /// the sentinel (e.g. children, who have no education breakdown).
    #[serde(default)]
    pub broad_group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelDictionaries {
    pub gender: BTreeMap<String, String>,
    pub education: BTreeMap<String, String>,
    pub cohort: BTreeMap<String, CohortLabel>,
}

impl Default for LabelDictionaries {
    fn default() -> Self {
        let gender = [("Male", "MALE"), ("Female", "FEML")];
        let education = [
            ("No Education", "NOED"),
            ("Incomplete Primary", "INPR"),
            ("Primary", "PRIM"),
            ("Primary Education", "PRIM"),
            ("Lower Secondary", "LSEC"),
            ("Upper Secondary", "USEC"),
            ("Secondary Education", "SECO"),
            ("Post Secondary", "PSEC"),
            ("Short Post Secondary", "SPSC"),
            ("Bachelor", "BACH"),
            ("Master and higher", "MAST"),
            ("Tertiary Education", "TERT"),
        ];

        let mut cohort: BTreeMap<String, CohortLabel> = (0..100)
            .step_by(5)
            .map(|lo| {
                let broad_group = (lo < 15).then(|| "U15".to_string());
                (
                    format!("Aged{}-{}", lo, lo + 4),
                    CohortLabel {
                        label: format!("A{:02}{:02}", lo, lo + 4),
                        broad_group,
                    },
                )
            })
            .collect();
        cohort.insert(
            "Aged100+".into(),
            CohortLabel {
                label: "A100".into(),
                broad_group: None,
            },
        );

        Self {
            gender: to_map(&gender),
            education: to_map(&education),
            cohort,
        }
    }
}

fn to_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl LabelDictionaries {
    pub fn gender_label(&self, code: Option<&str>) -> &str {
        code.and_then(|c| self.gender.get(c))
            .map_or(SENTINEL_LABEL, String::as_str)
    }

    pub fn cohort_label(&self, code: Option<&str>) -> &str {
        code.and_then(|c| self.cohort.get(c))
            .map_or(SENTINEL_LABEL, |c| c.label.as_str())
    }

    /// Mapped education label; otherwise the cohort's broad group, then the sentinel.
    pub fn education_label(&self, code: Option<&str>, cohort: Option<&str>) -> &str {
        if let Some(label) = code.and_then(|c| self.education.get(c)) {
            return label;
        }
        cohort
            .and_then(|c| self.cohort.get(c))
            .and_then(|c| c.broad_group.as_deref())
            .unwrap_or(SENTINEL_LABEL)
    }
}

/// One named output array: rows of `variable` (optionally of one `model`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayGroup {
    pub name: String,
    pub description: String,
    pub variable: String,
    #[serde(default)]
    pub model: Option<String>,
}

impl ArrayGroup {
    pub fn matches(&self, model: &str, variable: &str) -> bool {
        self.variable == variable && self.model.as_deref().map_or(true, |m| m == model)
    }

    /// Population plus one GDP array per projection source.
    pub fn defaults() -> Vec<ArrayGroup> {
        vec![
            ArrayGroup {
                name: "POP".into(),
                description: "Population by age, gender and education (million)".into(),
                variable: "Population".into(),
                model: None,
            },
            ArrayGroup {
                name: "GDPO".into(),
                description: "GDP|PPP, OECD projections (million US$2017)".into(),
                variable: "GDP|PPP".into(),
                model: Some("OECD ENV-Growth 2023".into()),
            },
            ArrayGroup {
                name: "GDPI".into(),
                description: "GDP|PPP, IIASA projections (million US$2017)".into(),
                variable: "GDP|PPP".into(),
                model: Some("IIASA GDP 2023".into()),
            },
        ]
    }
}

/// Name of the first array matching (model, variable), else the variable itself.
pub fn array_name<'a>(arrays: &'a [ArrayGroup], model: &str, variable: &'a str) -> &'a str {
    arrays
        .iter()
        .find(|a| a.matches(model, variable))
        .map_or(variable, |a| a.name.as_str())
}
