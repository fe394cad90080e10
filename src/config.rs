// src/config.rs

//! YAML pipeline configuration.
//!
//! Every field has a default, so an empty document is a valid configuration
//! apart from the input locations.

use crate::aggregate::RegionLevel;
use crate::interpolate::SplineMethod;
use crate::reconcile::{
    ArrayGroup, LabelDictionaries, ReconcileOptions, RescaleTable, TotalRowPolicy, BASELINE_SCENARIO,
};
use crate::table::{GroupKey, DEFAULT_GROUP_FIELDS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What the pipeline emits for each reconciled series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    #[default]
    Levels,
    /// Year-on-year growth in percent.
    GrowthRates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Glob patterns of `.zip` archives or wide `.csv` files.
    pub archives: Vec<String>,
    pub correspondence: PathBuf,
    pub agg_override: Option<PathBuf>,
    /// Only this section of the override file is read when set.
    pub agg_section: Option<String>,
    pub region_level: RegionLevel,
    pub group_fields: Vec<String>,
    pub spline_method: SplineMethod,
    /// Variables under this prefix go through the Beers interpolator.
    pub demographic_prefix: String,
    pub baseline_scenario: String,
    pub total_row_policy: Option<TotalRowPolicy>,
    pub rescale: RescaleTable,
    pub labels: LabelDictionaries,
    pub arrays: Vec<ArrayGroup>,
    pub cohort_tolerance: f64,
    pub variant: Variant,
    pub threads: Option<usize>,
    pub output: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            archives: Vec::new(),
            correspondence: PathBuf::from("correspondence.csv"),
            agg_override: None,
            agg_section: None,
            region_level: RegionLevel::default(),
            group_fields: DEFAULT_GROUP_FIELDS.iter().map(|f| f.to_string()).collect(),
            spline_method: SplineMethod::default(),
            demographic_prefix: "Population|".to_string(),
            baseline_scenario: BASELINE_SCENARIO.to_string(),
            total_row_policy: None,
            rescale: RescaleTable::default(),
            labels: LabelDictionaries::default(),
            arrays: ArrayGroup::defaults(),
            cohort_tolerance: 1e-6,
            variant: Variant::default(),
            threads: None,
            output: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("Failed to parse pipeline config YAML")
    }

    /// Load a config file. Relative input and output paths are resolved
    /// against the file's directory.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let mut config = Self::from_yaml_str(&text)
            .with_context(|| format!("Invalid config file: {:?}", path))?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            config.resolve_relative_to(dir);
        }
        Ok(config)
    }

    fn resolve_relative_to(&mut self, dir: &Path) {
        let resolve = |p: &Path| if p.is_relative() { dir.join(p) } else { p.to_path_buf() };
        self.archives = self
            .archives
            .iter()
            .map(|a| resolve(Path::new(a)).display().to_string())
            .collect();
        self.correspondence = resolve(&self.correspondence);
        self.agg_override = self.agg_override.as_deref().map(resolve);
        self.output = self.output.as_deref().map(resolve);
    }

    pub fn group_key(&self) -> crate::error::Result<GroupKey> {
        GroupKey::parse(&self.group_fields)
    }

    /// `true` for variables handled by the Beers interpolator.
    pub fn is_demographic(&self, variable: &str) -> bool {
        let prefix = self.demographic_prefix.as_str();
        variable.starts_with(prefix) || variable == prefix.trim_end_matches('|')
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            baseline_scenario: self.baseline_scenario.clone(),
            labels: self.labels.clone(),
            rescale: self.rescale.clone(),
            arrays: self.arrays.clone(),
            total_row_policy: self.total_row_policy.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Field;

    #[test]
    fn empty_document_yields_defaults() -> Result<()> {
        let config = PipelineConfig::from_yaml_str("{}")?;
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.group_key()?, GroupKey::default());
        assert_eq!(config.spline_method, SplineMethod::Fmm);
        assert_eq!(config.baseline_scenario, "Historical Reference");
        Ok(())
    }

    #[test]
    fn overrides_are_read() -> Result<()> {
        let yaml = r#"
archives: ["data/*.zip"]
correspondence: corr.csv
region_level: gtap_code
group_fields: [model, scenario, region, variable]
spline_method: natural
variant: growth_rates
rescale:
  "GDP|PPP": 1.0
total_row_policy:
  keep_baseline: false
  keep_scenarios: [SSP5]
arrays:
  - name: POP
    description: Population
    variable: Population
"#;
        let config = PipelineConfig::from_yaml_str(yaml)?;
        assert_eq!(config.region_level, RegionLevel::GtapCode);
        assert_eq!(config.spline_method, SplineMethod::Natural);
        assert_eq!(config.variant, Variant::GrowthRates);
        assert_eq!(config.rescale.factor("GDP|PPP"), 1.0);
        assert_eq!(
            config.group_key()?.fields(),
            &[Field::Model, Field::Scenario, Field::Region, Field::Variable]
        );
        let policy = config.total_row_policy.unwrap();
        assert!(!policy.keep_baseline);
        assert_eq!(policy.keep_scenarios, vec!["SSP5".to_string()]);
        assert_eq!(policy.keep_cohorts.len(), 3);
        assert_eq!(config.arrays.len(), 1);
        assert_eq!(config.arrays[0].model, None);
        Ok(())
    }

    #[test]
    fn invalid_group_field_is_rejected() -> Result<()> {
        let config = PipelineConfig::from_yaml_str("group_fields: [model, year]")?;
        assert!(config.group_key().is_err());
        Ok(())
    }

    #[test]
    fn demographic_prefix_matches_total_and_components() {
        let config = PipelineConfig::default();
        assert!(config.is_demographic("Population"));
        assert!(config.is_demographic("Population|Male|Aged0-4"));
        assert!(!config.is_demographic("Population Density"));
        assert!(!config.is_demographic("GDP|PPP"));
    }

    #[test]
    fn relative_paths_follow_the_config_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("pipeline.yaml");
        std::fs::write(&path, "archives: [\"in/*.zip\"]\ncorrespondence: corr.csv\n")?;
        let config = PipelineConfig::from_path(&path)?;
        assert_eq!(config.correspondence, dir.path().join("corr.csv"));
        assert_eq!(config.archives, vec![dir.path().join("in/*.zip").display().to_string()]);
        Ok(())
    }
}
