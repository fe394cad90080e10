// src/aggregate/correspondence.rs

use super::override_file::AggOverride;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeSet, HashMap},
    fs::File,
    io::Read,
    path::Path,
};
use tracing::{debug, warn};

/// One raw region name mapped to its ISO3 country and GTAP aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrespondenceRow {
    pub reg_gtap_number: u32,
    pub reg_iso3: String,
    pub reg_gtap_code: String,
    pub reg_gtap_name: String,
    pub country_gtap_name: String,
    pub cty_names: String,
}

/// Which column of the correspondence table raw regions are aggregated to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionLevel {
    #[default]
    Iso3,
    GtapCode,
}

/// Static region key-mapping table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Correspondence {
    rows: Vec<CorrespondenceRow>,
    level: RegionLevel,
}

/// Raw region names are matched trimmed and case-insensitively.
pub(crate) fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

impl Correspondence {
    pub fn new(rows: Vec<CorrespondenceRow>) -> Self {
        Self {
            rows,
            level: RegionLevel::default(),
        }
    }

    pub fn with_level(mut self, level: RegionLevel) -> Self {
        self.level = level;
        self
    }

    pub fn rows(&self) -> &[CorrespondenceRow] {
        &self.rows
    }

    /// Load from a CSV with the six correspondence columns as header.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut rows = Vec::new();
        for (idx, result) in rdr.deserialize::<CorrespondenceRow>().enumerate() {
            rows.push(result.with_context(|| format!("correspondence record {}", idx + 1))?);
        }
        debug!(rows = rows.len(), "loaded correspondence table");
        Ok(Self::new(rows))
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)
            .with_context(|| format!("Failed to open correspondence CSV: {:?}", path.as_ref()))?;
        Self::from_reader(file)
    }

    /// Aggregation target of `row` at this table's level.
    pub fn target<'a>(&self, row: &'a CorrespondenceRow) -> &'a str {
        match self.level {
            RegionLevel::Iso3 => &row.reg_iso3,
            RegionLevel::GtapCode => &row.reg_gtap_code,
        }
    }

    /// Copy of this table whose targets are rewritten through `agg`.
    /// Targets without an override entry are kept.
    pub fn remapped(&self, agg: &AggOverride) -> Self {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                let slot = match self.level {
                    RegionLevel::Iso3 => &mut row.reg_iso3,
                    RegionLevel::GtapCode => &mut row.reg_gtap_code,
                };
                if let Some(target) = agg.target_for(slot) {
                    *slot = target.to_string();
                }
                row
            })
            .collect();
        Self {
            rows,
            level: self.level,
        }
    }

    /// Normalized raw name → target code. A name listed twice keeps its first target.
    pub fn name_lookup(&self) -> HashMap<String, String> {
        let mut lookup: HashMap<String, String> = HashMap::with_capacity(self.rows.len());
        for row in &self.rows {
            let name = normalize_name(&row.cty_names);
            let target = self.target(row);
            match lookup.get(&name) {
                Some(existing) if existing != target => {
                    warn!(name = %row.cty_names, kept = %existing, ignored = %target, "region name mapped twice");
                }
                Some(_) => {}
                None => {
                    lookup.insert(name, target.to_string());
                }
            }
        }
        lookup
    }

    /// Sorted distinct target codes: the region axis of the reconciled grid.
    pub fn region_codes(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|r| self.target(r).to_string())
            .filter(|c| !c.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn row(number: u32, iso3: &str, gtap: &str, name: &str) -> CorrespondenceRow {
        CorrespondenceRow {
            reg_gtap_number: number,
            reg_iso3: iso3.into(),
            reg_gtap_code: gtap.into(),
            reg_gtap_name: gtap.to_uppercase(),
            country_gtap_name: name.into(),
            cty_names: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::row;
    use super::*;

    #[test]
    fn loads_csv_and_exposes_codes() -> Result<()> {
        let csv = "reg_gtap_number,reg_iso3,reg_gtap_code,reg_gtap_name,country_gtap_name,cty_names\n\
                   1,AUS,aus,Australia,Australia,Australia\n\
                   2,NZL,nzl,New Zealand,New Zealand,New Zealand\n\
                   2,NZL,nzl,New Zealand,New Zealand, new zealand (islands) \n";
        let corr = Correspondence::from_reader(csv.as_bytes())?;
        assert_eq!(corr.rows().len(), 3);
        assert_eq!(corr.region_codes(), vec!["AUS", "NZL"]);
        let gtap = corr.clone().with_level(RegionLevel::GtapCode);
        assert_eq!(gtap.region_codes(), vec!["aus", "nzl"]);
        assert_eq!(
            corr.name_lookup().get("new zealand (islands)").map(String::as_str),
            Some("NZL")
        );
        Ok(())
    }

    #[test]
    fn remaps_targets_case_insensitively() {
        let corr = Correspondence::new(vec![
            row(1, "AUS", "aus", "Australia"),
            row(2, "NZL", "nzl", "New Zealand"),
            row(3, "FRA", "fra", "France"),
        ])
        .with_level(RegionLevel::GtapCode);
        let agg = AggOverride::parse("! Section regions\nAUS & oce\nNzl & oce\n", None);
        assert_eq!(corr.remapped(&agg).region_codes(), vec!["fra", "oce"]);
    }
}
