// src/aggregate/mod.rs

pub mod correspondence;
pub mod override_file;

pub use correspondence::{Correspondence, CorrespondenceRow, RegionLevel};
pub use override_file::AggOverride;

use crate::error::Result;
use crate::table::{keyed_merge, ConflictPolicy, GroupKey, Record, Table};
use correspondence::normalize_name;
use std::borrow::Cow;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, instrument, warn};

/// Map raw region names onto correspondence targets and sum `value` within
/// `key ∪ {year}`.
///
/// Raw rows whose region has no correspondence entry are dropped (logged,
/// never bucketed). Non-finite values are skipped. Targets without any raw
/// data produce no rows here; grid completion fills them later.
#[instrument(level = "info", skip_all, fields(rows = raw.len()))]
pub fn aggregate(
    raw: &Table<Record>,
    correspondence: &Correspondence,
    key: &GroupKey,
    agg_override: Option<&AggOverride>,
) -> Result<Table<Record>> {
    let corr: Cow<'_, Correspondence> = match agg_override {
        Some(agg) => Cow::Owned(correspondence.remapped(agg)),
        None => Cow::Borrowed(correspondence),
    };
    let lookup = corr.name_lookup();

    let mut unmatched: BTreeSet<&str> = BTreeSet::new();
    let mut skipped = 0usize;
    let mapped: Vec<Record> = raw
        .iter()
        .filter_map(|r| {
            if !r.value.is_finite() {
                skipped += 1;
                return None;
            }
            match lookup.get(&normalize_name(&r.region)) {
                Some(target) => Some(Record {
                    region: target.clone(),
                    ..r.clone()
                }),
                None => {
                    unmatched.insert(&r.region);
                    None
                }
            }
        })
        .collect();

    if !unmatched.is_empty() {
        warn!(
            regions = unmatched.len(),
            names = ?unmatched.iter().take(20).collect::<Vec<_>>(),
            "dropping raw regions without correspondence"
        );
    }
    if skipped > 0 {
        debug!(skipped, "skipped non-finite raw values");
    }

    let seen: HashSet<&str> = mapped.iter().map(|r| r.region.as_str()).collect();
    let missing = corr
        .region_codes()
        .into_iter()
        .filter(|c| !seen.contains(c.as_str()))
        .count();
    if missing > 0 {
        debug!(missing, "correspondence targets without raw data");
    }

    let out: Table<Record> = keyed_merge(Vec::new(), mapped, key, ConflictPolicy::Sum)
        .into_iter()
        .collect();
    info!(rows_out = out.len(), "aggregation done");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::correspondence::test_support::row;
    use super::*;

    fn raw(region: &str, year: i32, value: f64) -> Record {
        Record::new("OECD", "SSP2", region, "GDP|PPP", "bn", year, value)
    }

    fn corr() -> Correspondence {
        Correspondence::new(vec![
            row(1, "AUS", "oce", "Australia"),
            row(2, "NZL", "oce", "New Zealand"),
            row(3, "FRA", "fra", "France"),
        ])
        .with_level(RegionLevel::GtapCode)
    }

    #[test]
    fn sums_regions_sharing_a_target() -> anyhow::Result<()> {
        let table = Table::new(vec![raw("Australia", 2020, 10.0), raw("new zealand", 2020, 15.0)]);
        let out = aggregate(&table, &corr(), &GroupKey::default(), None)?;
        assert_eq!(out.len(), 1);
        assert_eq!(out.rows()[0].region, "oce");
        assert_eq!(out.rows()[0].value, 25.0);
        Ok(())
    }

    #[test]
    fn unmatched_regions_are_dropped() -> anyhow::Result<()> {
        let table = Table::new(vec![raw("France", 2020, 1.0), raw("Atlantis", 2020, 99.0)]);
        let out = aggregate(&table, &corr(), &GroupKey::default(), None)?;
        assert_eq!(out.len(), 1);
        assert_eq!(out.rows()[0].region, "fra");
        Ok(())
    }

    #[test]
    fn duplicate_years_are_summed_away() -> anyhow::Result<()> {
        let table = Table::new(vec![raw("France", 2020, 1.0), raw("France", 2020, 2.0), raw("France", 2025, 4.0)]);
        let out = aggregate(&table, &corr(), &GroupKey::default(), None)?;
        let vals: Vec<(i32, f64)> = out.iter().map(|r| (r.year, r.value)).collect();
        assert_eq!(vals, vec![(2020, 3.0), (2025, 4.0)]);
        Ok(())
    }

    #[test]
    fn override_remaps_targets_first() -> anyhow::Result<()> {
        let agg = AggOverride::parse("OCE & apac\nfra & eu\n", None);
        let table = Table::new(vec![raw("Australia", 2020, 1.0), raw("France", 2020, 2.0)]);
        let out = aggregate(&table, &corr(), &GroupKey::default(), Some(&agg))?;
        let regions: Vec<&str> = out.iter().map(|r| r.region.as_str()).collect();
        assert_eq!(regions, vec!["apac", "eu"]);
        Ok(())
    }
}
