// src/growth.rs

use crate::error::{EngineError, Result};
use crate::table::{partition, GroupKey, Observation, PartitionKey, Table};
use rayon::prelude::*;
use serde::Serialize;
use tracing::instrument;

/// A row with its year-on-year growth rate in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WithGrowth<R> {
    #[serde(flatten)]
    pub row: R,
    pub growth: f64,
}

/// `100 * (v[t] - v[t-1]) / v[t-1]` within each partition of `key`, in year
/// order. The first year of a partition and any year following a zero get 0.
#[instrument(level = "info", skip_all, fields(rows = table.len()))]
pub fn growth_rate<R>(table: &Table<R>, key: &GroupKey) -> Result<Table<WithGrowth<R>>>
where
    R: Observation + Clone + Send + Sync,
{
    let parts: Vec<(PartitionKey, Vec<&R>)> = partition(table.rows(), key).into_iter().collect();

    let out: Vec<Vec<WithGrowth<R>>> = parts
        .into_par_iter()
        .map(|(pk, mut rows)| {
            rows.sort_by_key(|r| r.year());
            if let Some(w) = rows.windows(2).find(|w| w[0].year() == w[1].year()) {
                return Err(EngineError::DuplicateYear {
                    key: pk.to_string(),
                    year: w[0].year(),
                });
            }
            let mut prev: Option<f64> = None;
            Ok(rows
                .into_iter()
                .map(|r| {
                    let growth = match prev {
                        Some(p) if p != 0.0 => 100.0 * (r.value() - p) / p,
                        _ => 0.0,
                    };
                    prev = Some(r.value());
                    WithGrowth {
                        row: r.clone(),
                        growth,
                    }
                })
                .collect())
        })
        .collect::<Result<_>>()?;

    Ok(out.into_iter().flatten().collect())
}
