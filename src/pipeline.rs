// src/pipeline.rs

use crate::aggregate::{aggregate, AggOverride, Correspondence};
use crate::config::{PipelineConfig, Variant};
use crate::growth::growth_rate;
use crate::ingest;
use crate::interpolate::{check_cohort_consistency, interpolate_beers, interpolate_spline, CohortViolation};
use crate::output::{write_output, OutputFormat};
use crate::reconcile::{reconcile, reconcile_key, ReconciledRecord};
use crate::table::{Record, Table};
use anyhow::{Context, Result};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Everything one run produced.
#[derive(Debug)]
pub struct PipelineOutput {
    pub table: Table<ReconciledRecord>,
    pub violations: Vec<CohortViolation>,
    pub written: Vec<PathBuf>,
}

/// Load inputs, run every stage and write the result.
///
/// `output` takes precedence over `config.output`. The output format and
/// the group key are validated before any input is read.
#[instrument(level = "info", skip_all)]
pub fn run(config: &PipelineConfig, output: Option<&Path>) -> Result<PipelineOutput> {
    let output = output.or(config.output.as_deref());
    if let Some(path) = output {
        OutputFormat::from_path(path)?;
    }
    config.group_key()?;

    if let Some(threads) = config.threads {
        if rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .is_err()
        {
            warn!(threads, "rayon pool already initialised; keeping it");
        }
    }

    let correspondence = Correspondence::from_csv_path(&config.correspondence)?
        .with_level(config.region_level);
    let agg_override = config
        .agg_override
        .as_ref()
        .map(|p| AggOverride::from_path(p, config.agg_section.as_deref()))
        .transpose()?;
    let raw = ingest::load_archives(&config.archives)?;

    let (table, violations) = run_tables(&raw, &correspondence, agg_override.as_ref(), config)?;

    let written = match output {
        Some(path) => write_output(&table, &config.arrays, path)
            .with_context(|| format!("Failed to write output {:?}", path))?,
        None => {
            info!("no output path given; skipping serialization");
            Vec::new()
        }
    };
    Ok(PipelineOutput {
        table,
        violations,
        written,
    })
}

/// The in-memory stages: aggregate, interpolate, check, reconcile and,
/// for the growth variant, replace levels by growth rates.
#[instrument(level = "info", skip_all, fields(raw = raw.len()))]
pub fn run_tables(
    raw: &Table<Record>,
    correspondence: &Correspondence,
    agg_override: Option<&AggOverride>,
    config: &PipelineConfig,
) -> Result<(Table<ReconciledRecord>, Vec<CohortViolation>)> {
    let key = config.group_key()?;
    let aggregated = aggregate(raw, correspondence, &key, agg_override)?;

    let (demographic, other): (Vec<Record>, Vec<Record>) = aggregated
        .into_rows()
        .into_iter()
        .partition(|r| config.is_demographic(&r.variable));
    let (demographic, other) = (Table::new(demographic), Table::new(other));
    info!(demographic = demographic.len(), other = other.len(), "split for interpolation");

    let (spline_out, beers_out) = rayon::join(
        || interpolate_spline(&other, &key, config.spline_method),
        || interpolate_beers(&demographic, &key),
    );
    let (spline_out, beers_out) = (spline_out?, beers_out?);

    let violations = check_cohort_consistency(&beers_out, config.cohort_tolerance);
    if !violations.is_empty() {
        warn!(
            count = violations.len(),
            first = ?violations.first(),
            "cohort totals differ from the sum of their components"
        );
    }

    let region_axis: Cow<'_, Correspondence> = match agg_override {
        Some(agg) => Cow::Owned(correspondence.remapped(agg)),
        None => Cow::Borrowed(correspondence),
    };
    let reconciled = reconcile(&spline_out, &beers_out, &region_axis, &config.reconcile_options())?;

    let table = match config.variant {
        Variant::Levels => reconciled,
        Variant::GrowthRates => growth_rate(&reconciled, &reconcile_key())?
            .into_iter()
            .map(|g| ReconciledRecord {
                value: g.growth,
                ..g.row
            })
            .collect(),
    };
    Ok((table, violations))
}
