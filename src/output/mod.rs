// src/output/mod.rs

//! Serializers for the reconciled table.

pub mod csv;
pub mod parquet;

use crate::error::{EngineError, Result};
use crate::reconcile::{ArrayGroup, ReconciledRecord};
use crate::table::Table;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Output format selected by the extension of the output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Flat delimited file with short column codes.
    Csv,
    /// One dense Parquet array per array group.
    Parquet,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "parquet" => Ok(OutputFormat::Parquet),
            _ => Err(EngineError::UnsupportedOutput(ext)),
        }
    }
}

/// A reconciled row renamed to the downstream short codes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRow<'a> {
    #[serde(rename = "SCE")]
    pub scenario: &'a str,
    #[serde(rename = "ISO")]
    pub region: &'a str,
    #[serde(rename = "VAR")]
    pub array: &'a str,
    #[serde(rename = "EDU")]
    pub education: &'a str,
    #[serde(rename = "GND")]
    pub gender: &'a str,
    #[serde(rename = "AGE")]
    pub cohort: &'a str,
    #[serde(rename = "YRS")]
    pub year: String,
    #[serde(rename = "VALUE")]
    pub value: f64,
}

impl<'a> From<&'a ReconciledRecord> for OutputRow<'a> {
    fn from(r: &'a ReconciledRecord) -> Self {
        OutputRow {
            scenario: &r.scenario,
            region: &r.region,
            array: &r.array,
            education: &r.education_label,
            gender: &r.gender_label,
            cohort: &r.cohort_label,
            year: year_code(r.year),
            value: r.value,
        }
    }
}

pub fn year_code(year: i32) -> String {
    format!("Y{}", year)
}

fn describe_series(r: &ReconciledRecord) -> String {
    format!(
        "{} / {} / {} / {} / {} / {}",
        r.model,
        r.variable,
        r.unit,
        r.gender.as_deref().unwrap_or("-"),
        r.cohort.as_deref().unwrap_or("-"),
        r.education.as_deref().unwrap_or("-"),
    )
}

/// Fail when two rows of `table` land on the same output cell.
///
/// Output files address a value by array and the SCE, ISO, EDU, GND, AGE and
/// YRS codes only, so distinct series that share an array name and labels
/// would silently overwrite each other downstream.
#[instrument(level = "debug", skip_all, fields(rows = table.len()))]
pub fn check_unique_cells(table: &Table<ReconciledRecord>) -> Result<()> {
    let mut seen: HashMap<(&str, &str, &str, &str, &str, &str, i32), &ReconciledRecord> =
        HashMap::with_capacity(table.len());
    for r in table {
        let cell = (
            r.array.as_str(),
            r.scenario.as_str(),
            r.region.as_str(),
            r.education_label.as_str(),
            r.gender_label.as_str(),
            r.cohort_label.as_str(),
            r.year,
        );
        if let Some(first) = seen.insert(cell, r) {
            return Err(EngineError::Configuration(format!(
                "array {} has two series for cell {}/{}/{}/{}/{}/{}: [{}] and [{}]; \
                 restrict the array group by model or variable",
                r.array,
                r.scenario,
                r.region,
                r.education_label,
                r.gender_label,
                r.cohort_label,
                year_code(r.year),
                describe_series(first),
                describe_series(r),
            )));
        }
    }
    Ok(())
}

/// Write `table` to `path` in the format its extension selects.
/// Returns every file written. Nothing is written when two rows share an
/// output cell.
pub fn write_output(
    table: &Table<ReconciledRecord>,
    arrays: &[ArrayGroup],
    path: &Path,
) -> anyhow::Result<Vec<PathBuf>> {
    let format = OutputFormat::from_path(path)?;
    check_unique_cells(table)?;
    match format {
        OutputFormat::Csv => Ok(vec![csv::write_csv(table, path)?]),
        OutputFormat::Parquet => parquet::write_arrays(table, arrays, path),
    }
}
