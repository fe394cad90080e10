// src/ingest/mod.rs

//! Loading of IAM-format scenario archives.
//!
//! An archive is a zip of wide CSV files with the columns
//! `Model,Scenario,Region,Variable,Unit` followed by one column per year.
//! Every file is reshaped into long [`Record`]s.

pub mod utils;

use crate::error::EngineError;
use crate::table::{Record, Table};
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use utils::{clean_str, parse_value, parse_year_header};
use zip::ZipArchive;

const REQUIRED_COLUMNS: [&str; 5] = ["model", "scenario", "region", "variable", "unit"];

/// Positions of the identifying columns and the year columns of one file.
struct Layout {
    ids: [usize; 5],
    years: Vec<(usize, i32)>,
}

/// Positions of the IAM identifying columns, matched case-insensitively, or
/// `None` when any of them is absent.
fn id_positions(headers: &csv::StringRecord) -> Option<[usize; 5]> {
    let cleaned: Vec<String> = headers.iter().map(|h| clean_str(h).to_lowercase()).collect();
    let mut ids = [0usize; 5];
    for (slot, col) in ids.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = cleaned.iter().position(|h| h == col)?;
    }
    Some(ids)
}

fn layout(name: &str, headers: &csv::StringRecord) -> Result<Layout> {
    let ids = id_positions(headers).ok_or_else(|| {
        EngineError::Configuration(format!(
            "{} lacks one of the {:?} columns",
            name, REQUIRED_COLUMNS
        ))
    })?;

    let mut years = Vec::new();
    let mut ignored = Vec::new();
    for (i, h) in headers.iter().enumerate() {
        if ids.contains(&i) {
            continue;
        }
        match parse_year_header(h) {
            Some(y) => years.push((i, y)),
            None => ignored.push(clean_str(h)),
        }
    }
    if !ignored.is_empty() {
        debug!(file = name, columns = ?ignored, "ignoring non-year columns");
    }
    Ok(Layout { ids, years })
}

/// Reshape one wide CSV buffer into long records.
pub fn parse_wide_csv(name: &str, data: &[u8]) -> Result<Vec<Record>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(Cursor::new(data));
    let headers = rdr
        .headers()
        .with_context(|| format!("Failed to read header of {}", name))?
        .clone();
    let layout = layout(name, &headers)?;

    let mut out = Vec::new();
    let mut skipped = 0usize;
    for (idx, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("CSV parse error in {} at record {}", name, idx))?;
        let id = |k: usize| clean_str(record.get(layout.ids[k]).unwrap_or_default());
        let (model, scenario, region, variable, unit) = (id(0), id(1), id(2), id(3), id(4));

        for &(col, year) in &layout.years {
            match record.get(col).and_then(parse_value) {
                Some(value) => out.push(Record::new(
                    model.clone(),
                    scenario.clone(),
                    region.clone(),
                    variable.clone(),
                    unit.clone(),
                    year,
                    value,
                )),
                None => skipped += 1,
            }
        }
    }
    debug!(file = name, rows = out.len(), skipped, "parsed wide csv");
    Ok(out)
}

/// `true` when the header line of `data` carries every IAM identifying column.
fn has_iam_layout(data: &[u8]) -> bool {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(Cursor::new(data))
        .headers()
        .ok()
        .and_then(id_positions)
        .is_some()
}

/// Read the `.csv` entries of an archive into memory, keyed by entry name.
fn csv_entries(zip_path: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    let file = File::open(zip_path).with_context(|| format!("Failed to open ZIP file: {:?}", zip_path))?;
    let mut archive =
        ZipArchive::new(file).with_context(|| format!("Failed to read ZIP archive: {:?}", zip_path))?;

    let names: Vec<String> = archive
        .file_names()
        .filter(|n| n.to_lowercase().ends_with(".csv"))
        .map(str::to_string)
        .collect();
    let mut entries = Vec::with_capacity(names.len());
    for name in names {
        let mut entry = archive
            .by_name(&name)
            .with_context(|| format!("Failed to access {} in {:?}", name, zip_path))?;
        if !entry.is_file() {
            continue;
        }
        let mut buf = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut buf)
            .with_context(|| format!("Failed to read {} into memory", name))?;
        entries.push((name, buf));
    }
    Ok(entries)
}

/// Load every IAM-format table of a ZIP archive.
///
/// Scenario archives often ship side tables (region lists, metadata) next to
/// the data; `.csv` entries without the IAM identifying columns are skipped.
#[instrument(level = "info", skip(zip_path), fields(zip = %zip_path.as_ref().display()))]
pub fn load_iam_zip<P: AsRef<Path>>(zip_path: P) -> Result<Vec<Record>> {
    let (tables, other): (Vec<_>, Vec<_>) = csv_entries(zip_path.as_ref())?
        .into_iter()
        .partition(|(_, data)| has_iam_layout(data));
    if !other.is_empty() {
        let names: Vec<&str> = other.iter().map(|(n, _)| n.as_str()).collect();
        warn!(entries = ?names, "skipping csv entries without the IAM columns");
    }
    if tables.is_empty() {
        warn!("archive contains no IAM-format tables");
    }

    let mut rows = Vec::new();
    for (name, data) in &tables {
        rows.extend(parse_wide_csv(name, data)?);
    }
    info!(tables = tables.len(), rows = rows.len(), "loaded archive");
    Ok(rows)
}

fn load_csv_file(path: &Path) -> Result<Vec<Record>> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read CSV file: {:?}", path))?;
    parse_wide_csv(&path.display().to_string(), &data)
}

/// Expand glob patterns into a sorted, de-duplicated list of input files.
pub fn resolve_archives(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        let matches = glob::glob(pattern).with_context(|| format!("Invalid glob pattern: {}", pattern))?;
        for entry in matches {
            paths.push(entry.with_context(|| format!("Failed to read glob match for {}", pattern))?);
        }
    }
    paths.sort();
    paths.dedup();
    if paths.is_empty() {
        return Err(EngineError::Configuration(format!("no input files match {:?}", patterns)).into());
    }
    Ok(paths)
}

/// Load every archive (`.zip`) or plain wide CSV (`.csv`) matching `patterns`.
#[instrument(level = "info", skip_all)]
pub fn load_archives(patterns: &[String]) -> Result<Table<Record>> {
    let mut rows = Vec::new();
    for path in resolve_archives(patterns)? {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("zip") => rows.extend(load_iam_zip(&path)?),
            Some("csv") => rows.extend(load_csv_file(&path)?),
            _ => warn!(path = %path.display(), "skipping input that is neither .zip nor .csv"),
        }
    }
    info!(rows = rows.len(), "raw table loaded");
    Ok(Table::new(rows))
}
