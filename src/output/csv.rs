// src/output/csv.rs

use super::OutputRow;
use crate::reconcile::ReconciledRecord;
use crate::table::Table;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Write the flat `SCE,ISO,VAR,EDU,GND,AGE,YRS,VALUE` file.
#[instrument(level = "info", skip(table), fields(rows = table.len()))]
pub fn write_csv(table: &Table<ReconciledRecord>, path: &Path) -> Result<PathBuf> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating output dir `{}`", dir.display()))?;
    }
    let tmp_path = path.with_extension("csv.tmp");
    let file = File::create(&tmp_path)
        .with_context(|| format!("could not create temporary file `{}`", tmp_path.display()))?;
    let mut wtr = csv::Writer::from_writer(BufWriter::new(file));
    for r in table {
        wtr.serialize(OutputRow::from(r))
            .with_context(|| format!("writing row to `{}`", tmp_path.display()))?;
    }
    wtr.flush().context("flushing csv writer")?;
    drop(wtr);

    fs::rename(&tmp_path, path).with_context(|| {
        format!("failed to rename `{}` to `{}`", tmp_path.display(), path.display())
    })?;
    info!(path = %path.display(), rows = table.len(), "wrote csv");
    Ok(path.to_path_buf())
}
