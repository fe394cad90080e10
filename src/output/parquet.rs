// src/output/parquet.rs

//! Dense array exchange files: one Parquet file per output array.

use super::OutputRow;
use crate::reconcile::{ArrayGroup, ReconciledRecord};
use crate::table::Table;
use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Dimension columns, outermost first. Rows are written in this order so each
/// file reads as a row-major dense array.
const DIMENSIONS: [&str; 6] = ["SCE", "ISO", "EDU", "GND", "AGE", "YRS"];

fn schema(name: &str, description: &str) -> Schema {
    let mut fields: Vec<Field> = DIMENSIONS
        .iter()
        .map(|d| Field::new(*d, DataType::Utf8, false))
        .collect();
    fields.push(Field::new("VALUE", DataType::Float64, false));

    let metadata = HashMap::from([
        ("name".to_string(), name.to_string()),
        ("description".to_string(), description.to_string()),
        ("created_at".to_string(), Utc::now().to_rfc3339()),
    ]);
    Schema::new(fields).with_metadata(metadata)
}

/// `<stem>--<NAME>.parquet` next to `base`.
pub fn array_path(base: &Path, name: &str) -> PathBuf {
    let stem = base
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let safe: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    base.with_file_name(format!("{}--{}.parquet", stem, safe))
}

fn build_batch(schema: Arc<Schema>, rows: &[OutputRow<'_>]) -> Result<RecordBatch> {
    let utf8 = |values: Vec<&str>| -> ArrayRef { Arc::new(StringArray::from(values)) };
    let columns: Vec<ArrayRef> = vec![
        utf8(rows.iter().map(|r| r.scenario).collect()),
        utf8(rows.iter().map(|r| r.region).collect()),
        utf8(rows.iter().map(|r| r.education).collect()),
        utf8(rows.iter().map(|r| r.gender).collect()),
        utf8(rows.iter().map(|r| r.cohort).collect()),
        utf8(rows.iter().map(|r| r.year.as_str()).collect()),
        Arc::new(Float64Array::from(rows.iter().map(|r| r.value).collect::<Vec<f64>>())),
    ];
    RecordBatch::try_new(schema, columns).context("building RecordBatch for array")
}

fn write_array(path: &Path, schema: Schema, rows: &[OutputRow<'_>]) -> Result<()> {
    let schema = Arc::new(schema);
    let batch = build_batch(schema.clone(), rows)?;

    let tmp_path = path.with_extension("parquet.tmp");
    let tmp_file = File::create(&tmp_path)
        .with_context(|| format!("could not create temporary file `{}`", tmp_path.display()))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::try_new(3)?))
        .build();
    let mut writer = ArrowWriter::try_new(BufWriter::new(tmp_file), schema, Some(props))
        .context("creating ArrowWriter for array")?;
    writer.write(&batch).context("writing array batch")?;
    writer.close().context("closing ArrowWriter for array")?;

    fs::rename(&tmp_path, path).with_context(|| {
        format!("failed to rename `{}` to `{}`", tmp_path.display(), path.display())
    })?;
    Ok(())
}

/// Write one file per distinct array name in `table`. The description of
/// each file comes from the matching [`ArrayGroup`], else the array name.
#[instrument(level = "info", skip(table, arrays), fields(rows = table.len()))]
pub fn write_arrays(
    table: &Table<ReconciledRecord>,
    arrays: &[ArrayGroup],
    base: &Path,
) -> Result<Vec<PathBuf>> {
    if let Some(dir) = base.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating output dir `{}`", dir.display()))?;
    }

    let mut grouped: BTreeMap<&str, Vec<OutputRow<'_>>> = BTreeMap::new();
    for r in table {
        grouped.entry(r.array.as_str()).or_default().push(OutputRow::from(r));
    }

    let mut written = Vec::with_capacity(grouped.len());
    for (name, mut rows) in grouped {
        rows.sort_by(|a, b| {
            (a.scenario, a.region, a.education, a.gender, a.cohort, &a.year)
                .cmp(&(b.scenario, b.region, b.education, b.gender, b.cohort, &b.year))
        });
        let description = arrays
            .iter()
            .find(|a| a.name == name)
            .map_or(name, |a| a.description.as_str());

        let path = array_path(base, name);
        write_array(&path, schema(name, description), &rows)?;
        debug!(array = name, rows = rows.len(), path = %path.display(), "wrote array");
        written.push(path);
    }
    info!(files = written.len(), "wrote parquet arrays");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    fn rec(array: &str, region: &str, year: i32, value: f64) -> ReconciledRecord {
        ReconciledRecord {
            model: "IIASA GDP 2023".into(),
            scenario: "SSP2".into(),
            region: region.into(),
            variable: "GDP|PPP".into(),
            unit: "billion US$2017/yr".into(),
            gender: None,
            cohort: None,
            education: None,
            gender_label: "TOTL".into(),
            cohort_label: "TOTL".into(),
            education_label: "TOTL".into(),
            array: array.into(),
            year,
            value,
        }
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(
            array_path(Path::new("/tmp/out.parquet"), "GDP|MER"),
            PathBuf::from("/tmp/out--GDP_MER.parquet")
        );
    }

    #[test]
    fn writes_one_sorted_file_per_array() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let base = dir.path().join("ssp.parquet");
        let table = Table::new(vec![
            rec("GDPI", "fra", 2021, 3.0),
            rec("GDPI", "deu", 2020, 1.0),
            rec("GDPI", "fra", 2020, 2.0),
            rec("GDP|MER", "fra", 2020, 9.0),
        ]);
        let written = write_arrays(&table, &ArrayGroup::defaults(), &base)?;
        assert_eq!(written.len(), 2);

        let gdpi = dir.path().join("ssp--GDPI.parquet");
        assert!(written.contains(&gdpi));
        let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(&gdpi)?)?;
        let meta = builder.schema().metadata().clone();
        assert_eq!(meta.get("name").map(String::as_str), Some("GDPI"));
        assert!(meta["description"].contains("IIASA"));
        assert!(meta.contains_key("created_at"));

        let batches = builder.build()?.collect::<std::result::Result<Vec<_>, _>>()?;
        let batch = &batches[0];
        let iso = batch.column(1).as_any().downcast_ref::<StringArray>().unwrap();
        let yrs = batch.column(5).as_any().downcast_ref::<StringArray>().unwrap();
        let val = batch.column(6).as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!((iso.value(0), yrs.value(0), val.value(0)), ("deu", "Y2020", 1.0));
        assert_eq!((iso.value(1), yrs.value(1), val.value(1)), ("fra", "Y2020", 2.0));
        assert_eq!((iso.value(2), yrs.value(2), val.value(2)), ("fra", "Y2021", 3.0));

        let other = dir.path().join("ssp--GDP_MER.parquet");
        let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(&other)?)?;
        assert_eq!(
            builder.schema().metadata().get("description").map(String::as_str),
            Some("GDP|MER")
        );
        Ok(())
    }
}
