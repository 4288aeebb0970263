use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Serialize};

use super::model::{CellId, Measurement, MeasurementDataset, Metric, Timestamp};

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// Names of the export columns with a fixed role. Defaults match the
/// drive-test tool's CSV export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub cell_id: String,
    pub time: String,
    pub rsrp: String,
    pub cinr: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        ColumnMapping {
            cell_id: "Cell ID (0)".into(),
            time: "Time".into(),
            rsrp: "R0 RSRP (0)".into(),
            cinr: "R0 RS CINR (0)".into(),
        }
    }
}

impl ColumnMapping {
    /// Metric carried by a (non cell-id, non time) column.
    ///
    /// `None` for an unmapped column whose name reads as a built-in metric,
    /// since it would be indistinguishable from the mapped one.
    pub fn metric_for(&self, column: &str) -> Option<Metric> {
        if column == self.rsrp {
            Some(Metric::Rsrp)
        } else if column == self.cinr {
            Some(Metric::Cinr)
        } else {
            match Metric::from_name(column) {
                custom @ Metric::Custom(_) => Some(custom),
                _ => None,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// A file that could not be loaded, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFile {
    pub file_name: String,
    pub reason: String,
}

/// All loadable exports of one folder, keyed by file name.
#[derive(Debug, Clone, Default)]
pub struct FolderCatalog {
    pub folder: PathBuf,
    pub datasets: BTreeMap<String, MeasurementDataset>,
    pub skipped: Vec<SkippedFile>,
}

impl FolderCatalog {
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }
}

/// Whether `path` has an extension [`load_file`] understands.
pub fn is_supported(path: &Path) -> bool {
    matches!(extension(path).as_str(), "csv" | "parquet" | "pq")
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Load every supported export in `folder`.
///
/// Only an unreadable folder is an error. A file that fails to load is
/// logged, listed in [`FolderCatalog::skipped`] and does not stop the rest.
pub fn load_folder(folder: &Path, columns: &ColumnMapping) -> Result<FolderCatalog> {
    let entries = std::fs::read_dir(folder)
        .with_context(|| format!("reading folder {}", folder.display()))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_supported(p))
        .collect();
    paths.sort();

    let mut catalog = FolderCatalog {
        folder: folder.to_path_buf(),
        ..Default::default()
    };

    for path in paths {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        match load_file(&path, columns) {
            Ok(dataset) => {
                log::info!(
                    "Loaded {file_name}: {} samples, {} cells, metrics {:?}",
                    dataset.len(),
                    dataset.cell_ids().len(),
                    dataset.metrics()
                );
                catalog.datasets.insert(file_name, dataset);
            }
            Err(e) => {
                log::warn!("Skipping {file_name}: {e:#}");
                catalog.skipped.push(SkippedFile {
                    file_name,
                    reason: format!("{e:#}"),
                });
            }
        }
    }

    Ok(catalog)
}

/// Load one export.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`             – comma separated, header row
/// * `.parquet` / `.pq` – flat columns of numbers or strings
pub fn load_file(path: &Path, columns: &ColumnMapping) -> Result<MeasurementDataset> {
    let table = match extension(path).as_str() {
        "csv" => read_csv(path)?,
        "parquet" | "pq" => read_parquet(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };
    table.into_dataset(columns)
}

// ---------------------------------------------------------------------------
// Raw table → cleaned dataset
// ---------------------------------------------------------------------------

/// Text cells as read from a file; `None` marks a missing value.
#[derive(Debug, Default)]
struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

const MISSING_TOKENS: &[&str] = &["NA", "N/A", "NaN", "nan", "null", "NULL"];

fn clean_cell(raw: &str) -> Option<String> {
    let v = raw.trim();
    if v.is_empty() || MISSING_TOKENS.contains(&v) {
        None
    } else {
        Some(v.to_string())
    }
}

impl RawTable {
    fn into_dataset(self, columns: &ColumnMapping) -> Result<MeasurementDataset> {
        let RawTable { headers, rows } = self;

        let cell_idx = headers
            .iter()
            .position(|h| *h == columns.cell_id)
            .with_context(|| format!("missing cell id column '{}'", columns.cell_id))?;
        let time_idx = headers.iter().position(|h| *h == columns.time);

        let n_rows = rows.len();
        let complete: Vec<Vec<String>> = rows
            .into_iter()
            .filter_map(|row| row.into_iter().collect::<Option<Vec<String>>>())
            .collect();
        if complete.len() < n_rows {
            log::debug!("Dropped {} incomplete rows", n_rows - complete.len());
        }

        // Metric columns: everything else whose values are all numeric.
        let mut metric_cols: Vec<(usize, Metric)> = Vec::new();
        for (i, header) in headers.iter().enumerate() {
            if i == cell_idx || Some(i) == time_idx {
                continue;
            }
            let numeric = complete.iter().all(|row| row[i].parse::<f64>().is_ok());
            if !numeric {
                log::debug!("Ignoring non-numeric column '{header}'");
                continue;
            }
            let Some(metric) = columns.metric_for(header) else {
                log::warn!("Ignoring column '{header}': name clashes with a mapped metric");
                continue;
            };
            if metric_cols.iter().any(|(_, m)| *m == metric) {
                log::warn!("Ignoring duplicate column '{header}' for metric {metric}");
                continue;
            }
            metric_cols.push((i, metric));
        }

        let mut measurements = Vec::with_capacity(complete.len());
        for (row_no, row) in complete.iter().enumerate() {
            let time = match time_idx {
                Some(t) => Timestamp::parse(&row[t], row_no as f64),
                None => Timestamp::from_index(row_no),
            };
            let values = metric_cols
                .iter()
                .map(|(i, _)| {
                    row[*i]
                        .parse::<f64>()
                        .with_context(|| format!("Row {row_no}: '{}' is not a number", row[*i]))
                })
                .collect::<Result<Vec<f64>>>()?;
            measurements.push(Measurement::new(CellId::parse(&row[cell_idx]), time, values));
        }

        let metrics = metric_cols.into_iter().map(|(_, m)| m).collect();
        Ok(MeasurementDataset::new(metrics, measurements)?)
    }
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

fn read_csv(path: &Path) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() > headers.len() {
            bail!(
                "CSV row {row_no}: {} fields, header has {}",
                record.len(),
                headers.len()
            );
        }
        // Short rows are padded with missing cells and dropped later.
        let mut row: Vec<Option<String>> = record.iter().map(clean_cell).collect();
        row.resize(headers.len(), None);
        rows.push(row);
    }

    Ok(RawTable { headers, rows })
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Read a Parquet export. Every column is flattened to text and then goes
/// through the same cleaning as CSV; nulls and NaN floats count as missing.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn read_parquet(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().trim().to_string())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .map(|col| cell_text(col, row))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("Row {row}"))?;
            rows.push(cells);
        }
    }

    Ok(RawTable { headers, rows })
}

/// Text of a single Arrow cell, `None` when missing.
fn cell_text(col: &ArrayRef, row: usize) -> Result<Option<String>> {
    if col.is_null(row) {
        return Ok(None);
    }
    let text = match col.data_type() {
        DataType::Float64 => {
            let v = col.as_primitive::<Float64Type>().value(row);
            if v.is_nan() {
                return Ok(None);
            }
            v.to_string()
        }
        DataType::Float32 => {
            let v = col.as_primitive::<Float32Type>().value(row);
            if v.is_nan() {
                return Ok(None);
            }
            v.to_string()
        }
        DataType::Int64 => col.as_primitive::<Int64Type>().value(row).to_string(),
        DataType::Int32 => col.as_primitive::<Int32Type>().value(row).to_string(),
        DataType::Utf8 => col.as_string::<i32>().value(row).to_string(),
        DataType::LargeUtf8 => col.as_string::<i64>().value(row).to_string(),
        _ => array_value_to_string(col, row).context("formatting parquet value")?,
    };
    Ok(clean_cell(&text))
}
