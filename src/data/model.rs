use std::collections::HashSet;
use std::fmt;

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

// ---------------------------------------------------------------------------
// CellId – the grouping key of a measurement row
// ---------------------------------------------------------------------------

/// Identifier of the serving cell a sample was measured on.
///
/// Exports usually carry integer ids, sometimes written as floats (`"301.0"`)
/// by spreadsheet tools; anything else is kept verbatim as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellId {
    Integer(i64),
    Text(String),
}

impl CellId {
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if let Ok(i) = s.parse::<i64>() {
            return CellId::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                return CellId::Integer(f as i64);
            }
        }
        CellId::Text(s.to_string())
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellId::Integer(i) => write!(f, "{i}"),
            CellId::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for CellId {
    fn from(i: i64) -> Self {
        CellId::Integer(i)
    }
}

impl From<&str> for CellId {
    fn from(s: &str) -> Self {
        CellId::Text(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Metric – a named numeric measurement column
// ---------------------------------------------------------------------------

/// A numeric signal metric. The two radio KPIs get their own variants, any
/// other numeric column of an export is carried as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Metric {
    /// Reference signal received power, dBm.
    Rsrp,
    /// Reference signal carrier to interference-plus-noise ratio, dB.
    Cinr,
    Custom(String),
}

impl Metric {
    /// Resolve a user-facing name (`"RSRP"`, `"cinr"`, `"Speed"`).
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        if name.eq_ignore_ascii_case("rsrp") {
            Metric::Rsrp
        } else if name.eq_ignore_ascii_case("cinr") {
            Metric::Cinr
        } else {
            Metric::Custom(name.to_string())
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Metric::Rsrp => "RSRP",
            Metric::Cinr => "CINR",
            Metric::Custom(name) => name,
        }
    }

    /// Unit suffix for threshold widgets and axis labels.
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Rsrp => "dBm",
            Metric::Cinr => "dB",
            Metric::Custom(_) => "",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Metric> for String {
    fn from(m: Metric) -> Self {
        m.name().to_string()
    }
}

impl From<String> for Metric {
    fn from(s: String) -> Self {
        Metric::from_name(&s)
    }
}

// ---------------------------------------------------------------------------
// Timestamp
// ---------------------------------------------------------------------------

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S%.f",
    "%d.%m.%Y %H:%M:%S%.f",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];

/// Sample time as written in the export, plus a numeric position used as
/// the plot x-coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct Timestamp {
    pub label: String,
    /// Seconds since the Unix epoch for full date-times, since midnight for
    /// bare times of day, or the raw number for numeric columns.
    pub seconds: f64,
}

impl Timestamp {
    /// Parse a time label; `fallback` (normally the row index) is used when
    /// no known format matches.
    pub fn parse(label: &str, fallback: f64) -> Self {
        let label = label.trim();
        let seconds = parse_seconds(label).unwrap_or(fallback);
        Timestamp {
            label: label.to_string(),
            seconds,
        }
    }

    /// Timestamp for exports without a time column.
    pub fn from_index(index: usize) -> Self {
        Timestamp {
            label: index.to_string(),
            seconds: index as f64,
        }
    }
}

fn parse_seconds(s: &str) -> Option<f64> {
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc().timestamp_millis() as f64 / 1000.0);
        }
    }
    for fmt in TIME_FORMATS {
        if let Ok(t) = NaiveTime::parse_from_str(s, fmt) {
            return Some(t.num_seconds_from_midnight() as f64 + t.nanosecond() as f64 / 1e9);
        }
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// Measurement – one row of an export
// ---------------------------------------------------------------------------

/// A single sample. `values` is aligned with the owning dataset's metric
/// schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub cell_id: CellId,
    pub time: Timestamp,
    pub values: Vec<f64>,
}

impl Measurement {
    pub fn new(cell_id: CellId, time: Timestamp, values: Vec<f64>) -> Self {
        Measurement {
            cell_id,
            time,
            values,
        }
    }
}

// ---------------------------------------------------------------------------
// MeasurementDataset – one cleaned export file
// ---------------------------------------------------------------------------

/// A cleaned measurement table: uniform metric schema, no missing values.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementDataset {
    metrics: Vec<Metric>,
    rows: Vec<Measurement>,
    /// Distinct cell ids in order of first appearance.
    cell_ids: Vec<CellId>,
}

impl MeasurementDataset {
    /// Validate the rows against the schema and index the cell ids.
    pub fn new(metrics: Vec<Metric>, rows: Vec<Measurement>) -> Result<Self, SchemaError> {
        let mut seen_metrics = HashSet::new();
        for m in &metrics {
            if !seen_metrics.insert(m) {
                return Err(SchemaError::DuplicateMetric(m.clone()));
            }
        }

        let mut seen_cells = HashSet::new();
        let mut cell_ids = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            if row.values.len() != metrics.len() {
                return Err(SchemaError::RowShape {
                    row: i,
                    expected: metrics.len(),
                    found: row.values.len(),
                });
            }
            if seen_cells.insert(&row.cell_id) {
                cell_ids.push(row.cell_id.clone());
            }
        }

        Ok(MeasurementDataset {
            metrics,
            rows,
            cell_ids,
        })
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn rows(&self) -> &[Measurement] {
        &self.rows
    }

    pub fn cell_ids(&self) -> &[CellId] {
        &self.cell_ids
    }

    /// Column index of `metric`, or a [`SchemaError`] naming what exists.
    pub fn metric_index(&self, metric: &Metric) -> Result<usize, SchemaError> {
        self.metrics
            .iter()
            .position(|m| m == metric)
            .ok_or_else(|| SchemaError::missing(metric, &self.metrics))
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no samples.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
