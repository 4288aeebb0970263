use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::data::model::Metric;

/// A request that does not fit the shape of a [`MeasurementDataset`].
///
/// [`MeasurementDataset`]: crate::data::model::MeasurementDataset
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("column '{column}' is not present in the dataset (available: {available})")]
    MissingColumn { column: String, available: String },
    #[error("row {row} has {found} metric values, schema declares {expected}")]
    RowShape {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("metric '{0}' is declared more than once")]
    DuplicateMetric(Metric),
}

impl SchemaError {
    /// Build a [`SchemaError::MissingColumn`] listing what the dataset does offer.
    pub fn missing<'a>(column: impl ToString, available: impl IntoIterator<Item = &'a Metric>) -> Self {
        let available = available
            .into_iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        SchemaError::MissingColumn {
            column: column.to_string(),
            available,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse JSON configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Configuration file not found at {path}")]
    NotFound { path: PathBuf },
}
