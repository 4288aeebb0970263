use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::model::{CellId, MeasurementDataset, Metric};

// ---------------------------------------------------------------------------
// Threshold filters: one per metric
// ---------------------------------------------------------------------------

/// Quality threshold for one metric. A sample passes when its value is
/// strictly greater than `threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdFilter {
    pub enabled: bool,
    pub threshold: f64,
}

impl ThresholdFilter {
    pub fn enabled(threshold: f64) -> Self {
        ThresholdFilter {
            enabled: true,
            threshold,
        }
    }

    #[cfg(test)]
    pub fn disabled(threshold: f64) -> Self {
        ThresholdFilter {
            enabled: false,
            threshold,
        }
    }

    /// Strict `>`; a NaN threshold or value never passes.
    pub fn passes(&self, value: f64) -> bool {
        value > self.threshold
    }
}

/// Per-metric threshold configuration. Any number of metrics may be listed.
pub type FilterConfig = BTreeMap<Metric, ThresholdFilter>;

/// RSRP above -100 dBm and CINR above 4 dB, both enabled.
pub fn default_filters() -> FilterConfig {
    BTreeMap::from([
        (Metric::Rsrp, ThresholdFilter::enabled(-100.0)),
        (Metric::Cinr, ThresholdFilter::enabled(4.0)),
    ])
}

// ---------------------------------------------------------------------------
// Cell selection for plots
// ---------------------------------------------------------------------------

/// Return indices of rows measured on `cell`, or every row when no cell is
/// selected.
pub fn cell_indices(dataset: &MeasurementDataset, cell: Option<&CellId>) -> Vec<usize> {
    dataset
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| cell.map_or(true, |c| &row.cell_id == c))
        .map(|(i, _)| i)
        .collect()
}
