use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use super::filter::{FilterConfig, ThresholdFilter};
use super::model::{CellId, MeasurementDataset, Metric};
use crate::error::SchemaError;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Pass percentages of a single cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellPercentages {
    pub cell_id: CellId,
    /// Number of samples measured on this cell.
    pub samples: usize,
    pub percentages: BTreeMap<Metric, f64>,
}

/// Dataset-wide and per-cell share of samples above each metric's threshold.
///
/// Disabled metrics are reported as `0`, same as a 0 % pass rate; keep the
/// [`FilterConfig`] around if the two must be told apart.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AggregationResult {
    pub overall: BTreeMap<Metric, f64>,
    /// Cells in order of first appearance in the dataset.
    pub per_cell: Vec<CellPercentages>,
}

impl AggregationResult {
    pub fn overall(&self, metric: &Metric) -> Option<f64> {
        self.overall.get(metric).copied()
    }

    #[cfg(test)]
    pub fn cell(&self, cell_id: &CellId) -> Option<&CellPercentages> {
        self.per_cell.iter().find(|c| &c.cell_id == cell_id)
    }

    /// Metrics reported in this result, in display order.
    pub fn metrics(&self) -> impl Iterator<Item = &Metric> {
        self.overall.keys()
    }

    /// Write the result as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self).context("writing JSON")?;
        Ok(())
    }

    /// Write the per-cell table as CSV: `Cell ID, Samples, <METRIC> %...`.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("creating {}", path.display()))?;

        let metrics: Vec<&Metric> = self.metrics().collect();
        let mut header = vec!["Cell ID".to_string(), "Samples".to_string()];
        header.extend(metrics.iter().map(|m| format!("{m} %")));
        writer.write_record(&header).context("writing CSV header")?;

        for cell in &self.per_cell {
            let mut record = vec![cell.cell_id.to_string(), cell.samples.to_string()];
            record.extend(
                metrics
                    .iter()
                    .map(|m| cell.percentages.get(*m).copied().unwrap_or(0.0).to_string()),
            );
            writer.write_record(&record).context("writing CSV row")?;
        }
        writer.flush().context("flushing CSV")?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// An enabled filter resolved against the dataset schema.
struct ActiveFilter {
    column: usize,
    filter: ThresholdFilter,
}

/// Running counts for one scope (whole dataset or one cell).
struct Tally {
    total: usize,
    /// One counter per active filter.
    passed: Vec<usize>,
}

impl Tally {
    fn new(n_filters: usize) -> Self {
        Tally {
            total: 0,
            passed: vec![0; n_filters],
        }
    }

    fn record(&mut self, values: &[f64], active: &[ActiveFilter]) {
        self.total += 1;
        for (count, active) in self.passed.iter_mut().zip(active) {
            if active.filter.passes(values[active.column]) {
                *count += 1;
            }
        }
    }

    /// Percentages for every configured metric; disabled ones are 0.
    fn percentages(&self, metrics: &[(Metric, Option<usize>)]) -> BTreeMap<Metric, f64> {
        metrics
            .iter()
            .map(|(metric, slot)| {
                let pct = slot.map_or(0.0, |i| percentage(self.passed[i], self.total));
                (metric.clone(), pct)
            })
            .collect()
    }
}

fn percentage(passed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * passed as f64 / total as f64
    }
}

/// Compute the share of samples strictly above each enabled threshold, for
/// the whole dataset and for every cell.
///
/// Every metric named in `filters` must be a column of `dataset`, enabled or
/// not; otherwise a [`SchemaError`] is returned before any row is read.
pub fn aggregate(
    dataset: &MeasurementDataset,
    filters: &FilterConfig,
) -> Result<AggregationResult, SchemaError> {
    // Resolve names to columns once; the row loop only sees indices.
    let mut active = Vec::new();
    let mut metrics = Vec::with_capacity(filters.len());
    for (metric, filter) in filters {
        let column = dataset.metric_index(metric)?;
        let slot = if filter.enabled {
            active.push(ActiveFilter {
                column,
                filter: *filter,
            });
            Some(active.len() - 1)
        } else {
            None
        };
        metrics.push((metric.clone(), slot));
    }

    if dataset.is_empty() {
        return Ok(AggregationResult {
            overall: metrics.into_iter().map(|(m, _)| (m, 0.0)).collect(),
            per_cell: Vec::new(),
        });
    }

    let mut overall = Tally::new(active.len());
    let mut slots: HashMap<&CellId, usize> = HashMap::with_capacity(dataset.cell_ids().len());
    let mut cells: Vec<(&CellId, Tally)> = Vec::with_capacity(dataset.cell_ids().len());

    for row in dataset.rows() {
        overall.record(&row.values, &active);
        let slot = *slots.entry(&row.cell_id).or_insert_with(|| {
            cells.push((&row.cell_id, Tally::new(active.len())));
            cells.len() - 1
        });
        cells[slot].1.record(&row.values, &active);
    }

    let per_cell = cells
        .into_iter()
        .filter(|(_, tally)| tally.total > 0)
        .map(|(cell_id, tally)| CellPercentages {
            cell_id: cell_id.clone(),
            samples: tally.total,
            percentages: tally.percentages(&metrics),
        })
        .collect();

    Ok(AggregationResult {
        overall: overall.percentages(&metrics),
        per_cell,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Measurement, Timestamp};
    use proptest::prelude::*;

    fn cell(id: &str) -> CellId {
        CellId::Text(id.to_string())
    }

    fn rsrp_dataset(samples: &[(&str, f64)]) -> MeasurementDataset {
        let rows = samples
            .iter()
            .enumerate()
            .map(|(i, (id, rsrp))| Measurement::new(cell(id), Timestamp::from_index(i), vec![*rsrp]))
            .collect();
        MeasurementDataset::new(vec![Metric::Rsrp], rows).unwrap()
    }

    fn scenario() -> MeasurementDataset {
        rsrp_dataset(&[("A", -90.0), ("A", -110.0), ("B", -95.0), ("B", -80.0)])
    }

    fn rsrp_filter(filter: ThresholdFilter) -> FilterConfig {
        FilterConfig::from([(Metric::Rsrp, filter)])
    }

    #[test]
    fn percentages_per_cell_and_overall() {
        let result = aggregate(&scenario(), &rsrp_filter(ThresholdFilter::enabled(-100.0))).unwrap();

        assert_eq!(result.overall(&Metric::Rsrp), Some(75.0));
        assert_eq!(result.per_cell.len(), 2);
        assert_eq!(result.per_cell[0].cell_id, cell("A"));
        assert_eq!(result.per_cell[0].samples, 2);
        assert_eq!(result.per_cell[0].percentages[&Metric::Rsrp], 50.0);
        assert_eq!(result.cell(&cell("B")).unwrap().percentages[&Metric::Rsrp], 100.0);
    }

    #[test]
    fn disabled_filter_reports_zero_everywhere() {
        let result = aggregate(&scenario(), &rsrp_filter(ThresholdFilter::disabled(-100.0))).unwrap();

        assert_eq!(result.overall(&Metric::Rsrp), Some(0.0));
        for c in &result.per_cell {
            assert_eq!(c.percentages[&Metric::Rsrp], 0.0);
        }
        assert_eq!(result.per_cell.len(), 2);
    }

    #[test]
    fn empty_dataset_short_circuits() {
        let ds = rsrp_dataset(&[]);
        let result = aggregate(&ds, &rsrp_filter(ThresholdFilter::enabled(-100.0))).unwrap();

        assert_eq!(result.overall(&Metric::Rsrp), Some(0.0));
        assert!(result.per_cell.is_empty());
    }

    #[test]
    fn filter_on_missing_column_is_schema_error() {
        let filters = FilterConfig::from([
            (Metric::Rsrp, ThresholdFilter::enabled(-100.0)),
            (Metric::Cinr, ThresholdFilter::enabled(4.0)),
        ]);
        let err = aggregate(&scenario(), &filters).unwrap_err();
        assert!(matches!(err, SchemaError::MissingColumn { ref column, .. } if column == "CINR"));
    }

    #[test]
    fn disabled_filter_on_missing_column_is_still_an_error() {
        let filters = FilterConfig::from([(Metric::Cinr, ThresholdFilter::disabled(4.0))]);
        assert!(aggregate(&scenario(), &filters).is_err());
        assert!(aggregate(&rsrp_dataset(&[]), &filters).is_err());
    }

    #[test]
    fn nan_threshold_passes_nothing() {
        let result = aggregate(&scenario(), &rsrp_filter(ThresholdFilter::enabled(f64::NAN))).unwrap();
        assert_eq!(result.overall(&Metric::Rsrp), Some(0.0));
        assert!(result.per_cell.iter().all(|c| c.percentages[&Metric::Rsrp] == 0.0));
    }

    #[test]
    fn cell_without_passing_rows_is_zero_not_missing() {
        let ds = rsrp_dataset(&[("A", -120.0), ("B", -70.0)]);
        let result = aggregate(&ds, &rsrp_filter(ThresholdFilter::enabled(-100.0))).unwrap();
        assert_eq!(result.cell(&cell("A")).unwrap().percentages[&Metric::Rsrp], 0.0);
        assert_eq!(result.overall(&Metric::Rsrp), Some(50.0));
    }

    #[test]
    fn metrics_are_independent() {
        let rows = vec![
            Measurement::new(cell("A"), Timestamp::from_index(0), vec![-90.0, 2.0]),
            Measurement::new(cell("A"), Timestamp::from_index(1), vec![-110.0, 10.0]),
            Measurement::new(cell("B"), Timestamp::from_index(2), vec![-95.0, 8.0]),
        ];
        let ds = MeasurementDataset::new(vec![Metric::Rsrp, Metric::Cinr], rows).unwrap();
        let filters = FilterConfig::from([
            (Metric::Rsrp, ThresholdFilter::enabled(-100.0)),
            (Metric::Cinr, ThresholdFilter::enabled(4.0)),
        ]);
        let result = aggregate(&ds, &filters).unwrap();

        let a = result.cell(&cell("A")).unwrap();
        assert_eq!(a.percentages[&Metric::Rsrp], 50.0);
        assert_eq!(a.percentages[&Metric::Cinr], 50.0);
        let overall_cinr = result.overall(&Metric::Cinr).unwrap();
        assert!((overall_cinr - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn exports_json_and_csv() {
        let result = aggregate(&scenario(), &rsrp_filter(ThresholdFilter::enabled(-100.0))).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("result.json");
        result.write_json(&json_path).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(json["overall"]["RSRP"], 75.0);
        assert_eq!(json["per_cell"][1]["cell_id"], "B");

        let csv_path = dir.path().join("result.csv");
        result.write_csv(&csv_path).unwrap();
        let text = std::fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Cell ID,Samples,RSRP %");
        assert_eq!(lines[1], "A,2,50");
        assert_eq!(lines[2], "B,2,100");
    }

    // -- properties --

    fn arb_rows() -> impl Strategy<Value = Vec<(i64, f64, f64)>> {
        prop::collection::vec((0i64..5, -140.0f64..-40.0, -20.0f64..30.0), 0..80)
    }

    fn build(rows: &[(i64, f64, f64)]) -> MeasurementDataset {
        let rows = rows
            .iter()
            .enumerate()
            .map(|(i, (id, rsrp, cinr))| {
                Measurement::new(CellId::Integer(*id), Timestamp::from_index(i), vec![*rsrp, *cinr])
            })
            .collect();
        MeasurementDataset::new(vec![Metric::Rsrp, Metric::Cinr], rows).unwrap()
    }

    fn filters(rsrp: f64, rsrp_on: bool, cinr: f64, cinr_on: bool) -> FilterConfig {
        FilterConfig::from([
            (Metric::Rsrp, ThresholdFilter { enabled: rsrp_on, threshold: rsrp }),
            (Metric::Cinr, ThresholdFilter { enabled: cinr_on, threshold: cinr }),
        ])
    }

    proptest! {
        #[test]
        fn percentages_stay_in_range(
            rows in arb_rows(),
            rsrp in -150.0f64..-30.0,
            cinr in -25.0f64..35.0,
        ) {
            let result = aggregate(&build(&rows), &filters(rsrp, true, cinr, true)).unwrap();
            for pct in result.overall.values() {
                prop_assert!((0.0..=100.0).contains(pct));
            }
            for c in &result.per_cell {
                for pct in c.percentages.values() {
                    prop_assert!((0.0..=100.0).contains(pct));
                }
            }
        }

        #[test]
        fn disabled_metric_is_zero(rows in arb_rows(), rsrp in -150.0f64..-30.0) {
            let result = aggregate(&build(&rows), &filters(rsrp, true, 0.0, false)).unwrap();
            prop_assert_eq!(result.overall(&Metric::Cinr), Some(0.0));
            for c in &result.per_cell {
                prop_assert_eq!(c.percentages[&Metric::Cinr], 0.0);
            }
        }

        #[test]
        fn raising_threshold_never_raises_percentage(
            rows in arb_rows(),
            low in -150.0f64..-30.0,
            delta in 0.0f64..50.0,
        ) {
            let ds = build(&rows);
            let lo = aggregate(&ds, &filters(low, true, 0.0, true)).unwrap();
            let hi = aggregate(&ds, &filters(low + delta, true, 0.0, true)).unwrap();
            prop_assert!(hi.overall[&Metric::Rsrp] <= lo.overall[&Metric::Rsrp]);
            for (h, l) in hi.per_cell.iter().zip(&lo.per_cell) {
                prop_assert_eq!(&h.cell_id, &l.cell_id);
                prop_assert!(h.percentages[&Metric::Rsrp] <= l.percentages[&Metric::Rsrp]);
            }
        }

        #[test]
        fn every_cell_is_reported(rows in arb_rows()) {
            let ds = build(&rows);
            let result = aggregate(&ds, &filters(-100.0, true, 4.0, true)).unwrap();
            let reported: Vec<&CellId> = result.per_cell.iter().map(|c| &c.cell_id).collect();
            let expected: Vec<&CellId> = ds.cell_ids().iter().collect();
            prop_assert_eq!(reported, expected);
            let samples: usize = result.per_cell.iter().map(|c| c.samples).sum();
            prop_assert_eq!(samples, ds.len());
        }

        #[test]
        fn overall_is_weighted_mean_of_cells(
            rows in arb_rows(),
            rsrp in -150.0f64..-30.0,
            cinr in -25.0f64..35.0,
        ) {
            let ds = build(&rows);
            prop_assume!(!ds.is_empty());
            let result = aggregate(&ds, &filters(rsrp, true, cinr, true)).unwrap();
            for metric in [Metric::Rsrp, Metric::Cinr] {
                let weighted: f64 = result
                    .per_cell
                    .iter()
                    .map(|c| c.percentages[&metric] * c.samples as f64)
                    .sum::<f64>()
                    / ds.len() as f64;
                prop_assert!((weighted - result.overall[&metric]).abs() < 1e-9);
            }
        }

        #[test]
        fn empty_dataset_is_all_zero(rsrp in -150.0f64..-30.0, on in any::<bool>()) {
            let result = aggregate(&build(&[]), &filters(rsrp, on, 4.0, true)).unwrap();
            prop_assert!(result.overall.values().all(|v| *v == 0.0));
            prop_assert!(result.per_cell.is_empty());
        }
    }
}
