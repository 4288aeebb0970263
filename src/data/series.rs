use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::filter::cell_indices;
use super::model::{CellId, Measurement, MeasurementDataset, Metric};
use crate::error::SchemaError;

// ---------------------------------------------------------------------------
// Plot kinds and axes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlotKind {
    #[default]
    Scatter,
    Line,
    Bar,
}

impl PlotKind {
    pub const ALL: [PlotKind; 3] = [PlotKind::Scatter, PlotKind::Line, PlotKind::Bar];
}

impl fmt::Display for PlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlotKind::Scatter => write!(f, "Scatter"),
            PlotKind::Line => write!(f, "Line"),
            PlotKind::Bar => write!(f, "Bar"),
        }
    }
}

/// A plottable column: the sample time or any metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Axis {
    Time,
    Metric(Metric),
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Time => write!(f, "Time"),
            Axis::Metric(m) => match m.unit() {
                "" => write!(f, "{m}"),
                unit => write!(f, "{m} ({unit})"),
            },
        }
    }
}

/// `Time` followed by every metric of the dataset.
pub fn axis_options(dataset: &MeasurementDataset) -> Vec<Axis> {
    std::iter::once(Axis::Time)
        .chain(dataset.metrics().iter().cloned().map(Axis::Metric))
        .collect()
}

enum Column {
    Time,
    Metric(usize),
}

impl Column {
    fn resolve(dataset: &MeasurementDataset, axis: &Axis) -> Result<Self, SchemaError> {
        match axis {
            Axis::Time => Ok(Column::Time),
            Axis::Metric(m) => dataset.metric_index(m).map(Column::Metric),
        }
    }

    fn value(&self, row: &Measurement) -> f64 {
        match self {
            Column::Time => row.time.seconds,
            Column::Metric(i) => row.values[*i],
        }
    }
}

// ---------------------------------------------------------------------------
// Per-cell series
// ---------------------------------------------------------------------------

/// Points of one cell, in dataset order.
#[derive(Debug, Clone, PartialEq)]
pub struct CellSeries {
    pub cell_id: CellId,
    pub points: Vec<[f64; 2]>,
}

/// Split the (x, y) columns into one series per cell, optionally keeping a
/// single cell. Series follow first-occurrence order of the cells.
pub fn series_by_cell(
    dataset: &MeasurementDataset,
    x: &Axis,
    y: &Axis,
    cell: Option<&CellId>,
) -> Result<Vec<CellSeries>, SchemaError> {
    let x_col = Column::resolve(dataset, x)?;
    let y_col = Column::resolve(dataset, y)?;

    let mut slots: HashMap<&CellId, usize> = HashMap::new();
    let mut series: Vec<CellSeries> = Vec::new();
    for idx in cell_indices(dataset, cell) {
        let row = &dataset.rows()[idx];
        let slot = *slots.entry(&row.cell_id).or_insert_with(|| {
            series.push(CellSeries {
                cell_id: row.cell_id.clone(),
                points: Vec::new(),
            });
            series.len() - 1
        });
        series[slot].points.push([x_col.value(row), y_col.value(row)]);
    }
    Ok(series)
}

/// Bar width that keeps neighbouring bars apart: 80 % of the smallest gap
/// between distinct x positions, or 1.0 when there is no gap to measure.
pub fn bar_width(series: &[CellSeries]) -> f64 {
    let mut xs: Vec<f64> = series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p[0]))
        .filter(|x| x.is_finite())
        .collect();
    xs.sort_by(f64::total_cmp);
    xs.dedup();

    let gap = xs
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold(f64::INFINITY, f64::min);
    if gap.is_finite() && gap > 0.0 {
        gap * 0.8
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Timestamp;

    fn dataset() -> MeasurementDataset {
        let rows = vec![
            Measurement::new(CellId::Integer(7), Timestamp::parse("10:00:00", 0.0), vec![-90.0, 5.0]),
            Measurement::new(CellId::Integer(3), Timestamp::parse("10:00:01", 1.0), vec![-95.0, 3.0]),
            Measurement::new(CellId::Integer(7), Timestamp::parse("10:00:02", 2.0), vec![-85.0, 9.0]),
        ];
        MeasurementDataset::new(vec![Metric::Rsrp, Metric::Cinr], rows).unwrap()
    }

    #[test]
    fn axis_options_start_with_time() {
        let axes = axis_options(&dataset());
        assert_eq!(
            axes,
            vec![Axis::Time, Axis::Metric(Metric::Rsrp), Axis::Metric(Metric::Cinr)]
        );
        assert_eq!(axes[1].to_string(), "RSRP (dBm)");
    }

    #[test]
    fn splits_points_by_cell() {
        let series = series_by_cell(
            &dataset(),
            &Axis::Metric(Metric::Rsrp),
            &Axis::Metric(Metric::Cinr),
            None,
        )
        .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].cell_id, CellId::Integer(7));
        assert_eq!(series[0].points, vec![[-90.0, 5.0], [-85.0, 9.0]]);
        assert_eq!(series[1].points, vec![[-95.0, 3.0]]);
    }

    #[test]
    fn time_axis_uses_parsed_seconds() {
        let series = series_by_cell(
            &dataset(),
            &Axis::Time,
            &Axis::Metric(Metric::Rsrp),
            Some(&CellId::Integer(3)),
        )
        .unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].points, vec![[36_001.0, -95.0]]);
    }

    #[test]
    fn unknown_axis_is_schema_error() {
        let err = series_by_cell(
            &dataset(),
            &Axis::Time,
            &Axis::Metric(Metric::Custom("Speed".into())),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::MissingColumn { .. }));
    }

    #[test]
    fn bar_width_follows_smallest_gap() {
        let series = vec![CellSeries {
            cell_id: CellId::Integer(1),
            points: vec![[0.0, 1.0], [2.0, 1.0], [2.0, 3.0], [7.0, 1.0]],
        }];
        assert!((bar_width(&series) - 1.6).abs() < 1e-12);
        assert_eq!(bar_width(&[]), 1.0);
    }
}
