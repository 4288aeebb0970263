use eframe::egui::Ui;
use egui_extras::{Column, TableBuilder};

use crate::data::aggregate::AggregationResult;
use crate::data::filter::FilterConfig;
use crate::data::model::Metric;

const ROW_HEIGHT: f32 = 18.0;

/// Per-cell sample counts and pass percentages, with an overall row.
/// Disabled metrics are marked so their 0 is not read as a 0 % pass rate.
pub fn percentage_table(ui: &mut Ui, result: &AggregationResult, filters: &FilterConfig) {
    let metrics: Vec<&Metric> = result.metrics().collect();
    let enabled: Vec<bool> = metrics
        .iter()
        .map(|m| filters.get(*m).is_some_and(|f| f.enabled))
        .collect();
    let total: usize = result.per_cell.iter().map(|c| c.samples).sum();

    TableBuilder::new(ui)
        .striped(true)
        .vscroll(false)
        .column(Column::auto().at_least(80.0))
        .column(Column::auto().at_least(70.0))
        .columns(Column::auto().at_least(110.0), metrics.len())
        .header(20.0, |mut header| {
            header.col(|ui| {
                ui.strong("Cell ID");
            });
            header.col(|ui| {
                ui.strong("Samples");
            });
            for (metric, on) in metrics.iter().zip(&enabled) {
                header.col(|ui| {
                    if *on {
                        ui.strong(format!("{metric} %"));
                    } else {
                        ui.strong(format!("{metric} % (disabled)"));
                    }
                });
            }
        })
        .body(|mut body| {
            for cell in &result.per_cell {
                body.row(ROW_HEIGHT, |mut row| {
                    row.col(|ui| {
                        ui.label(cell.cell_id.to_string());
                    });
                    row.col(|ui| {
                        ui.label(cell.samples.to_string());
                    });
                    for metric in &metrics {
                        let pct = cell.percentages.get(*metric).copied().unwrap_or(0.0);
                        row.col(|ui| {
                            ui.label(format!("{pct:.1}"));
                        });
                    }
                });
            }
            body.row(ROW_HEIGHT, |mut row| {
                row.col(|ui| {
                    ui.strong("All");
                });
                row.col(|ui| {
                    ui.strong(total.to_string());
                });
                for metric in &metrics {
                    let pct = result.overall(metric).unwrap_or(0.0);
                    row.col(|ui| {
                        ui.strong(format!("{pct:.1}"));
                    });
                }
            });
        });
}
