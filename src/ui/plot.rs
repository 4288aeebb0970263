use eframe::egui::{Color32, RichText, ScrollArea, Ui};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, Points};

use crate::color::{CellColors, generate_palette};
use crate::data::aggregate::AggregationResult;
use crate::data::filter::FilterConfig;
use crate::data::model::Metric;
use crate::data::series::{Axis, CellSeries, PlotKind, bar_width};
use crate::error::SchemaError;
use crate::state::{AppState, Analysis};
use crate::ui::table;

const PLOT_HEIGHT: f32 = 280.0;

// ---------------------------------------------------------------------------
// Central panel – all charts for the selected export
// ---------------------------------------------------------------------------

/// Render the chart column in the central panel.
pub fn analysis_view(ui: &mut Ui, state: &AppState) {
    let analysis = match &state.analysis {
        Some(a) => a,
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Open a folder of drive-test exports  (File → Open folder…)");
            });
            return;
        }
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            main_charts(ui, state, analysis);
            ui.add_space(12.0);

            ui.heading("Percentage of Values Above Threshold");
            match &analysis.percentages {
                Ok(result) => {
                    overall_summary(ui, result, &state.filters);
                    percentage_chart(ui, result, &state.filters);
                    ui.add_space(8.0);
                    table::percentage_table(ui, result, &state.filters);
                }
                Err(e) => schema_error(ui, e),
            }
        });
}

fn main_charts(ui: &mut Ui, state: &AppState, analysis: &Analysis) {
    ui.heading(format!("{} vs {}", state.y_axis, state.x_axis));
    series_plot(
        ui,
        "main_plot",
        &analysis.main,
        state.plot_kind,
        (&state.x_axis, &state.y_axis),
        &analysis.colors,
    );
    ui.add_space(12.0);

    let rsrp = Axis::Metric(Metric::Rsrp);
    ui.heading("RSRP over time");
    series_plot(
        ui,
        "rsrp_over_time",
        &analysis.rsrp_over_time,
        PlotKind::Line,
        (&Axis::Time, &rsrp),
        &analysis.colors,
    );
    ui.add_space(12.0);

    let cinr = Axis::Metric(Metric::Cinr);
    ui.heading("CINR over time");
    series_plot(
        ui,
        "cinr_over_time",
        &analysis.cinr_over_time,
        PlotKind::Line,
        (&Axis::Time, &cinr),
        &analysis.colors,
    );
}

/// Draw per-cell series as points, lines or bars.
fn series_plot(
    ui: &mut Ui,
    id: &str,
    series: &Result<Vec<CellSeries>, SchemaError>,
    kind: PlotKind,
    (x, y): (&Axis, &Axis),
    colors: &CellColors,
) {
    let series = match series {
        Ok(s) => s,
        Err(e) => {
            schema_error(ui, e);
            return;
        }
    };
    let width = bar_width(series);

    Plot::new(id)
        .legend(Legend::default())
        .height(PLOT_HEIGHT)
        .x_axis_label(x.to_string())
        .y_axis_label(y.to_string())
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for s in series {
                let color = colors.color_for(&s.cell_id);
                let name = format!("Cell {}", s.cell_id);
                match kind {
                    PlotKind::Scatter => plot_ui.points(
                        Points::new(s.points.clone())
                            .name(&name)
                            .color(color)
                            .radius(2.0),
                    ),
                    PlotKind::Line => plot_ui.line(
                        Line::new(s.points.clone())
                            .name(&name)
                            .color(color)
                            .width(1.5),
                    ),
                    PlotKind::Bar => {
                        let bars = s
                            .points
                            .iter()
                            .map(|p| Bar::new(p[0], p[1]).width(width))
                            .collect();
                        plot_ui.bar_chart(BarChart::new(bars).name(&name).color(color));
                    }
                }
            }
        });
}

fn overall_summary(ui: &mut Ui, result: &AggregationResult, filters: &FilterConfig) {
    ui.horizontal_wrapped(|ui: &mut Ui| {
        ui.label("Overall:");
        for metric in result.metrics() {
            let text = match filters.get(metric) {
                Some(f) if f.enabled => format!(
                    "{metric} > {} {}: {:.1} %",
                    f.threshold,
                    metric.unit(),
                    result.overall(metric).unwrap_or(0.0)
                ),
                _ => format!("{metric}: disabled"),
            };
            ui.label(RichText::new(text).strong());
        }
    });
}

/// Grouped bars: one group per cell, one bar per metric.
fn percentage_chart(ui: &mut Ui, result: &AggregationResult, filters: &FilterConfig) {
    let metrics: Vec<&Metric> = result.metrics().collect();
    if metrics.is_empty() || result.per_cell.is_empty() {
        ui.label("No samples.");
        return;
    }
    let palette = generate_palette(metrics.len());
    let group_width = 0.8;
    let bar_w = group_width / metrics.len() as f64;
    let labels: Vec<String> = result
        .per_cell
        .iter()
        .map(|c| c.cell_id.to_string())
        .collect();

    Plot::new("percentage_plot")
        .legend(Legend::default())
        .height(PLOT_HEIGHT)
        .x_axis_label("Cell ID")
        .y_axis_label("% above threshold")
        .include_y(0.0)
        .include_y(100.0)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .x_axis_formatter(move |mark, _range| {
            let i = mark.value.round();
            if (mark.value - i).abs() < 1e-6 && i >= 0.0 {
                labels.get(i as usize).cloned().unwrap_or_default()
            } else {
                String::new()
            }
        })
        .show(ui, |plot_ui| {
            for (j, metric) in metrics.iter().enumerate() {
                let offset = (j as f64 + 0.5) * bar_w - group_width / 2.0;
                let bars = result
                    .per_cell
                    .iter()
                    .enumerate()
                    .map(|(i, c)| {
                        let pct = c.percentages.get(*metric).copied().unwrap_or(0.0);
                        Bar::new(i as f64 + offset, pct)
                            .width(bar_w)
                            .name(format!("Cell {}", c.cell_id))
                    })
                    .collect();
                let enabled = filters.get(*metric).is_some_and(|f| f.enabled);
                let name = if enabled {
                    format!("{metric} %")
                } else {
                    format!("{metric} % (disabled)")
                };
                plot_ui.bar_chart(BarChart::new(bars).name(name).color(palette[j]));
            }
        });
}

fn schema_error(ui: &mut Ui, e: &SchemaError) {
    ui.label(RichText::new(format!("⚠ {e}")).color(Color32::RED));
}
