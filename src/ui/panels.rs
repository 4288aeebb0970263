use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::model::{CellId, Metric};
use crate::data::series::{Axis, PlotKind, axis_options};
use crate::state::{AppState, ExportFormat};

// ---------------------------------------------------------------------------
// Left side panel – dataset selection and analysis controls
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            folder_section(ui, state);
            ui.separator();

            if state.catalog().is_none() {
                ui.label("No folder loaded.");
                return;
            }

            file_section(ui, state);
            ui.separator();

            if state.dataset().is_none() {
                return;
            }

            plot_section(ui, state);
            ui.separator();
            threshold_section(ui, state);
            ui.separator();
            cell_section(ui, state);
        });

    // Rebuild charts once per frame, after all widgets had their say.
    state.recompute_if_dirty();
}

fn folder_section(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Folder");
    let response = ui.text_edit_singleline(&mut state.folder_input);
    let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
    ui.horizontal(|ui: &mut Ui| {
        if ui.button("Load").clicked() || submitted {
            let folder = std::path::PathBuf::from(state.folder_input.trim());
            state.open_folder(&folder);
        }
        if ui.button("Browse…").clicked() {
            open_folder_dialog(state);
        }
    });
}

fn file_section(ui: &mut Ui, state: &mut AppState) {
    let Some(catalog) = state.catalog() else {
        return;
    };
    // Clone what we need so we can mutate state afterwards.
    let files: Vec<String> = catalog.file_names().map(str::to_string).collect();
    let skipped = catalog.skipped.clone();

    ui.strong("Export file");
    let current = state.selected_file.clone().unwrap_or_default();
    let mut chosen = None;
    egui::ComboBox::from_id_salt("export_file")
        .selected_text(current.as_str())
        .width(ui.available_width())
        .show_ui(ui, |ui: &mut Ui| {
            for file in &files {
                if ui.selectable_label(current == *file, file.as_str()).clicked() {
                    chosen = Some(file.clone());
                }
            }
        });
    if let Some(file) = chosen {
        if Some(&file) != state.selected_file.as_ref() {
            state.select_file(&file);
        }
    }

    if !skipped.is_empty() {
        egui::CollapsingHeader::new(
            RichText::new(format!("Skipped files ({})", skipped.len())).color(Color32::YELLOW),
        )
        .id_salt("skipped_files")
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            for file in &skipped {
                ui.label(RichText::new(&file.file_name).strong());
                ui.label(RichText::new(&file.reason).small().color(Color32::LIGHT_RED));
            }
        });
    }
}

fn plot_section(ui: &mut Ui, state: &mut AppState) {
    let Some(dataset) = state.dataset() else {
        return;
    };
    let axes = axis_options(dataset);

    ui.strong("Plot");
    let mut kind = state.plot_kind;
    egui::ComboBox::from_id_salt("plot_kind")
        .selected_text(kind.to_string())
        .show_ui(ui, |ui: &mut Ui| {
            for k in PlotKind::ALL {
                ui.selectable_value(&mut kind, k, k.to_string());
            }
        });
    state.set_plot_kind(kind);

    let mut x = state.x_axis.clone();
    let mut y = state.y_axis.clone();
    axis_combo(ui, "x_axis", "X axis", &mut x, &axes);
    axis_combo(ui, "y_axis", "Y axis", &mut y, &axes);
    state.set_axes(x, y);
}

fn axis_combo(ui: &mut Ui, id: &str, label: &str, value: &mut Axis, options: &[Axis]) {
    ui.horizontal(|ui: &mut Ui| {
        ui.label(label);
        egui::ComboBox::from_id_salt(id)
            .selected_text(value.to_string())
            .show_ui(ui, |ui: &mut Ui| {
                for axis in options {
                    ui.selectable_value(value, axis.clone(), axis.to_string());
                }
            });
    });
}

fn threshold_section(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Thresholds");
    ui.label(RichText::new("Share of samples strictly above each threshold").small());

    let mut changed = false;
    for (metric, filter) in state.filters.iter_mut() {
        ui.horizontal(|ui: &mut Ui| {
            changed |= ui
                .checkbox(&mut filter.enabled, metric.to_string())
                .changed();
            let drag = egui::DragValue::new(&mut filter.threshold)
                .speed(0.5)
                .suffix(threshold_suffix(metric));
            changed |= ui.add_enabled(filter.enabled, drag).changed();
        });
    }
    if changed {
        state.mark_dirty();
    }
}

fn threshold_suffix(metric: &Metric) -> String {
    match metric.unit() {
        "" => String::new(),
        unit => format!(" {unit}"),
    }
}

fn cell_section(ui: &mut Ui, state: &mut AppState) {
    let Some(dataset) = state.dataset() else {
        return;
    };
    let cells: Vec<CellId> = dataset.cell_ids().to_vec();

    ui.strong("Cell");
    let mut selected = state.selected_cell.clone();
    let label = selected
        .as_ref()
        .map_or_else(|| "All cells".to_string(), |c| c.to_string());
    egui::ComboBox::from_id_salt("cell_id")
        .selected_text(label)
        .show_ui(ui, |ui: &mut Ui| {
            ui.selectable_value(&mut selected, None, "All cells");
            for cell in &cells {
                ui.selectable_value(&mut selected, Some(cell.clone()), cell.to_string());
            }
        });
    if selected != state.selected_cell {
        state.select_cell(selected);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open folder…").clicked() {
                open_folder_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.folder.is_some(), egui::Button::new("Reload"))
                .clicked()
            {
                state.reload_folder();
                ui.close_menu();
            }
            ui.separator();
            let can_export = matches!(&state.analysis, Some(a) if a.percentages.is_ok());
            if ui
                .add_enabled(can_export, egui::Button::new("Export percentages (JSON)…"))
                .clicked()
            {
                save_export_dialog(state, ExportFormat::Json);
                ui.close_menu();
            }
            if ui
                .add_enabled(can_export, egui::Button::new("Export percentages (CSV)…"))
                .clicked()
            {
                save_export_dialog(state, ExportFormat::Csv);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(catalog) = state.catalog() {
            ui.label(format!(
                "{} files loaded, {} skipped",
                catalog.datasets.len(),
                catalog.skipped.len()
            ));
        }
        if let Some(ds) = state.dataset() {
            ui.separator();
            ui.label(format!(
                "{} samples, {} cells",
                ds.len(),
                ds.cell_ids().len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_folder_dialog(state: &mut AppState) {
    let folder = rfd::FileDialog::new()
        .set_title("Open folder of measurement exports")
        .pick_folder();

    if let Some(path) = folder {
        state.open_folder(&path);
        if let Some(catalog) = state.catalog() {
            log::info!(
                "Opened {} with {} exports",
                catalog.folder.display(),
                catalog.datasets.len()
            );
        }
    }
}

fn save_export_dialog(state: &mut AppState, format: ExportFormat) {
    let stem = state
        .selected_file
        .as_deref()
        .and_then(|f| std::path::Path::new(f).file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "percentages".into());

    let (ext, label) = match format {
        ExportFormat::Json => ("json", "JSON"),
        ExportFormat::Csv => ("csv", "CSV"),
    };
    let file = rfd::FileDialog::new()
        .set_title("Export percentages")
        .set_file_name(format!("{stem}_percentages.{ext}"))
        .add_filter(label, &[ext])
        .save_file();

    if let Some(path) = file {
        state.export_percentages(&path, format);
    }
}
