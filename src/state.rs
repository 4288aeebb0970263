use std::path::{Path, PathBuf};

use crate::color::CellColors;
use crate::config::ViewerConfig;
use crate::data::aggregate::{AggregationResult, aggregate};
use crate::data::cache::DatasetCache;
use crate::data::filter::FilterConfig;
use crate::data::loader::FolderCatalog;
use crate::data::model::{CellId, MeasurementDataset, Metric};
use crate::data::series::{Axis, CellSeries, PlotKind, series_by_cell};
use crate::error::SchemaError;

// ---------------------------------------------------------------------------
// Derived view data
// ---------------------------------------------------------------------------

/// Everything the charts draw for the selected file, rebuilt by
/// [`AppState::recompute`].
#[derive(Debug, Clone)]
pub struct Analysis {
    pub main: Result<Vec<CellSeries>, SchemaError>,
    pub rsrp_over_time: Result<Vec<CellSeries>, SchemaError>,
    pub cinr_over_time: Result<Vec<CellSeries>, SchemaError>,
    pub percentages: Result<AggregationResult, SchemaError>,
    pub colors: CellColors,
}

impl Analysis {
    fn build(
        dataset: &MeasurementDataset,
        x: &Axis,
        y: &Axis,
        cell: Option<&CellId>,
        filters: &FilterConfig,
    ) -> Self {
        let over_time = |metric: Metric| series_by_cell(dataset, &Axis::Time, &Axis::Metric(metric), cell);
        Analysis {
            main: series_by_cell(dataset, x, y, cell),
            rsrp_over_time: over_time(Metric::Rsrp),
            cinr_over_time: over_time(Metric::Cinr),
            percentages: aggregate(dataset, filters),
            colors: CellColors::new(dataset.cell_ids()),
        }
    }
}

/// Export formats for the percentage table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Folders loaded so far.
    pub cache: DatasetCache,

    /// Contents of the folder text field.
    pub folder_input: String,

    /// Folder currently shown (None until one loads).
    pub folder: Option<PathBuf>,

    /// File name within `folder`.
    pub selected_file: Option<String>,

    pub plot_kind: PlotKind,
    pub x_axis: Axis,
    pub y_axis: Axis,

    /// Per-metric thresholds, edited in the side panel.
    pub filters: FilterConfig,

    /// Restricts the plots (not the percentages) to one cell.
    pub selected_cell: Option<CellId>,

    /// Charts for the selected file (None until a file is selected).
    pub analysis: Option<Analysis>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        AppState::from_config(&ViewerConfig::default())
    }
}

impl AppState {
    pub fn from_config(config: &ViewerConfig) -> Self {
        let mut state = Self {
            cache: DatasetCache::new(config.columns.clone()),
            folder_input: String::new(),
            folder: None,
            selected_file: None,
            plot_kind: config.plot_kind,
            x_axis: Axis::Metric(Metric::Rsrp),
            y_axis: Axis::Metric(Metric::Cinr),
            filters: config.filters.clone(),
            selected_cell: None,
            analysis: None,
            status_message: None,
            dirty: false,
        };
        if let Some(folder) = &config.data_folder {
            state.open_folder(folder);
        }
        state
    }

    /// Load (or reuse) a folder and select its first file.
    pub fn open_folder(&mut self, folder: &Path) {
        self.folder_input = folder.display().to_string();
        let loaded = self
            .cache
            .get_or_load(folder)
            .map(|catalog| catalog.file_names().next().map(str::to_string));
        match loaded {
            Ok(first) => self.after_folder_loaded(folder, first),
            Err(e) => self.folder_failed(e),
        }
    }

    /// Re-read the current folder from disk, keeping the selection if the
    /// file still loads.
    pub fn reload_folder(&mut self) {
        let Some(folder) = self.folder.clone() else {
            return;
        };
        let previous = self.selected_file.clone();
        let loaded = self.cache.reload(&folder).map(|catalog| {
            previous
                .filter(|f| catalog.datasets.contains_key(f))
                .or_else(|| catalog.file_names().next().map(str::to_string))
        });
        match loaded {
            Ok(file) => self.after_folder_loaded(&folder, file),
            Err(e) => {
                // The cached catalog is gone; drop everything built on it.
                self.folder = None;
                self.selected_file = None;
                self.selected_cell = None;
                self.analysis = None;
                self.folder_failed(e);
            }
        }
    }

    fn after_folder_loaded(&mut self, folder: &Path, file: Option<String>) {
        self.folder = Some(folder.to_path_buf());
        self.status_message = None;
        match file {
            Some(name) => self.select_file(&name),
            None => {
                self.selected_file = None;
                self.analysis = None;
                self.status_message = Some(format!(
                    "No loadable exports in {}",
                    folder.display()
                ));
            }
        }
    }

    fn folder_failed(&mut self, e: anyhow::Error) {
        log::error!("Failed to open folder: {e:#}");
        self.status_message = Some(format!("Error: {e:#}"));
    }

    pub fn catalog(&self) -> Option<&FolderCatalog> {
        self.cache.get(self.folder.as_deref()?)
    }

    pub fn dataset(&self) -> Option<&MeasurementDataset> {
        let folder = self.folder.as_deref()?;
        let file = self.selected_file.as_deref()?;
        self.cache.dataset(folder, file)
    }

    /// Switch to another file of the current folder.
    pub fn select_file(&mut self, name: &str) {
        self.selected_file = Some(name.to_string());
        self.selected_cell = None;
        self.recompute();
    }

    pub fn select_cell(&mut self, cell: Option<CellId>) {
        self.selected_cell = cell;
        self.mark_dirty();
    }

    pub fn set_plot_kind(&mut self, kind: PlotKind) {
        self.plot_kind = kind;
    }

    pub fn set_axes(&mut self, x: Axis, y: Axis) {
        if x != self.x_axis || y != self.y_axis {
            self.x_axis = x;
            self.y_axis = y;
            self.mark_dirty();
        }
    }

    /// Flag that an input changed; the next [`recompute_if_dirty`] rebuilds.
    ///
    /// [`recompute_if_dirty`]: AppState::recompute_if_dirty
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn recompute_if_dirty(&mut self) {
        if self.dirty {
            self.recompute();
        }
    }

    /// Rebuild series and percentages for the selected file.
    pub fn recompute(&mut self) {
        self.dirty = false;
        self.analysis = self.dataset().map(|ds| {
            Analysis::build(
                ds,
                &self.x_axis,
                &self.y_axis,
                self.selected_cell.as_ref(),
                &self.filters,
            )
        });
    }

    /// Write the current percentages to `path`.
    pub fn export_percentages(&mut self, path: &Path, format: ExportFormat) {
        let Some(Analysis {
            percentages: Ok(result),
            ..
        }) = &self.analysis
        else {
            self.status_message = Some("Nothing to export".into());
            return;
        };

        let written = match format {
            ExportFormat::Json => result.write_json(path),
            ExportFormat::Csv => result.write_csv(path),
        };
        match written {
            Ok(()) => {
                log::info!("Exported percentages to {}", path.display());
                self.status_message = Some(format!("Exported to {}", path.display()));
            }
            Err(e) => {
                log::error!("Export failed: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::ThresholdFilter;
    use std::fs;

    const EXPORT: &str = "\
Time,Cell ID (0),R0 RSRP (0),R0 RS CINR (0)
10:00:00,1,-90,5
10:00:01,1,-110,2
10:00:02,2,-95,8
10:00:03,2,-80,1
";

    fn state_with_folder() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), EXPORT).unwrap();
        fs::write(dir.path().join("b.csv"), "Time,Cell ID (0),R0 RSRP (0)\n10:00:00,9,-70\n").unwrap();
        let mut state = AppState::default();
        state.open_folder(dir.path());
        (dir, state)
    }

    fn overall(state: &AppState, metric: Metric) -> f64 {
        let analysis = state.analysis.as_ref().unwrap();
        analysis.percentages.as_ref().unwrap().overall(&metric).unwrap()
    }

    #[test]
    fn opening_folder_selects_first_file() {
        let (_dir, state) = state_with_folder();
        assert_eq!(state.selected_file.as_deref(), Some("a.csv"));
        assert_eq!(overall(&state, Metric::Rsrp), 75.0);
        assert_eq!(overall(&state, Metric::Cinr), 50.0);
        assert!(state.status_message.is_none());
    }

    #[test]
    fn filter_changes_apply_on_recompute() {
        let (_dir, mut state) = state_with_folder();
        state.filters.insert(Metric::Rsrp, ThresholdFilter::disabled(-100.0));
        state.mark_dirty();
        assert_eq!(overall(&state, Metric::Rsrp), 75.0);

        state.recompute_if_dirty();
        assert_eq!(overall(&state, Metric::Rsrp), 0.0);
    }

    #[test]
    fn file_without_cinr_reports_schema_error() {
        let (_dir, mut state) = state_with_folder();
        state.select_file("b.csv");
        let analysis = state.analysis.as_ref().unwrap();
        assert!(analysis.percentages.is_err());
        assert!(analysis.cinr_over_time.is_err());
        assert!(analysis.main.is_err());
        assert_eq!(analysis.rsrp_over_time.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn cell_selection_narrows_plots_only() {
        let (_dir, mut state) = state_with_folder();
        state.select_cell(Some(CellId::Integer(2)));
        state.recompute_if_dirty();
        let analysis = state.analysis.as_ref().unwrap();
        assert_eq!(analysis.main.as_ref().unwrap().len(), 1);
        assert_eq!(analysis.percentages.as_ref().unwrap().per_cell.len(), 2);
    }

    #[test]
    fn bad_folder_sets_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = AppState::default();
        state.open_folder(&dir.path().join("missing"));
        assert!(state.folder.is_none());
        assert!(state.status_message.as_deref().unwrap().starts_with("Error"));
    }

    #[test]
    fn export_writes_file() {
        let (dir, mut state) = state_with_folder();
        let out = dir.path().join("out.csv");
        state.export_percentages(&out, ExportFormat::Csv);
        let text = fs::read_to_string(&out).unwrap();
        assert!(text.starts_with("Cell ID,Samples,RSRP %,CINR %"));
    }

    #[test]
    fn reload_keeps_selection() {
        let (dir, mut state) = state_with_folder();
        state.select_file("b.csv");
        fs::write(dir.path().join("c.csv"), EXPORT).unwrap();
        state.reload_folder();
        assert_eq!(state.selected_file.as_deref(), Some("b.csv"));
        assert_eq!(state.catalog().unwrap().datasets.len(), 3);
    }

    #[test]
    fn reload_of_vanished_folder_clears_selection() {
        let (dir, mut state) = state_with_folder();
        let path = dir.path().to_path_buf();
        drop(dir);
        assert!(!path.exists());

        state.reload_folder();
        assert!(state.folder.is_none());
        assert!(state.selected_file.is_none());
        assert!(state.analysis.is_none());
        assert!(state.catalog().is_none());
        assert!(state.status_message.as_deref().unwrap().starts_with("Error"));
    }
}
