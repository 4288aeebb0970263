use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::filter::{FilterConfig, default_filters};
use crate::data::loader::ColumnMapping;
use crate::data::series::PlotKind;
use crate::error::ConfigError;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "CELL_KPI_CONFIG";
/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "cell-kpi.json";

/// Start-up settings of the viewer. Every field is optional in the file.
///
/// ```json
/// {
///   "data_folder": "/data/drive-tests",
///   "columns": { "cell_id": "PCI" },
///   "filters": { "RSRP": { "enabled": true, "threshold": -105.0 } },
///   "plot_kind": "Line"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Folder opened at start-up.
    pub data_folder: Option<PathBuf>,
    pub columns: ColumnMapping,
    pub filters: FilterConfig,
    pub plot_kind: PlotKind,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ViewerConfig {
            data_folder: None,
            columns: ColumnMapping::default(),
            filters: default_filters(),
            plot_kind: PlotKind::default(),
        }
    }
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `$CELL_KPI_CONFIG` if set, else `./cell-kpi.json` if present, else
    /// defaults.
    pub fn discover() -> Result<Self, ConfigError> {
        Self::discover_from(std::env::var_os(CONFIG_ENV).map(PathBuf::from), Path::new("."))
    }

    fn discover_from(explicit: Option<PathBuf>, cwd: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            log::info!("Reading config from {}", path.display());
            return Self::load(&path);
        }
        let local = cwd.join(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            log::info!("Reading config from {}", local.display());
            return Self::load(&local);
        }
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::ThresholdFilter;
    use crate::data::model::Metric;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(
            &path,
            r#"{ "columns": { "cell_id": "PCI" },
                 "filters": { "RSRP": { "enabled": false, "threshold": -105.0 } },
                 "plot_kind": "Line" }"#,
        )
        .unwrap();

        let cfg = ViewerConfig::load(&path).unwrap();
        assert_eq!(cfg.columns.cell_id, "PCI");
        assert_eq!(cfg.columns.rsrp, "R0 RSRP (0)");
        assert_eq!(cfg.plot_kind, PlotKind::Line);
        assert_eq!(cfg.filters.len(), 1);
        assert_eq!(cfg.filters[&Metric::Rsrp], ThresholdFilter::disabled(-105.0));
        assert_eq!(cfg.data_folder, None);
    }

    #[test]
    fn missing_and_malformed_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(matches!(
            ViewerConfig::load(&missing),
            Err(ConfigError::NotFound { .. })
        ));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(ViewerConfig::load(&bad), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn discovery_order() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            ViewerConfig::discover_from(None, dir.path()).unwrap(),
            ViewerConfig::default()
        );

        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), r#"{ "plot_kind": "Bar" }"#).unwrap();
        let cfg = ViewerConfig::discover_from(None, dir.path()).unwrap();
        assert_eq!(cfg.plot_kind, PlotKind::Bar);

        let explicit = dir.path().join("missing.json");
        assert!(ViewerConfig::discover_from(Some(explicit), dir.path()).is_err());
    }
}
