use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};

use anyhow::Result;

use super::loader::{ColumnMapping, FolderCatalog, load_folder};
use super::model::MeasurementDataset;

/// Folders loaded during this session, keyed by path.
///
/// Owned by the UI state and passed around explicitly; the aggregation code
/// never looks here, it only receives a [`MeasurementDataset`].
#[derive(Debug, Default)]
pub struct DatasetCache {
    columns: ColumnMapping,
    folders: HashMap<PathBuf, FolderCatalog>,
}

impl DatasetCache {
    pub fn new(columns: ColumnMapping) -> Self {
        DatasetCache {
            columns,
            folders: HashMap::new(),
        }
    }

    /// Return the folder's catalog, loading it on first use.
    pub fn get_or_load(&mut self, folder: &Path) -> Result<&FolderCatalog> {
        match self.folders.entry(folder.to_path_buf()) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let catalog = load_folder(folder, &self.columns)?;
                Ok(e.insert(catalog))
            }
        }
    }

    /// Load the folder again, replacing any cached catalog.
    pub fn reload(&mut self, folder: &Path) -> Result<&FolderCatalog> {
        self.folders.remove(folder);
        self.get_or_load(folder)
    }

    pub fn get(&self, folder: &Path) -> Option<&FolderCatalog> {
        self.folders.get(folder)
    }

    pub fn dataset(&self, folder: &Path, file_name: &str) -> Option<&MeasurementDataset> {
        self.get(folder)?.datasets.get(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const EXPORT: &str = "Time,Cell ID (0),R0 RSRP (0),R0 RS CINR (0)\n10:00:00,1,-90,5\n";

    #[test]
    fn loads_once_until_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("one.csv"), EXPORT).unwrap();

        let mut cache = DatasetCache::default();
        assert_eq!(cache.get_or_load(dir.path()).unwrap().datasets.len(), 1);

        fs::write(dir.path().join("two.csv"), EXPORT).unwrap();
        assert_eq!(cache.get_or_load(dir.path()).unwrap().datasets.len(), 1);
        assert_eq!(cache.reload(dir.path()).unwrap().datasets.len(), 2);
        assert!(cache.dataset(dir.path(), "two.csv").is_some());
    }

    #[test]
    fn failed_load_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let mut cache = DatasetCache::default();
        assert!(cache.get_or_load(&missing).is_err());
        assert!(cache.get(&missing).is_none());
    }
}
