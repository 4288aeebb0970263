/// Data layer: measurement types, loading, and threshold analysis.
///
/// Architecture:
/// ```text
///  folder of .csv / .parquet exports
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse + clean each file → FolderCatalog
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  cache    │  DatasetCache: folder → FolderCatalog
///   └──────────┘
///        │  one MeasurementDataset
///        ├──────────────────────────┐
///        ▼                          ▼
///   ┌───────────┐             ┌──────────┐
///   │ aggregate  │ + filters   │  series   │ + axes, cell
///   └───────────┘             └──────────┘
///    AggregationResult          Vec<CellSeries>
/// ```

pub mod aggregate;
pub mod cache;
pub mod filter;
pub mod loader;
pub mod model;
pub mod series;
