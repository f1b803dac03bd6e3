/// Data layer: reference population, listener measurements, and filtering.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv        measurements .csv
///        │                               │
///        ▼                               ▼
///   ┌──────────┐                  ┌──────────────────┐
///   │  loader   │  parse files →  │ MeasurementVector │
///   └──────────┘                  └──────────────────┘
///        │
///        ▼
///   ┌────────────────────┐
///   │ ReferencePopulation │  Vec<Subject>, positional ids
///   └────────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  reconcile gaps → feature vectors; drop excluded positions
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod filter;
