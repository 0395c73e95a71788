//! Hot tier, cache service and data providers.

mod csv_source;
mod hot_tier;
mod service;

pub use csv_source::CsvProvider;
pub use hot_tier::{HotTier, HotTierStats, MergeOutcome};
pub use service::{CacheService, FailedWrite, StoreReport};

use barcache_core::error::DataError;
use barcache_core::types::Bar;
use std::path::Path;

/// Load bars from a CSV file.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Bar>, DataError> {
    CsvProvider::new(path, "csv")?.load_all()
}
