//! Core data types for the bar cache.

mod key;
mod ohlcv;
mod priority;
mod timeframe;

pub use key::{CacheKey, CacheQuery};
pub use ohlcv::{Bar, CachedBar};
pub use priority::ProviderPriority;
pub use timeframe::Timeframe;
