//! Upstream provider trait definition.

use crate::error::DataError;
use crate::types::{Bar, Timeframe};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Trait for upstream bar providers.
///
/// The cache never calls providers itself; its caller fetches on a miss and
/// feeds the result back through the write path.
#[async_trait]
pub trait BarProvider: Send + Sync {
    /// Fetch historical bars.
    ///
    /// # Arguments
    /// * `symbol` - The symbol to fetch
    /// * `timeframe` - The bar timeframe
    /// * `from` - Inclusive start of the range
    /// * `to` - Exclusive end of the range
    ///
    /// # Returns
    /// A vector of bars ordered from oldest to newest
    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>, DataError>;

    /// Get the provider name, as recorded on cached rows.
    fn name(&self) -> &str;
}
