//! Durable tier trait definition.

use crate::error::StorageError;
use crate::types::{CacheKey, CacheQuery, CachedBar};
use async_trait::async_trait;

/// Trait for persistent bar stores.
///
/// Implementations may block on disk or network I/O; callers must not hold
/// any in-process lock across these calls.
#[async_trait]
pub trait BarStore: Send + Sync {
    /// Idempotent schema setup. Fails with [`StorageError::Schema`] when the
    /// schema cannot be verified.
    async fn init(&self) -> Result<(), StorageError>;

    /// Fetch resolved bars for a range.
    ///
    /// # Returns
    /// One conflict-resolved bar per distinct timestamp in `[start, end)`,
    /// ascending. An empty vector means "no data", never "unavailable".
    async fn get_range(&self, query: &CacheQuery) -> Result<Vec<CachedBar>, StorageError>;

    /// Upsert one provider's copy of a bar.
    ///
    /// An existing row for the same provider is replaced only when
    /// `bar.revision` is strictly greater.
    ///
    /// # Returns
    /// `true` if a row was written, `false` for a stale revision.
    async fn set_with_key(&self, key: &CacheKey, bar: &CachedBar) -> Result<bool, StorageError>;

    /// Get the store name.
    fn name(&self) -> &str;
}
