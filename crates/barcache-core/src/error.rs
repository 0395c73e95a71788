//! Error types for the bar cache.

use thiserror::Error;

/// Top-level cache error.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    InvalidBar(#[from] InvalidBar),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Partial write: {failed} bar(s) failed to persist, {invalid} bar(s) rejected")]
    PartialWrite { failed: usize, invalid: usize },
}

/// Durable tier errors.
///
/// `Unavailable` means the store could not answer right now; callers must
/// not read it as "no data". `Schema` is fatal at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Schema error: {0}")]
    Schema(String),
}

impl StorageError {
    /// Wrap any displayable failure as [`StorageError::Unavailable`].
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        StorageError::Unavailable(err.to_string())
    }

    /// Wrap any displayable failure as [`StorageError::Schema`].
    pub fn schema(err: impl std::fmt::Display) -> Self {
        StorageError::Schema(err.to_string())
    }
}

/// A bar that failed validation at write time.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid bar {symbol}@{timestamp} from {provider}: {reason}")]
pub struct InvalidBar {
    pub symbol: String,
    pub timestamp: i64,
    pub provider: String,
    pub reason: String,
}

/// Upstream data source errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("No data available for the requested range")]
    NoDataAvailable,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Data source error: {0}")]
    Internal(String),
}

/// Result type alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
