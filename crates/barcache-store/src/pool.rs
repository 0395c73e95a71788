//! Connection pool setup.

use barcache_core::error::StorageError;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::PathBuf;
use std::time::Duration;

pub type DbPool = Pool<SqliteConnectionManager>;

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, PartialEq)]
enum Target {
    Memory,
    File(PathBuf),
}

fn parse_url(url: &str) -> Result<Target, StorageError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(StorageError::Unavailable("empty storage url".to_string()));
    }
    if url == ":memory:" || url == "sqlite::memory:" {
        return Ok(Target::Memory);
    }
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    if path.is_empty() {
        return Err(StorageError::Unavailable(format!("no path in storage url: {url}")));
    }
    Ok(Target::File(PathBuf::from(path)))
}

/// Open a pool for the given storage url.
///
/// Accepts `sqlite::memory:`, `:memory:`, `sqlite://<path>`, `sqlite:<path>`
/// or a bare path. An in-memory database lives in its one connection, so its
/// pool is pinned to a single connection that is never recycled.
pub fn connect(url: &str, pool_size: u32) -> Result<DbPool, StorageError> {
    let builder = Pool::builder().connection_timeout(CONNECTION_TIMEOUT);

    let pool = match parse_url(url)? {
        Target::Memory => builder
            .max_size(1)
            .max_lifetime(None)
            .idle_timeout(None)
            .build(SqliteConnectionManager::memory()),
        Target::File(path) => {
            let manager = SqliteConnectionManager::file(&path).with_init(|conn| {
                conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;")
            });
            builder.max_size(pool_size.max(1)).build(manager)
        }
    }
    .map_err(StorageError::unavailable)?;

    tracing::debug!(url, pool_size, "storage pool ready");
    Ok(pool)
}
