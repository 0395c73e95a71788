//! SQLite-backed durable tier.

use async_trait::async_trait;
use barcache_core::error::StorageError;
use barcache_core::traits::BarStore;
use barcache_core::types::{CacheKey, CacheQuery, CachedBar, ProviderPriority, Timeframe};
use rusqlite::{params, Connection};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::migrations::{run_migrations, verify_schema};
use crate::pool::{connect, DbPool};

const SELECT_RANGE: &str = "SELECT timestamp, open, high, low, close, volume, provider, revision, fetched_at
     FROM bars_cache
     WHERE symbol = ?1 AND timeframe = ?2 AND timestamp >= ?3 AND timestamp < ?4
     ORDER BY timestamp ASC, provider ASC";

const UPSERT: &str = "INSERT INTO bars_cache
         (symbol, provider, timeframe, timestamp, open, high, low, close, volume, revision, fetched_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
     ON CONFLICT (symbol, provider, timeframe, timestamp) DO UPDATE SET
         open = excluded.open,
         high = excluded.high,
         low = excluded.low,
         close = excluded.close,
         volume = excluded.volume,
         revision = excluded.revision,
         fetched_at = excluded.fetched_at
     WHERE excluded.revision > bars_cache.revision";

/// Durable tier over a pooled SQLite database.
pub struct SqliteBarStore {
    pool: DbPool,
    priority: ProviderPriority,
    schema_dir: Option<PathBuf>,
}

impl SqliteBarStore {
    /// Create a store over an existing pool.
    pub fn new(pool: DbPool, priority: ProviderPriority) -> Self {
        Self {
            pool,
            priority,
            schema_dir: None,
        }
    }

    /// Connect to `url` and create a store.
    pub fn open(url: &str, pool_size: u32, priority: ProviderPriority) -> Result<Self, StorageError> {
        Ok(Self::new(connect(url, pool_size)?, priority))
    }

    /// Apply extra `*.sql` migrations from this directory during `init`.
    pub fn with_schema_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.schema_dir = Some(dir.into());
        self
    }

    /// Run blocking database work off the async runtime.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(StorageError::unavailable)?;
            f(&mut conn)
        })
        .await
        .map_err(StorageError::unavailable)?
    }

    /// Count stored rows (every provider and revision), optionally for one symbol.
    pub async fn row_count(&self, symbol: Option<&str>) -> Result<u64, StorageError> {
        let symbol = symbol.map(str::to_string);
        self.with_conn(move |conn| {
            let count: i64 = match symbol {
                Some(s) => conn.query_row(
                    "SELECT COUNT(*) FROM bars_cache WHERE symbol = ?1",
                    [s],
                    |row| row.get::<_, i64>(0),
                ),
                None => conn.query_row("SELECT COUNT(*) FROM bars_cache", [], |row| {
                    row.get::<_, i64>(0)
                }),
            }
            .map_err(StorageError::unavailable)?;
            Ok(count as u64)
        })
        .await
    }

    /// Row count per provider for one series, most rows first.
    pub async fn providers(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Vec<(String, u64)>, StorageError> {
        let symbol = symbol.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT provider, COUNT(*) FROM bars_cache
                     WHERE symbol = ?1 AND timeframe = ?2
                     GROUP BY provider
                     ORDER BY COUNT(*) DESC, provider ASC",
                )
                .map_err(StorageError::unavailable)?;
            let rows = stmt
                .query_map(params![symbol, timeframe.as_str()], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
                })
                .map_err(StorageError::unavailable)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(StorageError::unavailable)?;
            Ok(rows)
        })
        .await
    }
}

fn load_range(conn: &Connection, query: &CacheQuery) -> Result<Vec<CachedBar>, StorageError> {
    let mut stmt = conn
        .prepare_cached(SELECT_RANGE)
        .map_err(StorageError::unavailable)?;

    let rows = stmt
        .query_map(
            params![query.symbol, query.timeframe.as_str(), query.start, query.end],
            |row| {
                Ok(CachedBar {
                    timestamp: row.get(0)?,
                    open: row.get(1)?,
                    high: row.get(2)?,
                    low: row.get(3)?,
                    close: row.get(4)?,
                    volume: row.get(5)?,
                    provider: row.get(6)?,
                    revision: row.get(7)?,
                    fetched_at: row.get(8)?,
                })
            },
        )
        .map_err(StorageError::unavailable)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(StorageError::unavailable)?;

    Ok(rows)
}

/// Collapse rows sorted by timestamp into one resolved bar per timestamp.
fn resolve_rows(rows: &[CachedBar], priority: &ProviderPriority) -> Vec<CachedBar> {
    let mut resolved = Vec::new();
    let mut start = 0;
    while start < rows.len() {
        let ts = rows[start].timestamp;
        let end = rows[start..]
            .iter()
            .position(|r| r.timestamp != ts)
            .map_or(rows.len(), |n| start + n);
        if let Some(bar) = priority.resolve(&rows[start..end]) {
            resolved.push(bar.clone());
        }
        start = end;
    }
    resolved
}

#[async_trait]
impl BarStore for SqliteBarStore {
    async fn init(&self) -> Result<(), StorageError> {
        let schema_dir = self.schema_dir.clone();
        let applied = self
            .with_conn(move |conn| {
                let applied = run_migrations(conn, schema_dir.as_deref())?;
                verify_schema(conn)?;
                Ok(applied)
            })
            .await?;
        info!(applied = applied.len(), "durable tier schema verified");
        Ok(())
    }

    async fn get_range(&self, query: &CacheQuery) -> Result<Vec<CachedBar>, StorageError> {
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let owned = query.clone();
        let rows = self.with_conn(move |conn| load_range(conn, &owned)).await?;
        let resolved = resolve_rows(&rows, &self.priority);

        debug!(
            symbol = %query.symbol,
            timeframe = %query.timeframe,
            rows = rows.len(),
            bars = resolved.len(),
            "durable range read"
        );
        Ok(resolved)
    }

    async fn set_with_key(&self, key: &CacheKey, bar: &CachedBar) -> Result<bool, StorageError> {
        let key = key.clone();
        let bar = bar.clone();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(UPSERT).map_err(StorageError::unavailable)?;
            let changed = stmt
                .execute(params![
                    key.symbol,
                    bar.provider,
                    key.timeframe.as_str(),
                    key.timestamp,
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume,
                    bar.revision,
                    bar.fetched_at,
                ])
                .map_err(StorageError::unavailable)?;
            if changed == 0 {
                debug!(key = %key, provider = %bar.provider, revision = bar.revision, "stale revision ignored");
            }
            Ok(changed > 0)
        })
        .await
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
