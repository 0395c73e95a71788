//! CLI command implementations.

pub mod import;
pub mod init;
pub mod query;
pub mod stats;
pub mod validate;

use anyhow::{Context, Result};
use barcache_config::{load_config, AppConfig};
use barcache_core::types::Timeframe;
use barcache_data::CacheService;
use barcache_store::SqliteBarStore;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::path::Path;
use std::sync::Arc;

/// Load config and open an initialized cache over the configured store.
pub(crate) async fn open_cache(
    config_path: &Path,
) -> Result<(AppConfig, Arc<SqliteBarStore>, CacheService)> {
    let config = load_config(config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;

    let mut store = SqliteBarStore::open(
        &config.storage.url,
        config.storage.pool_size,
        config.priority(),
    )
    .with_context(|| format!("Failed to open store {}", config.storage.url))?;
    if let Some(dir) = &config.storage.migrations_dir {
        store = store.with_schema_dir(dir);
    }
    let store = Arc::new(store);

    let service = CacheService::new(store.clone(), config.priority(), config.cache.hot_capacity);
    service.init().await.context("Failed to initialize durable tier")?;

    Ok((config, store, service))
}

pub(crate) fn parse_timeframe(s: &str) -> Result<Timeframe> {
    s.parse::<Timeframe>().map_err(|e| {
        let known: Vec<&str> = Timeframe::all().iter().map(Timeframe::as_str).collect();
        anyhow::anyhow!("{} (expected one of {})", e, known.join(", "))
    })
}

/// Parse a CLI date: `YYYY-MM-DD` (midnight UTC) or RFC 3339.
pub(crate) fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d.and_time(NaiveTime::MIN).and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD or RFC 3339", s))
}
