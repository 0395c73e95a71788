//! Query command.

use anyhow::{Context, Result};
use barcache_core::traits::BarProvider;
use barcache_core::types::{CacheQuery, CachedBar};
use barcache_data::{CacheService, CsvProvider};
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{info, warn};

use super::{open_cache, parse_time, parse_timeframe};
use crate::cli::QueryArgs;

pub async fn run(args: QueryArgs, config_path: &Path) -> Result<()> {
    let timeframe = parse_timeframe(&args.timeframe)?;
    let start = parse_time(&args.start)?;
    let end = parse_time(&args.end)?;
    let query = CacheQuery::new(
        args.symbol.as_str(),
        timeframe,
        start.timestamp_millis(),
        end.timestamp_millis(),
    );

    let (_, _, service) = open_cache(config_path).await?;
    let mut bars = service.get_bars(&query).await?;

    if bars.len() < query.expected_len() {
        if let Some(path) = &args.csv {
            bars = read_through(&service, &query, path, &args.provider, start, end).await?;
        }
    }

    let hot = service.hot_stats();
    info!(
        hits = hot.hits,
        misses = hot.misses,
        resident = hot.size,
        hit_rate = hot.hit_rate(),
        "hot tier"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&bars)?);
    } else {
        println!(
            "{:<25} {:>12} {:>12} {:>12} {:>12} {:>14} {:>10} {:>4}",
            "time", "open", "high", "low", "close", "volume", "provider", "rev"
        );
        for bar in &bars {
            println!(
                "{:<25} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>14.2} {:>10} {:>4}",
                bar.bar().datetime().to_rfc3339(),
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.volume,
                bar.provider,
                bar.revision
            );
        }
        println!("{} of {} expected bars", bars.len(), query.expected_len());
    }

    Ok(())
}

/// Fetch the range from the CSV provider, write it through, and read again.
async fn read_through(
    service: &CacheService,
    query: &CacheQuery,
    path: &Path,
    provider_name: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<CachedBar>> {
    let provider = CsvProvider::new(path, provider_name)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let fetched = provider
        .get_bars(&query.symbol, query.timeframe, start, end)
        .await?;
    info!(provider = provider.name(), bars = fetched.len(), "fetched missing range");

    let fetched_at = Utc::now().timestamp_millis();
    let cached = fetched
        .into_iter()
        .map(|bar| CachedBar::from_bar(bar, provider.name(), 1, fetched_at))
        .collect();
    let report = service.store_bars(&query.symbol, query.timeframe, cached).await;
    if !report.is_clean() {
        warn!(
            invalid = report.invalid.len(),
            failed = report.failed.len(),
            "some fetched bars were not stored"
        );
    }

    Ok(service.get_bars(query).await?)
}
