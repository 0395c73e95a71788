//! Import command.

use anyhow::{Context, Result};
use barcache_core::types::CachedBar;
use barcache_data::load_csv;
use chrono::Utc;
use std::path::Path;
use tracing::info;

use super::{open_cache, parse_timeframe};
use crate::cli::ImportArgs;

pub async fn run(args: ImportArgs, config_path: &Path) -> Result<()> {
    let timeframe = parse_timeframe(&args.timeframe)?;
    let (_, _, service) = open_cache(config_path).await?;

    let bars = load_csv(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    info!(file = %args.file.display(), bars = bars.len(), "loaded csv");

    let fetched_at = Utc::now().timestamp_millis();
    let cached = bars
        .into_iter()
        .map(|bar| CachedBar::from_bar(bar, args.provider.as_str(), args.revision, fetched_at))
        .collect();

    let report = service.store_bars(&args.symbol, timeframe, cached).await;

    println!(
        "{} {}: {} written, {} stale, {} invalid, {} failed",
        args.symbol,
        timeframe,
        report.written,
        report.stale,
        report.invalid.len(),
        report.failed.len()
    );
    for invalid in &report.invalid {
        println!("  {}", invalid);
    }
    for failed in &report.failed {
        println!("  {}@{} from {}: {}", args.symbol, failed.timestamp, failed.provider, failed.error);
    }

    report.into_result()?;
    Ok(())
}
