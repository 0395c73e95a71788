//! Stats command.

use anyhow::Result;
use std::path::Path;

use super::{open_cache, parse_timeframe};
use crate::cli::StatsArgs;

pub async fn run(args: StatsArgs, config_path: &Path) -> Result<()> {
    let (config, store, service) = open_cache(config_path).await?;

    println!("Store: {}", config.storage.url);
    println!("Priority: {}", service.priority().providers().join(" > "));
    println!("Rows: {}", store.row_count(None).await?);
    println!("Hot capacity: {}", service.hot_stats().capacity);

    if let Some(symbol) = &args.symbol {
        let timeframe = parse_timeframe(&args.timeframe)?;
        println!();
        println!("{} {}: {} rows", symbol, timeframe, store.row_count(Some(symbol)).await?);
        for (provider, rows) in store.providers(symbol, timeframe).await? {
            let rank = service
                .priority()
                .rank(&provider)
                .map(|r| format!("#{}", r + 1))
                .unwrap_or_else(|| "unranked".to_string());
            println!("  {:<12} {:>10} rows  ({})", provider, rows, rank);
        }
    }

    Ok(())
}
