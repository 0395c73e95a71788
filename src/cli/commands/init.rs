//! Init command.

use anyhow::Result;
use std::path::Path;

use super::open_cache;

pub async fn run(config_path: &Path) -> Result<()> {
    let (config, store, _) = open_cache(config_path).await?;
    let rows = store.row_count(None).await?;

    println!("Durable tier ready: {}", config.storage.url);
    println!("Rows: {}", rows);
    Ok(())
}
