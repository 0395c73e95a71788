//! Validate configuration command.

use anyhow::Result;
use barcache_config::load_config;
use std::path::Path;

pub async fn run(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    match load_config(config_path) {
        Ok(config) => {
            println!("Configuration is valid!");
            println!();
            println!("App: {}", config.app.name);
            println!("Environment: {}", config.app.environment);
            println!("Log level: {}", config.logging.level);
            println!("Store: {} (pool {})", config.storage.url, config.storage.pool_size);
            println!("Hot capacity: {}", config.cache.hot_capacity);
            println!("Priority: {}", config.providers.priority.join(" > "));
            println!();
            println!("{}", config.to_toml()?);
        }
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
