//! Configuration management.

mod settings;

pub use settings::{
    AppConfig, AppSettings, CacheSettings, LoggingConfig, ProviderSettings, StorageSettings,
};

use config::{Config, ConfigError, Environment, File};
use std::path::Path;

/// Load configuration from file and environment.
///
/// Environment overrides use the `BARCACHE` prefix and `__` as the section
/// separator, e.g. `BARCACHE__STORAGE__URL`.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix("BARCACHE")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("providers.priority")
                .try_parsing(true),
        )
        .build()?;

    let app: AppConfig = config.try_deserialize()?;
    app.validate().map_err(ConfigError::Message)?;
    Ok(app)
}
