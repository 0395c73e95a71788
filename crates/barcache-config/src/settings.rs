//! Configuration structures.

use barcache_core::types::ProviderPriority;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub providers: ProviderSettings,
}

impl AppConfig {
    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.storage.url.trim().is_empty() {
            return Err("storage.url must not be empty".to_string());
        }
        if self.storage.pool_size == 0 {
            return Err("storage.pool_size must be at least 1".to_string());
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(format!(
                "logging.format must be \"pretty\" or \"json\", got \"{}\"",
                self.logging.format
            ));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers.priority {
            if provider.trim().is_empty() {
                return Err("providers.priority contains an empty name".to_string());
            }
            if !seen.insert(provider.as_str()) {
                return Err(format!("providers.priority has duplicate provider {provider}"));
            }
        }
        Ok(())
    }

    /// The provider ranking shared by both cache tiers.
    pub fn priority(&self) -> ProviderPriority {
        ProviderPriority::new(self.providers.priority.iter().cloned())
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "barcache".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration; CLI flags take precedence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format == "json"
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

/// Hot tier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum bars held in memory
    pub hot_capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            hot_capacity: 100_000,
        }
    }
}

/// Durable tier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub url: String,
    pub pool_size: u32,
    /// Extra `*.sql` migrations applied after the built-in schema
    pub migrations_dir: Option<PathBuf>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://barcache.db".to_string(),
            pool_size: 4,
            migrations_dir: None,
        }
    }
}

/// Upstream provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProviderSettings {
    /// Most trusted provider first
    pub priority: Vec<String>,
}
