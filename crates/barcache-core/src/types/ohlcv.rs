//! OHLCV (Open, High, Low, Close, Volume) data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InvalidBar;

/// Compact OHLCV bar as delivered by an upstream provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Unix timestamp in milliseconds, aligned to the timeframe boundary
    pub timestamp: i64,
    /// Opening price
    pub open: f64,
    /// Highest price
    pub high: f64,
    /// Lowest price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Trading volume
    pub volume: f64,
}

impl Bar {
    /// Create a new bar.
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Get the timestamp as a DateTime.
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp).unwrap_or_default()
    }

    /// Check the price invariant: `low <= min(open, close)` and
    /// `high >= max(open, close)`, with every field finite.
    pub fn check(&self) -> Result<(), String> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite()) {
            return Err("non-finite price".to_string());
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(format!("invalid volume {}", self.volume));
        }
        if self.high < self.low {
            return Err(format!("high {} below low {}", self.high, self.low));
        }
        if self.low > self.open.min(self.close) {
            return Err(format!(
                "low {} above min(open, close) {}",
                self.low,
                self.open.min(self.close)
            ));
        }
        if self.high < self.open.max(self.close) {
            return Err(format!(
                "high {} below max(open, close) {}",
                self.high,
                self.open.max(self.close)
            ));
        }
        Ok(())
    }
}

/// A bar as held by the cache: the provider's copy of one logical bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedBar {
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Data source that produced this copy
    pub provider: String,
    /// Provider correction counter, starting at 1
    pub revision: u32,
    /// When this process cached the row (audit only)
    pub fetched_at: i64,
}

impl CachedBar {
    /// Tag a fetched bar with its provider and revision.
    pub fn from_bar(bar: Bar, provider: impl Into<String>, revision: u32, fetched_at: i64) -> Self {
        Self {
            timestamp: bar.timestamp,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            provider: provider.into(),
            revision,
            fetched_at,
        }
    }

    /// The plain OHLCV sample.
    pub fn bar(&self) -> Bar {
        Bar::new(
            self.timestamp,
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
        )
    }

    /// Validate before a write.
    pub fn validate(&self, symbol: &str) -> Result<(), InvalidBar> {
        let reason = if self.provider.trim().is_empty() {
            Some("empty provider".to_string())
        } else if self.revision == 0 {
            Some("revision must start at 1".to_string())
        } else {
            self.bar().check().err()
        };

        match reason {
            None => Ok(()),
            Some(reason) => Err(InvalidBar {
                symbol: symbol.to_string(),
                timestamp: self.timestamp,
                provider: self.provider.clone(),
                reason,
            }),
        }
    }
}
