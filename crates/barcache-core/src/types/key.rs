//! Cache identity and range query types.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Timeframe;

/// Identity of a logical bar. Several providers may hold a copy of the same
/// key; the provider is deliberately not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
}

impl CacheKey {
    /// Create a new cache key.
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, timestamp: i64) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            timestamp,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.symbol, self.timeframe, self.timestamp)
    }
}

/// Half-open range read `[start, end)` over one symbol and timeframe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheQuery {
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Inclusive lower bound (Unix ms)
    pub start: i64,
    /// Exclusive upper bound (Unix ms)
    pub end: i64,
}

impl CacheQuery {
    /// Create a new range query.
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, start: i64, end: i64) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            start,
            end,
        }
    }

    /// True when the range holds no timestamps at all.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Check whether a timestamp falls inside `[start, end)`.
    #[inline]
    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    /// Build the key for a timestamp in this query's series.
    pub fn key_at(&self, timestamp: i64) -> CacheKey {
        CacheKey::new(self.symbol.clone(), self.timeframe, timestamp)
    }

    /// Number of timeframe boundaries inside the range.
    pub fn expected_len(&self) -> usize {
        match self.first_boundary() {
            Some(first) if first < self.end => {
                // The span of a wide range does not fit in i64.
                let span = i128::from(self.end) - 1 - i128::from(first);
                let count = span / i128::from(self.timeframe.as_millis()) + 1;
                usize::try_from(count).unwrap_or(usize::MAX)
            }
            _ => 0,
        }
    }

    /// Every timeframe boundary inside the range, ascending.
    ///
    /// Boundaries are multiples of the timeframe width counted from the Unix
    /// epoch; timestamps are opaque UTC milliseconds with no calendar snapping.
    pub fn expected_timestamps(&self) -> impl Iterator<Item = i64> + '_ {
        let step = self.timeframe.as_millis();
        let first = self.first_boundary().unwrap_or(self.end);
        (0..self.expected_len() as i64).map(move |i| first + i * step)
    }

    fn first_boundary(&self) -> Option<i64> {
        if self.is_empty() {
            return None;
        }
        let step = self.timeframe.as_millis();
        let rem = self.start.rem_euclid(step);
        if rem == 0 {
            Some(self.start)
        } else {
            self.start.checked_add(step - rem)
        }
    }
}
