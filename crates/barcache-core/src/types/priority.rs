//! Provider priority and conflict resolution.
//!
//! One rule decides which provider's copy of a logical bar is authoritative,
//! shared by the durable tier (range reads) and the cache service (hot tier
//! writes):
//!
//! 1. Within a provider, the highest revision wins.
//! 2. Across providers, the one listed first in the priority list wins,
//!    whatever the revisions.
//! 3. If no candidate provider is listed, the highest revision wins, ties
//!    going to the lexicographically smaller provider name.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::CachedBar;

/// Immutable, ordered list of provider names. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderPriority {
    order: Arc<[String]>,
}

impl ProviderPriority {
    /// Create a priority list, most trusted provider first.
    pub fn new<I, S>(providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            order: providers.into_iter().map(Into::into).collect(),
        }
    }

    /// Providers in priority order.
    pub fn providers(&self) -> &[String] {
        &self.order
    }

    /// Position of a provider in the list (0 = most trusted).
    pub fn rank(&self, provider: &str) -> Option<usize> {
        self.order.iter().position(|p| p == provider)
    }

    /// Pick the authoritative row among copies of the same logical bar.
    pub fn resolve<'a, I>(&self, candidates: I) -> Option<&'a CachedBar>
    where
        I: IntoIterator<Item = &'a CachedBar>,
    {
        let mut per_provider: BTreeMap<&'a str, &'a CachedBar> = BTreeMap::new();
        for bar in candidates {
            per_provider
                .entry(bar.provider.as_str())
                .and_modify(|best| {
                    if bar.revision > best.revision {
                        *best = bar;
                    }
                })
                .or_insert(bar);
        }

        for provider in self.order.iter() {
            if let Some(bar) = per_provider.get(provider.as_str()) {
                return Some(*bar);
            }
        }

        // Ascending provider order, so `>=` keeps the smaller name on ties.
        per_provider.into_values().fold(None, |best, bar| match best {
            Some(b) if b.revision >= bar.revision => Some(b),
            _ => Some(bar),
        })
    }

    /// Pairwise form of [`resolve`](Self::resolve): `Greater` means `a` wins.
    pub fn compare(&self, a: &CachedBar, b: &CachedBar) -> Ordering {
        if a.provider == b.provider {
            return a.revision.cmp(&b.revision);
        }
        match (self.rank(&a.provider), self.rank(&b.provider)) {
            (Some(ra), Some(rb)) => rb.cmp(&ra),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => a
                .revision
                .cmp(&b.revision)
                .then_with(|| b.provider.cmp(&a.provider)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Bar;

    fn row(provider: &str, revision: u32, close: f64) -> CachedBar {
        CachedBar::from_bar(
            Bar::new(1_000, close, close, close, close, 1.0),
            provider,
            revision,
            0,
        )
    }

    #[test]
    fn test_priority_beats_revision() {
        let priority = ProviderPriority::new(["polygon", "yahoo"]);
        let yahoo = row("yahoo", 5, 100.0);
        let polygon = row("polygon", 1, 101.0);

        let winner = priority.resolve([&yahoo, &polygon]).unwrap();
        assert_eq!(winner.provider, "polygon");
        assert_eq!(winner.close, 101.0);

        // Candidate order must not matter
        let winner = priority.resolve([&polygon, &yahoo]).unwrap();
        assert_eq!(winner.provider, "polygon");
    }

    #[test]
    fn test_highest_revision_within_provider() {
        let priority = ProviderPriority::new(["yahoo"]);
        let r1 = row("yahoo", 1, 100.0);
        let r3 = row("yahoo", 3, 103.0);
        let r2 = row("yahoo", 2, 102.0);

        let winner = priority.resolve([&r1, &r3, &r2]).unwrap();
        assert_eq!(winner.revision, 3);
    }

    #[test]
    fn test_fallback_to_highest_revision_when_unlisted() {
        let priority = ProviderPriority::new(["polygon"]);
        let a = row("alpaca", 2, 100.0);
        let b = row("binance", 4, 101.0);

        assert_eq!(priority.resolve([&a, &b]).unwrap().provider, "binance");

        // Ties go to the smaller provider name
        let c = row("coinbase", 4, 102.0);
        assert_eq!(priority.resolve([&c, &b]).unwrap().provider, "binance");
        assert_eq!(priority.resolve([&b, &c]).unwrap().provider, "binance");
    }

    #[test]
    fn test_listed_provider_beats_unlisted() {
        let priority = ProviderPriority::new(["yahoo"]);
        let listed = row("yahoo", 1, 100.0);
        let unlisted = row("alpaca", 9, 101.0);

        assert_eq!(priority.resolve([&unlisted, &listed]).unwrap().provider, "yahoo");
        assert_eq!(priority.compare(&listed, &unlisted), Ordering::Greater);
    }

    #[test]
    fn test_empty_candidates() {
        let priority = ProviderPriority::default();
        assert!(priority.resolve(std::iter::empty()).is_none());
    }

    #[test]
    fn test_compare_agrees_with_resolve() {
        let priority = ProviderPriority::new(["polygon", "yahoo"]);
        let rows = [
            row("polygon", 1, 1.0),
            row("polygon", 2, 2.0),
            row("yahoo", 7, 3.0),
            row("alpaca", 9, 4.0),
            row("binance", 9, 5.0),
        ];

        for a in &rows {
            for b in &rows {
                if a == b {
                    continue;
                }
                let resolved = priority.resolve([a, b]).unwrap();
                let expected = if priority.compare(a, b) == Ordering::Less { b } else { a };
                assert_eq!(resolved, expected, "{} r{} vs {} r{}", a.provider, a.revision, b.provider, b.revision);
            }
        }
    }
}
