//! Read-through / write-through cache service.

use barcache_core::error::{CacheError, CacheResult, InvalidBar, StorageError};
use barcache_core::traits::BarStore;
use barcache_core::types::{CacheKey, CacheQuery, CachedBar, ProviderPriority, Timeframe};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::hot_tier::{HotTier, HotTierStats, MergeOutcome};

/// A bar whose durable write failed.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedWrite {
    pub timestamp: i64,
    pub provider: String,
    pub error: StorageError,
}

/// Outcome of a `store_bars` batch.
#[derive(Debug, Default)]
pub struct StoreReport {
    /// Bars written to the durable tier.
    pub written: usize,
    /// Bars the durable tier ignored as stale revisions.
    pub stale: usize,
    /// Bars rejected by validation; written to neither tier.
    pub invalid: Vec<InvalidBar>,
    /// Bars held in memory whose durable write failed.
    pub failed: Vec<FailedWrite>,
}

impl StoreReport {
    /// True when every bar was accepted and persisted (or stale).
    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty() && self.failed.is_empty()
    }

    /// Number of bars the batch contained.
    pub fn total(&self) -> usize {
        self.written + self.stale + self.invalid.len() + self.failed.len()
    }

    /// Turn any rejected or failed bar into an error.
    pub fn into_result(self) -> CacheResult<Self> {
        if self.is_clean() {
            Ok(self)
        } else {
            Err(CacheError::PartialWrite {
                failed: self.failed.len(),
                invalid: self.invalid.len(),
            })
        }
    }
}

/// Two-tier bar cache: hot tier in front of a durable store.
///
/// The only component callers talk to. Writes always go to both tiers;
/// reads fall back to the durable tier whenever the hot tier cannot prove a
/// gap-free answer.
pub struct CacheService {
    hot: HotTier,
    store: Arc<dyn BarStore>,
    priority: ProviderPriority,
}

impl CacheService {
    /// Create a new cache service.
    ///
    /// `priority` must be the same list the store resolves with.
    pub fn new(store: Arc<dyn BarStore>, priority: ProviderPriority, hot_capacity: usize) -> Self {
        Self {
            hot: HotTier::new(hot_capacity),
            store,
            priority,
        }
    }

    /// Prepare the durable tier. A schema error here must stop startup.
    pub async fn init(&self) -> CacheResult<()> {
        self.store.init().await?;
        info!(
            store = self.store.name(),
            hot_capacity = self.hot.capacity(),
            priority = ?self.priority.providers(),
            "bar cache ready"
        );
        Ok(())
    }

    /// Read bars for `[start, end)`, ascending, at most one per timestamp.
    ///
    /// Served from memory only when every timeframe boundary in the range is
    /// resident; otherwise the whole range is read from the durable tier and
    /// backfilled into memory. Bars missing from both tiers are simply absent.
    pub async fn get_bars(&self, query: &CacheQuery) -> CacheResult<Vec<CachedBar>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let expected = query.expected_len();
        let resident: Vec<CachedBar> = if expected > 0 && expected <= self.hot.capacity() {
            let keys: Vec<CacheKey> = query
                .expected_timestamps()
                .map(|ts| query.key_at(ts))
                .collect();
            let found = self.hot.get_many(&keys);
            if found.iter().all(Option::is_some) {
                debug!(
                    symbol = %query.symbol,
                    timeframe = %query.timeframe,
                    bars = expected,
                    "hot tier hit"
                );
                return Ok(found.into_iter().flatten().collect());
            }
            found.into_iter().flatten().collect()
        } else {
            Vec::new()
        };

        let durable = self.store.get_range(query).await?;
        let durable_len = durable.len();

        let mut merged: BTreeMap<i64, CachedBar> = BTreeMap::new();
        for bar in durable.into_iter().chain(resident) {
            if !query.contains(bar.timestamp) {
                continue;
            }
            let replace = merged
                .get(&bar.timestamp)
                .map_or(true, |current| self.priority.compare(current, &bar) == Ordering::Less);
            if replace {
                merged.insert(bar.timestamp, bar);
            }
        }

        self.hot.extend(
            merged
                .values()
                .map(|bar| (query.key_at(bar.timestamp), bar.clone())),
        );

        debug!(
            symbol = %query.symbol,
            timeframe = %query.timeframe,
            expected,
            durable = durable_len,
            returned = merged.len(),
            "hot tier miss, backfilled from durable tier"
        );
        Ok(merged.into_values().collect())
    }

    /// Write bars through both tiers.
    ///
    /// Invalid bars are rejected individually. Valid bars always reach the
    /// hot tier, and a durable write is attempted for each of them even
    /// after earlier failures; the report says which bars failed.
    ///
    /// A hot entry that was never compared with a resident copy, or that the
    /// durable tier rejected as stale, is replaced afterwards by the durable
    /// tier's resolved row for its timestamp.
    pub async fn store_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        bars: Vec<CachedBar>,
    ) -> StoreReport {
        let mut report = StoreReport::default();
        let mut unverified = BTreeSet::new();

        for bar in bars {
            if let Err(invalid) = bar.validate(symbol) {
                warn!(
                    symbol,
                    timestamp = invalid.timestamp,
                    provider = %invalid.provider,
                    reason = %invalid.reason,
                    "rejected invalid bar"
                );
                report.invalid.push(invalid);
                continue;
            }

            let key = CacheKey::new(symbol, timeframe, bar.timestamp);

            let outcome = self.hot.merge(key.clone(), bar.clone(), |resident, incoming| {
                self.priority.compare(resident, incoming) == Ordering::Greater
            });

            match self.store.set_with_key(&key, &bar).await {
                Ok(written) => {
                    if written {
                        report.written += 1;
                    } else {
                        report.stale += 1;
                    }
                    let verified = match outcome {
                        MergeOutcome::Kept => true,
                        MergeOutcome::Replaced => written,
                        MergeOutcome::Inserted => false,
                    };
                    if !verified {
                        unverified.insert(bar.timestamp);
                    }
                }
                Err(error) => {
                    warn!(key = %key, provider = %bar.provider, error = %error, "durable write failed");
                    report.failed.push(FailedWrite {
                        timestamp: bar.timestamp,
                        provider: bar.provider,
                        error,
                    });
                }
            }
        }

        if !unverified.is_empty() {
            self.refresh_hot(symbol, timeframe, &unverified).await;
        }

        info!(
            symbol,
            timeframe = %timeframe,
            written = report.written,
            stale = report.stale,
            invalid = report.invalid.len(),
            failed = report.failed.len(),
            "stored bars"
        );
        report
    }

    /// Align hot entries at `timestamps` with the durable tier's resolution.
    ///
    /// Timestamps without a durable row, or all of them when the read fails,
    /// are dropped from memory so the next read goes to the durable tier.
    async fn refresh_hot(&self, symbol: &str, timeframe: Timeframe, timestamps: &BTreeSet<i64>) {
        let (Some(&first), Some(&last)) = (timestamps.first(), timestamps.last()) else {
            return;
        };
        let query = CacheQuery::new(symbol, timeframe, first, last.saturating_add(1));

        match self.store.get_range(&query).await {
            Ok(rows) => {
                let resolved: BTreeMap<i64, CachedBar> =
                    rows.into_iter().map(|bar| (bar.timestamp, bar)).collect();
                for &ts in timestamps {
                    let key = query.key_at(ts);
                    match resolved.get(&ts) {
                        Some(bar) => {
                            self.hot.merge(key, bar.clone(), |resident, durable| {
                                self.priority.compare(resident, durable) == Ordering::Greater
                            });
                        }
                        None => {
                            self.hot.remove(&key);
                        }
                    }
                }
                debug!(symbol, timeframe = %timeframe, bars = timestamps.len(), "hot tier refreshed");
            }
            Err(error) => {
                warn!(
                    symbol,
                    timeframe = %timeframe,
                    bars = timestamps.len(),
                    error = %error,
                    "durable read failed, dropping unconfirmed hot entries"
                );
                for &ts in timestamps {
                    self.hot.remove(&query.key_at(ts));
                }
            }
        }
    }

    /// Number of bars resident in memory.
    pub fn hot_size(&self) -> usize {
        self.hot.size()
    }

    /// Snapshot of the hot tier counters.
    pub fn hot_stats(&self) -> HotTierStats {
        self.hot.stats()
    }

    /// The provider ranking used for conflict resolution.
    pub fn priority(&self) -> &ProviderPriority {
        &self.priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use barcache_core::types::Bar;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Mutex;

    const STEP: i64 = 300_000;
    const T0: i64 = 1_700_000_100_000;

    /// In-memory durable tier double that counts calls.
    struct CountingStore {
        rows: Mutex<HashMap<(CacheKey, String), CachedBar>>,
        priority: ProviderPriority,
        range_calls: AtomicUsize,
        write_calls: AtomicUsize,
        fail_reads: AtomicBool,
        fail_write_at: Mutex<Option<i64>>,
    }

    impl CountingStore {
        fn new(priority: ProviderPriority) -> Self {
            Self {
                rows: Mutex::new(HashMap::new()),
                priority,
                range_calls: AtomicUsize::new(0),
                write_calls: AtomicUsize::new(0),
                fail_reads: AtomicBool::new(false),
                fail_write_at: Mutex::new(None),
            }
        }

        fn range_calls(&self) -> usize {
            self.range_calls.load(AtomicOrdering::SeqCst)
        }
    }

    #[async_trait]
    impl BarStore for CountingStore {
        async fn init(&self) -> Result<(), StorageError> {
            Ok(())
        }

        async fn get_range(&self, query: &CacheQuery) -> Result<Vec<CachedBar>, StorageError> {
            self.range_calls.fetch_add(1, AtomicOrdering::SeqCst);
            if self.fail_reads.load(AtomicOrdering::SeqCst) {
                return Err(StorageError::Unavailable("connection refused".to_string()));
            }

            let rows = self.rows.lock().unwrap();
            let mut by_ts: BTreeMap<i64, Vec<&CachedBar>> = BTreeMap::new();
            for ((key, _), bar) in rows.iter() {
                if key.symbol == query.symbol
                    && key.timeframe == query.timeframe
                    && query.contains(key.timestamp)
                {
                    by_ts.entry(key.timestamp).or_default().push(bar);
                }
            }
            Ok(by_ts
                .values()
                .filter_map(|group| self.priority.resolve(group.iter().copied()))
                .cloned()
                .collect())
        }

        async fn set_with_key(&self, key: &CacheKey, bar: &CachedBar) -> Result<bool, StorageError> {
            self.write_calls.fetch_add(1, AtomicOrdering::SeqCst);
            if *self.fail_write_at.lock().unwrap() == Some(key.timestamp) {
                return Err(StorageError::Unavailable("disk I/O error".to_string()));
            }

            let mut rows = self.rows.lock().unwrap();
            let slot = (key.clone(), bar.provider.clone());
            match rows.get(&slot) {
                Some(existing) if existing.revision >= bar.revision => Ok(false),
                _ => {
                    rows.insert(slot, bar.clone());
                    Ok(true)
                }
            }
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn bar(ts: i64, provider: &str, revision: u32, close: f64) -> CachedBar {
        CachedBar::from_bar(
            Bar::new(ts, close, close + 1.0, close - 1.0, close, 500.0),
            provider,
            revision,
            0,
        )
    }

    fn series(n: i64, provider: &str) -> Vec<CachedBar> {
        (0..n)
            .map(|i| bar(T0 + i * STEP, provider, 1, 100.0 + i as f64))
            .collect()
    }

    fn query(start: i64, end: i64) -> CacheQuery {
        CacheQuery::new("AAPL", Timeframe::Minute5, start, end)
    }

    fn setup(priority: &[&str], capacity: usize) -> (Arc<CountingStore>, CacheService) {
        let priority = ProviderPriority::new(priority.iter().copied());
        let store = Arc::new(CountingStore::new(priority.clone()));
        let service = CacheService::new(store.clone(), priority, capacity);
        (store, service)
    }

    #[tokio::test]
    async fn test_backfill_prevents_second_durable_query() {
        let (store, service) = setup(&["yahoo"], 100);
        // Seed the durable tier directly so memory starts cold
        for b in series(10, "yahoo") {
            let key = CacheKey::new("AAPL", Timeframe::Minute5, b.timestamp);
            store.set_with_key(&key, &b).await.unwrap();
        }

        let q = query(T0, T0 + 10 * STEP);
        let first = service.get_bars(&q).await.unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(store.range_calls(), 1);
        assert_eq!(service.hot_size(), 10);

        let second = service.get_bars(&q).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(store.range_calls(), 1);

        // A sub-range is also a complete hit
        let sub = service.get_bars(&query(T0 + 2 * STEP, T0 + 5 * STEP)).await.unwrap();
        assert_eq!(sub.len(), 3);
        assert_eq!(store.range_calls(), 1);
    }

    #[tokio::test]
    async fn test_gap_forces_whole_range_query() {
        let (store, service) = setup(&["yahoo"], 100);
        let mut bars = series(5, "yahoo");
        bars.remove(2);
        service.store_bars("AAPL", Timeframe::Minute5, bars).await;
        let reads = store.range_calls();

        let q = query(T0, T0 + 5 * STEP);
        let got = service.get_bars(&q).await.unwrap();
        assert_eq!(got.len(), 4);
        assert_eq!(store.range_calls(), reads + 1);

        // Still a gap, so memory cannot answer on its own
        service.get_bars(&q).await.unwrap();
        assert_eq!(store.range_calls(), reads + 2);
    }

    #[tokio::test]
    async fn test_write_through_serves_from_memory() {
        let (store, service) = setup(&["yahoo"], 100);
        let report = service
            .store_bars("AAPL", Timeframe::Minute5, series(6, "yahoo"))
            .await;
        assert_eq!(report.written, 6);
        assert!(report.is_clean());
        assert_eq!(store.write_calls.load(AtomicOrdering::SeqCst), 6);
        // One read confirms the whole batch against the durable tier
        assert_eq!(store.range_calls(), 1);

        let got = service.get_bars(&query(T0, T0 + 6 * STEP)).await.unwrap();
        assert_eq!(got.len(), 6);
        assert_eq!(store.range_calls(), 1);
    }

    #[tokio::test]
    async fn test_range_bounds_order_and_uniqueness() {
        let (_store, service) = setup(&["polygon", "yahoo"], 100);
        service
            .store_bars("AAPL", Timeframe::Minute5, series(10, "yahoo"))
            .await;
        service
            .store_bars("AAPL", Timeframe::Minute5, series(10, "polygon"))
            .await;

        // Unaligned bounds reaching past the stored bars
        let q = query(T0 - 7 * STEP + 1, T0 + 7 * STEP - 1);
        let got = service.get_bars(&q).await.unwrap();

        let ts: Vec<i64> = got.iter().map(|b| b.timestamp).collect();
        assert_eq!(ts, (0..7).map(|i| T0 + i * STEP).collect::<Vec<_>>());
        assert!(got.iter().all(|b| q.contains(b.timestamp)));
        assert!(got.iter().all(|b| b.provider == "polygon"));
    }

    #[tokio::test]
    async fn test_priority_example_scenario() {
        let (store, service) = setup(&["polygon", "yahoo"], 100);
        let t = T0;

        service
            .store_bars("AAPL", Timeframe::Minute5, vec![bar(t, "yahoo", 5, 100.0)])
            .await;
        service
            .store_bars("AAPL", Timeframe::Minute5, vec![bar(t, "polygon", 1, 101.0)])
            .await;

        let got = service.get_bars(&query(t, t + STEP)).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].provider, "polygon");
        assert_eq!(got[0].close, 101.0);

        // Durable view agrees
        let durable = store.get_range(&query(t, t + STEP)).await.unwrap();
        assert_eq!(durable[0].provider, "polygon");
    }

    #[tokio::test]
    async fn test_priority_independent_of_write_order() {
        let (_store, service) = setup(&["polygon", "yahoo"], 100);
        let t = T0;

        service
            .store_bars("AAPL", Timeframe::Minute5, vec![bar(t, "polygon", 1, 101.0)])
            .await;
        service
            .store_bars("AAPL", Timeframe::Minute5, vec![bar(t, "yahoo", 5, 100.0)])
            .await;

        let got = service.get_bars(&query(t, t + STEP)).await.unwrap();
        assert_eq!(got[0].provider, "polygon");
        assert_eq!(got[0].close, 101.0);
    }

    #[tokio::test]
    async fn test_stale_revision_ignored_in_both_tiers() {
        let (_store, service) = setup(&["yahoo"], 100);
        let t = T0;

        let first = service
            .store_bars("AAPL", Timeframe::Minute5, vec![bar(t, "yahoo", 3, 103.0)])
            .await;
        assert_eq!(first.written, 1);

        let stale = service
            .store_bars("AAPL", Timeframe::Minute5, vec![bar(t, "yahoo", 2, 102.0)])
            .await;
        assert_eq!(stale.stale, 1);
        assert!(stale.is_clean());

        let got = service.get_bars(&query(t, t + STEP)).await.unwrap();
        assert_eq!(got[0].revision, 3);
        assert_eq!(got[0].close, 103.0);

        let newer = service
            .store_bars("AAPL", Timeframe::Minute5, vec![bar(t, "yahoo", 4, 104.0)])
            .await;
        assert_eq!(newer.written, 1);
        let got = service.get_bars(&query(t, t + STEP)).await.unwrap();
        assert_eq!(got[0].close, 104.0);
    }

    #[tokio::test]
    async fn test_stale_write_after_eviction_stays_out_of_memory() {
        let (_store, service) = setup(&["yahoo"], 1);
        let t = T0;
        let key = CacheKey::new("AAPL", Timeframe::Minute5, t);

        service
            .store_bars("AAPL", Timeframe::Minute5, vec![bar(t, "yahoo", 3, 103.0)])
            .await;
        // Pushes the r3 copy out of memory
        service
            .store_bars("AAPL", Timeframe::Minute5, vec![bar(t + STEP, "yahoo", 1, 110.0)])
            .await;
        assert!(service.hot.get(&key).is_none());

        let stale = service
            .store_bars("AAPL", Timeframe::Minute5, vec![bar(t, "yahoo", 2, 102.0)])
            .await;
        assert_eq!(stale.stale, 1);
        assert_eq!(service.hot.get(&key).unwrap().revision, 3);

        let got = service.get_bars(&query(t, t + STEP)).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].revision, 3);
        assert_eq!(got[0].close, 103.0);
    }

    #[tokio::test]
    async fn test_lower_priority_write_after_eviction_stays_out_of_memory() {
        let (_store, service) = setup(&["polygon", "yahoo"], 1);
        let t = T0;
        let key = CacheKey::new("AAPL", Timeframe::Minute5, t);

        service
            .store_bars("AAPL", Timeframe::Minute5, vec![bar(t, "polygon", 1, 101.0)])
            .await;
        service
            .store_bars("AAPL", Timeframe::Minute5, vec![bar(t + STEP, "polygon", 1, 110.0)])
            .await;
        assert!(service.hot.get(&key).is_none());

        let report = service
            .store_bars("AAPL", Timeframe::Minute5, vec![bar(t, "yahoo", 5, 100.0)])
            .await;
        assert_eq!(report.written, 1);
        assert_eq!(service.hot.get(&key).unwrap().provider, "polygon");

        let got = service.get_bars(&query(t, t + STEP)).await.unwrap();
        assert_eq!(got[0].provider, "polygon");
        assert_eq!(got[0].close, 101.0);
    }

    #[tokio::test]
    async fn test_unconfirmed_bars_dropped_when_durable_read_fails() {
        let (store, service) = setup(&["yahoo"], 100);
        store.fail_reads.store(true, AtomicOrdering::SeqCst);

        let report = service
            .store_bars("AAPL", Timeframe::Minute5, series(3, "yahoo"))
            .await;
        assert_eq!(report.written, 3);
        assert!(report.is_clean());
        assert_eq!(service.hot_size(), 0);

        store.fail_reads.store(false, AtomicOrdering::SeqCst);
        let got = service.get_bars(&query(T0, T0 + 3 * STEP)).await.unwrap();
        assert_eq!(got.len(), 3);
        assert_eq!(service.hot_size(), 3);
    }

    #[tokio::test]
    async fn test_full_range_query_goes_durable() {
        let (store, service) = setup(&["yahoo"], 100);
        service
            .store_bars("AAPL", Timeframe::Minute5, series(2, "yahoo"))
            .await;
        let reads = store.range_calls();

        let got = service.get_bars(&query(i64::MIN, i64::MAX)).await.unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(store.range_calls(), reads + 1);
    }

    #[tokio::test]
    async fn test_invalid_bar_rejected_rest_stored() {
        let (store, service) = setup(&["yahoo"], 100);
        let mut bars = series(3, "yahoo");
        // high < low
        bars[1].high = 90.0;
        bars[1].low = 95.0;

        let report = service.store_bars("AAPL", Timeframe::Minute5, bars).await;
        assert_eq!(report.written, 2);
        assert_eq!(report.invalid.len(), 1);
        assert_eq!(report.invalid[0].timestamp, T0 + STEP);
        assert_eq!(report.total(), 3);
        assert_eq!(store.write_calls.load(AtomicOrdering::SeqCst), 2);
        assert!(service
            .hot
            .get(&CacheKey::new("AAPL", Timeframe::Minute5, T0 + STEP))
            .is_none());

        let err = report.into_result().unwrap_err();
        assert!(matches!(err, CacheError::PartialWrite { failed: 0, invalid: 1 }));
    }

    #[tokio::test]
    async fn test_durable_failure_keeps_hot_write_and_continues() {
        let (store, service) = setup(&["yahoo"], 100);
        *store.fail_write_at.lock().unwrap() = Some(T0 + STEP);

        let report = service
            .store_bars("AAPL", Timeframe::Minute5, series(3, "yahoo"))
            .await;
        assert_eq!(report.written, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].timestamp, T0 + STEP);
        assert!(matches!(report.failed[0].error, StorageError::Unavailable(_)));

        // The failed bar is still in memory, so the full range is a hit
        let reads = store.range_calls();
        let got = service.get_bars(&query(T0, T0 + 3 * STEP)).await.unwrap();
        assert_eq!(got.len(), 3);
        assert_eq!(store.range_calls(), reads);
    }

    #[tokio::test]
    async fn test_hot_only_bar_survives_merge_with_durable() {
        let (store, service) = setup(&["yahoo"], 100);
        *store.fail_write_at.lock().unwrap() = Some(T0);
        service
            .store_bars("AAPL", Timeframe::Minute5, series(2, "yahoo"))
            .await;

        // Range wider than what memory holds forces the durable read
        let reads = store.range_calls();
        let got = service.get_bars(&query(T0, T0 + 3 * STEP)).await.unwrap();
        assert_eq!(store.range_calls(), reads + 1);
        let ts: Vec<i64> = got.iter().map(|b| b.timestamp).collect();
        assert_eq!(ts, vec![T0, T0 + STEP]);
    }

    #[tokio::test]
    async fn test_read_failure_propagates() {
        let (store, service) = setup(&["yahoo"], 100);
        store.fail_reads.store(true, AtomicOrdering::SeqCst);

        let err = service.get_bars(&query(T0, T0 + STEP)).await.unwrap_err();
        assert!(matches!(err, CacheError::Storage(StorageError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_empty_range_skips_everything() {
        let (store, service) = setup(&["yahoo"], 100);
        assert!(service.get_bars(&query(T0, T0)).await.unwrap().is_empty());
        assert!(service.get_bars(&query(T0, T0 - 1)).await.unwrap().is_empty());
        assert_eq!(store.range_calls(), 0);
    }

    #[tokio::test]
    async fn test_range_larger_than_hot_capacity_goes_durable() {
        let (store, service) = setup(&["yahoo"], 4);
        service
            .store_bars("AAPL", Timeframe::Minute5, series(8, "yahoo"))
            .await;
        let reads = store.range_calls();

        let got = service.get_bars(&query(T0, T0 + 8 * STEP)).await.unwrap();
        assert_eq!(got.len(), 8);
        assert_eq!(store.range_calls(), reads + 1);
        assert_eq!(service.hot_size(), 4);
        assert_eq!(service.hot_stats().capacity, 4);
    }

    #[tokio::test]
    async fn test_sqlite_round_trip_across_restart() {
        use barcache_store::SqliteBarStore;

        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("cache.db").display());
        let priority = ProviderPriority::new(["polygon", "yahoo"]);
        let t = T0;

        {
            let store = SqliteBarStore::open(&url, 2, priority.clone()).unwrap();
            let service = CacheService::new(Arc::new(store), priority.clone(), 100);
            service.init().await.unwrap();

            let report = service
                .store_bars(
                    "AAPL",
                    Timeframe::Minute5,
                    vec![bar(t, "yahoo", 5, 100.0), bar(t, "polygon", 1, 101.0)],
                )
                .await;
            assert_eq!(report.written, 2);
        }

        // Fresh process: cold memory, same database
        let store = SqliteBarStore::open(&url, 2, priority.clone()).unwrap();
        let service = CacheService::new(Arc::new(store), priority, 100);
        service.init().await.unwrap();
        assert_eq!(service.hot_size(), 0);

        let got = service.get_bars(&query(t, t + STEP)).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].provider, "polygon");
        assert_eq!(got[0].close, 101.0);
        assert_eq!(service.hot_size(), 1);
    }
}
