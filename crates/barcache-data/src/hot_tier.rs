//! Bounded in-memory hot tier.
//!
//! A recency-ordered map: entries live in a slab threaded by a doubly-linked
//! list (head = most recently touched, tail = least), indexed by a hash map.
//! `get` and `set` both move the entry to the head; overflow evicts the tail.

use barcache_core::types::{CacheKey, CachedBar};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Point-in-time hot tier counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HotTierStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
}

impl HotTierStats {
    /// Fraction of lookups served from memory.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// What [`HotTier::merge`] did with the incoming bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Nothing was resident; the incoming bar was inserted unchecked.
    Inserted,
    /// The resident bar lost and was replaced.
    Replaced,
    /// The resident bar won and stayed.
    Kept,
}

#[derive(Debug)]
struct Node {
    key: CacheKey,
    bar: CachedBar,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug, Default)]
struct LruMap {
    index: HashMap<CacheKey, usize>,
    nodes: Vec<Node>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    stats: HotTierStats,
}

impl LruMap {
    fn detach(&mut self, idx: usize) {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);
        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }
        self.nodes[idx].prev = None;
        self.nodes[idx].next = None;
    }

    fn push_front(&mut self, idx: usize) {
        self.nodes[idx].prev = None;
        self.nodes[idx].next = self.head;
        if let Some(h) = self.head {
            self.nodes[h].prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn touch(&mut self, idx: usize) {
        if self.head != Some(idx) {
            self.detach(idx);
            self.push_front(idx);
        }
    }

    fn get(&mut self, key: &CacheKey) -> Option<CachedBar> {
        match self.index.get(key).copied() {
            Some(idx) => {
                self.stats.hits += 1;
                self.touch(idx);
                Some(self.nodes[idx].bar.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    fn set(&mut self, key: CacheKey, bar: CachedBar, capacity: usize) {
        self.stats.inserts += 1;

        if let Some(&idx) = self.index.get(&key) {
            self.nodes[idx].bar = bar;
            self.touch(idx);
            return;
        }

        let node = Node {
            key: key.clone(),
            bar,
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };
        self.index.insert(key, idx);
        self.push_front(idx);

        while self.index.len() > capacity {
            self.evict_tail();
        }
    }

    fn unlink(&mut self, idx: usize) {
        self.detach(idx);
        self.index.remove(&self.nodes[idx].key);
        self.free.push(idx);
    }

    fn evict_tail(&mut self) {
        let Some(idx) = self.tail else {
            return;
        };
        self.unlink(idx);
        self.stats.evictions += 1;
    }
}

/// Fixed-capacity LRU store of cached bars.
///
/// Every operation runs under one mutex for its whole duration; nothing in
/// here performs I/O, so the lock is never held across a store call.
#[derive(Debug)]
pub struct HotTier {
    capacity: usize,
    inner: Mutex<LruMap>,
}

impl HotTier {
    /// Create a hot tier holding at most `capacity` bars.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(LruMap::default()),
        }
    }

    // A panic while holding the lock cannot leave the list half-linked
    // (no user code runs inside), so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, LruMap> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a bar, marking it most recently used.
    pub fn get(&self, key: &CacheKey) -> Option<CachedBar> {
        self.lock().get(key)
    }

    /// Look up several bars under one lock acquisition.
    pub fn get_many(&self, keys: &[CacheKey]) -> Vec<Option<CachedBar>> {
        let mut map = self.lock();
        keys.iter().map(|k| map.get(k)).collect()
    }

    /// Insert or replace a bar unconditionally, evicting the least recently
    /// used entry on overflow.
    pub fn set(&self, key: CacheKey, bar: CachedBar) {
        self.lock().set(key, bar, self.capacity);
    }

    /// Insert many bars under one lock acquisition.
    pub fn extend(&self, entries: impl IntoIterator<Item = (CacheKey, CachedBar)>) {
        let mut map = self.lock();
        for (key, bar) in entries {
            map.set(key, bar, self.capacity);
        }
    }

    /// Insert `incoming` unless `keep_resident(resident, incoming)` says the
    /// current entry should stay. Either way the key becomes most recent.
    ///
    /// Only a resident entry is compared against; with nothing resident the
    /// bar goes in as-is and the outcome is [`MergeOutcome::Inserted`].
    pub fn merge<F>(&self, key: CacheKey, incoming: CachedBar, keep_resident: F) -> MergeOutcome
    where
        F: FnOnce(&CachedBar, &CachedBar) -> bool,
    {
        let mut map = self.lock();
        let outcome = match map.index.get(&key).copied() {
            Some(idx) => {
                if keep_resident(&map.nodes[idx].bar, &incoming) {
                    map.touch(idx);
                    return MergeOutcome::Kept;
                }
                MergeOutcome::Replaced
            }
            None => MergeOutcome::Inserted,
        };
        map.set(key, incoming, self.capacity);
        outcome
    }

    /// Drop one bar, returning it if it was resident.
    pub fn remove(&self, key: &CacheKey) -> Option<CachedBar> {
        let mut map = self.lock();
        let idx = map.index.get(key).copied()?;
        map.unlink(idx);
        Some(map.nodes[idx].bar.clone())
    }

    /// Number of resident bars.
    pub fn size(&self) -> usize {
        self.lock().index.len()
    }

    /// Maximum number of resident bars.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot the counters.
    pub fn stats(&self) -> HotTierStats {
        let map = self.lock();
        HotTierStats {
            size: map.index.len(),
            capacity: self.capacity,
            ..map.stats
        }
    }
}
