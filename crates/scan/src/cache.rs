//! Type index caches
//!
//! Building a [`ColumnIndex`] walks the whole type; caches keep one per
//! record type so a scan pass only pays for it once. A cache instance
//! belongs to one mapping configuration, since the index depends on it.

use crate::config::DEFAULT_CACHE_CAPACITY;
use crate::error::Result;
use crate::index::ColumnIndex;
use dashmap::DashMap;
use lru::LruCache;
use parking_lot::Mutex;
use std::any::TypeId;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of entries in cache
    pub size: usize,
    /// Maximum capacity, `None` when unbounded
    pub capacity: Option<usize>,
    pub hits: u64,
    pub misses: u64,
}

/// Concurrent memo of column indexes keyed by record type
pub trait IndexCache: Send + Sync {
    fn get(&self, type_id: TypeId) -> Option<Arc<ColumnIndex>>;

    /// Install `index` unless another caller got there first; returns the
    /// installed entry either way
    fn install(&self, index: ColumnIndex) -> Arc<ColumnIndex>;

    fn len(&self) -> usize;

    fn clear(&self);

    fn stats(&self) -> CacheStats;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up `type_id`, building and installing on a miss
    fn get_or_build(
        &self,
        type_id: TypeId,
        build: &dyn Fn() -> Result<ColumnIndex>,
    ) -> Result<Arc<ColumnIndex>> {
        if let Some(index) = self.get(type_id) {
            return Ok(index);
        }
        let index = build()?;
        Ok(self.install(index))
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Counters {
    fn record(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

/// Unbounded cache; readers of unrelated types never wait on each other
#[derive(Debug, Default)]
pub struct ConcurrentIndexCache {
    entries: DashMap<TypeId, Arc<ColumnIndex>>,
    counters: Counters,
}

impl ConcurrentIndexCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IndexCache for ConcurrentIndexCache {
    fn get(&self, type_id: TypeId) -> Option<Arc<ColumnIndex>> {
        let found = self.entries.get(&type_id).map(|entry| entry.value().clone());
        self.counters.record(found.is_some());
        found
    }

    fn install(&self, index: ColumnIndex) -> Arc<ColumnIndex> {
        let type_name = index.type_name();
        let installed = self
            .entries
            .entry(index.type_id())
            .or_insert_with(|| Arc::new(index))
            .value()
            .clone();
        tracing::debug!("Cached column index for {}", type_name);
        installed
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&self) {
        self.entries.clear();
        self.counters.reset();
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            capacity: None,
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
        }
    }
}

/// Bounded cache evicting the least recently used record type
#[derive(Debug)]
pub struct LruIndexCache {
    entries: Mutex<LruCache<TypeId, Arc<ColumnIndex>>>,
    counters: Counters,
}

impl LruIndexCache {
    /// Create a new cache with default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Create a new cache with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            counters: Counters::default(),
        }
    }
}

impl Default for LruIndexCache {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexCache for LruIndexCache {
    fn get(&self, type_id: TypeId) -> Option<Arc<ColumnIndex>> {
        let found = self.entries.lock().get(&type_id).cloned();
        self.counters.record(found.is_some());
        found
    }

    fn install(&self, index: ColumnIndex) -> Arc<ColumnIndex> {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(&index.type_id()) {
            return existing.clone();
        }

        let index = Arc::new(index);
        if let Some((evicted_id, evicted)) = entries.push(index.type_id(), index.clone())
            && evicted_id != index.type_id()
        {
            tracing::debug!("Evicted column index for {}", evicted.type_name());
        }
        index
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn clear(&self) {
        self.entries.lock().clear();
        self.counters.reset();
    }

    fn stats(&self) -> CacheStats {
        let entries = self.entries.lock();
        CacheStats {
            size: entries.len(),
            capacity: Some(entries.cap().get()),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
        }
    }
}
