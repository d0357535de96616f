//! Concurrency wrapper over the LRU store.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;

use crate::chunk::Chunk;
use crate::lru::LruStore;

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of evictions.
    pub evictions: u64,
    /// Number of resident entries.
    pub entries: usize,
    /// Bytes currently accounted for.
    pub bytes: usize,
}

impl CacheStats {
    /// Calculate hit rate (0.0 to 1.0).
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let rate = self.hits as f64 / total as f64;
            rate
        }
    }
}

/// Thread-safe cache: all store access is serialized behind one mutex.
///
/// Construction of the underlying [`LruStore`] is deferred to the first
/// `set`. Groups are typically long-lived and may never be written, so a
/// zero-initialized cache stays allocation-free and a `get` against it is
/// simply a miss.
pub struct SafeCache {
    max_bytes: usize,
    store: Mutex<Option<LruStore<Chunk>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SafeCache {
    /// Creates a cache bounded to `max_bytes` (`0` = unbounded).
    #[must_use]
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            store: Mutex::new(None),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Looks up `key`, promoting the entry on a hit.
    pub fn get(&self, key: &str) -> Option<Chunk> {
        let hit = {
            let mut store = self.store.lock();
            store.as_mut().and_then(|s| s.get(key).cloned())
        };
        match hit {
            Some(chunk) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(chunk)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Inserts or overwrites `key`, constructing the store on first use.
    pub fn set(&self, key: &str, value: Chunk) {
        let mut store = self.store.lock();
        store
            .get_or_insert_with(|| LruStore::new(self.max_bytes, None))
            .set(key, value);
    }

    /// Returns a snapshot of the cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let store = self.store.lock();
        let (evictions, entries, bytes) = store
            .as_ref()
            .map_or((0, 0, 0), |s| (s.evictions(), s.len(), s.cur_bytes()));
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions,
            entries,
            bytes,
        }
    }
}
