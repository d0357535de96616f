//! Byte-bounded LRU store.
//!
//! Recency order is kept in an `IndexMap`: front = least recently used,
//! back = most recently used. An entry's accounted size is
//! `key.len() + value.weight()`, and `set` evicts from the front until the
//! store fits its budget again.
//!
//! # Performance
//!
//! | Operation | Complexity | Notes |
//! |-----------|------------|-------|
//! | get | O(n) worst | `shift_remove` + reinsert to promote |
//! | set | O(n) worst | same promotion path |
//! | eviction | O(n) worst | `shift_remove_index(0)` from the front |
//!
//! The store itself is single-threaded; concurrent callers go through
//! [`SafeCache`](crate::SafeCache), which serializes access behind one
//! mutex.

use indexmap::IndexMap;

/// A value that can report its size in bytes.
///
/// The store is parameterized over this capability so the accounting in
/// [`LruStore`] works for any value type; the cache instantiates it with
/// [`Chunk`](crate::Chunk).
pub trait Weighted {
    /// Size of the value in bytes.
    fn weight(&self) -> usize;
}

impl Weighted for String {
    fn weight(&self) -> usize {
        self.len()
    }
}

/// Hook invoked with `(key, value)` after an entry is removed by eviction.
pub type EvictionHook<V> = Box<dyn FnMut(String, V) + Send>;

/// Capacity-bounded recency-ordered map.
pub struct LruStore<V> {
    /// Maximum bytes the store may hold; `0` disables eviction.
    max_bytes: usize,
    /// Bytes currently accounted for.
    cur_bytes: usize,
    /// Entries in recency order (front = LRU, back = MRU).
    entries: IndexMap<String, V>,
    on_evicted: Option<EvictionHook<V>>,
    evictions: u64,
}

impl<V: Weighted> LruStore<V> {
    /// Creates a store bounded to `max_bytes` (`0` = unbounded), with an
    /// optional eviction hook.
    #[must_use]
    pub fn new(max_bytes: usize, on_evicted: Option<EvictionHook<V>>) -> Self {
        Self {
            max_bytes,
            cur_bytes: 0,
            entries: IndexMap::new(),
            on_evicted,
            evictions: 0,
        }
    }

    /// Looks up `key`, promoting the entry to most-recent on a hit.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        if !self.entries.contains_key(key) {
            return None;
        }
        self.promote(key);
        self.entries.get(key)
    }

    /// Upserts `key`. An existing entry keeps its key, gets the new value,
    /// has its byte accounting adjusted, and is promoted to most-recent.
    /// Afterwards the store evicts least-recent entries while it exceeds
    /// its budget; a single call may evict several entries, including the
    /// one just inserted if it alone is larger than the budget.
    pub fn set(&mut self, key: &str, value: V) {
        let added = entry_weight(key, &value);
        if let Some((existing, old)) = self.entries.shift_remove_entry(key) {
            self.cur_bytes -= entry_weight(&existing, &old);
            self.entries.insert(existing, value);
        } else {
            self.entries.insert(key.to_string(), value);
        }
        self.cur_bytes += added;

        while self.max_bytes > 0 && self.cur_bytes > self.max_bytes {
            self.evict_lru();
        }
    }

    /// Number of resident entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes currently accounted for.
    #[must_use]
    pub fn cur_bytes(&self) -> usize {
        self.cur_bytes
    }

    /// Number of entries removed by eviction since construction.
    #[must_use]
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Moves `key` to the most-recent end.
    fn promote(&mut self, key: &str) {
        if let Some((existing, value)) = self.entries.shift_remove_entry(key) {
            self.entries.insert(existing, value);
        }
    }

    /// Removes the least-recent entry and fires the eviction hook.
    fn evict_lru(&mut self) {
        if let Some((key, value)) = self.entries.shift_remove_index(0) {
            self.cur_bytes -= entry_weight(&key, &value);
            self.evictions += 1;
            if let Some(hook) = self.on_evicted.as_mut() {
                hook(key, value);
            }
        }
    }
}

fn entry_weight<V: Weighted>(key: &str, value: &V) -> usize {
    key.len() + value.weight()
}
