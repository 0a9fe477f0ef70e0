//! Size-bounded in-memory key/value cache with per-entry expiry.
//!
//! Two instances run side by side: one for pending OAuth states and one for
//! access tokens. All operations are lock-free from the caller's point of view
//! (sharded `DashMap`), so a handle can be shared across tasks via `Arc`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Default number of entries dropped when the cache is full.
const DEFAULT_PRUNE_BATCH: usize = 100;

/// Result of a cache read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V> {
    Hit(V),
    /// Only produced by caches built with `return_expired(true)`.
    Expired(V),
    Miss,
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
    /// Recency stamp, bumped on every read and write.
    touched: u64,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug)]
pub struct MemoryCache<V> {
    name: &'static str,
    entries: DashMap<String, Entry<V>>,
    default_ttl: Duration,
    capacity: usize,
    prune_batch: usize,
    return_expired: bool,
    clock: AtomicU64,
}

impl<V: Clone> MemoryCache<V> {
    /// `capacity` is the maximum number of live entries; `default_ttl` applies
    /// to [`save`](Self::save).
    pub fn new(name: &'static str, capacity: usize, default_ttl: Duration) -> Self {
        Self {
            name,
            entries: DashMap::new(),
            default_ttl,
            capacity: capacity.max(1),
            prune_batch: DEFAULT_PRUNE_BATCH,
            return_expired: false,
            clock: AtomicU64::new(0),
        }
    }

    /// Keep expired entries readable as [`Lookup::Expired`] until evicted.
    pub fn return_expired(mut self, enabled: bool) -> Self {
        self.return_expired = enabled;
        self
    }

    pub fn prune_batch(mut self, batch: usize) -> Self {
        self.prune_batch = batch.max(1);
        self
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn save(&self, key: impl Into<String>, value: V) {
        self.save_with_ttl(key, value, self.default_ttl);
    }

    pub fn save_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.prune();
        }
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .or_else(|| now.checked_add(self.default_ttl))
            .unwrap_or(now);
        let entry = Entry {
            value,
            expires_at,
            touched: self.tick(),
        };
        self.entries.insert(key, entry);
    }

    pub fn get(&self, key: &str) -> Lookup<V> {
        let now = Instant::now();
        let stamp = self.tick();
        let expired_value = match self.entries.get_mut(key) {
            None => return Lookup::Miss,
            Some(mut entry) => {
                if !entry.is_expired(now) {
                    entry.touched = stamp;
                    return Lookup::Hit(entry.value.clone());
                }
                self.return_expired.then(|| entry.value.clone())
            }
        };

        match expired_value {
            Some(value) => Lookup::Expired(value),
            None => {
                self.entries.remove_if(key, |_, e| e.is_expired(now));
                Lookup::Miss
            }
        }
    }

    /// Atomically remove and return a live entry. Expired entries are dropped
    /// and reported as absent.
    pub fn take(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let (_, entry) = self.entries.remove(key)?;
        (!entry.is_expired(now)).then_some(entry.value)
    }

    pub fn delete(&self, key: &str) {
        self.entries.remove(key);
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Drop expired entries, then the least recently touched batch if the
    /// cache is still full.
    fn prune(&self) {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));

        if self.entries.len() >= self.capacity {
            let mut by_age: Vec<(String, u64)> = self
                .entries
                .iter()
                .map(|e| (e.key().clone(), e.value().touched))
                .collect();
            by_age.sort_unstable_by_key(|(_, touched)| *touched);
            for (key, _) in by_age.into_iter().take(self.prune_batch) {
                self.entries.remove(&key);
            }
        }

        tracing::debug!(
            "cache {}: pruned {} entries",
            self.name,
            before.saturating_sub(self.entries.len())
        );
    }
}
