//! Capacity-bounded TTL cache.
//!
//! Memoizes external calls: session-scoped batch fetches live for two
//! hours (a session replays its batches verbatim), relation ingests for
//! one minute.  Treated as an injected service — construct per process,
//! pass by reference, give tests their own instance.

use std::hash::Hash;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

/// Default entry capacity, matching the external-call memoization budget.
pub const CACHE_CAPACITY: usize = 1024;

pub struct TtlCache<K, V> {
    capacity: usize,
    ttl: Duration,
    map: FxHashMap<K, (Instant, V)>,
}

impl<K: Hash + Eq + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self { capacity, ttl, map: FxHashMap::default() }
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    /// Clock-injected lookup, used directly by tests.
    pub fn get_at(&mut self, key: &K, now: Instant) -> Option<V> {
        match self.map.get(key) {
            Some((inserted, value)) if now.duration_since(*inserted) < self.ttl => {
                Some(value.clone())
            }
            Some(_) => {
                self.map.remove(key);
                None
            }
            None => None,
        }
    }

    /// Clock-injected insert.  At capacity, expired entries are purged
    /// first, then the oldest entry is evicted.
    pub fn insert_at(&mut self, key: K, value: V, now: Instant) {
        if self.map.len() >= self.capacity && !self.map.contains_key(&key) {
            self.map
                .retain(|_, (inserted, _)| now.duration_since(*inserted) < self.ttl);

            if self.map.len() >= self.capacity {
                if let Some(oldest) = self
                    .map
                    .iter()
                    .min_by_key(|(_, (inserted, _))| *inserted)
                    .map(|(k, _)| k.clone())
                {
                    self.map.remove(&oldest);
                }
            }
        }

        self.map.insert(key, (now, value));
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
