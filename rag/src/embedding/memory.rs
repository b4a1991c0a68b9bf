//! In-memory LRU tier of the embedding cache.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

struct CacheEntry {
    vector: Vec<f32>,
    created: Instant,
}

struct MemoryCacheState {
    entries: HashMap<String, CacheEntry>,
    /// Access order, least recently used at the front.
    access: VecDeque<String>,
}

/// Bounded LRU cache with per-entry TTL, safe for concurrent use.
///
/// Expired entries are never served; they are evicted on access. When the
/// cache is full, inserting drops the least recently used entry.
pub(crate) struct MemoryCache {
    capacity: usize,
    ttl: Duration,
    inner: Mutex<MemoryCacheState>,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

impl MemoryCache {
    pub(crate) fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            inner: Mutex::new(MemoryCacheState {
                entries: HashMap::new(),
                access: VecDeque::new(),
            }),
        }
    }

    /// Returns a fresh entry and marks it most recently used.
    pub(crate) fn get(&self, key: &str) -> Option<Vec<f32>> {
        let mut guard = self.inner.lock();
        let state = &mut *guard;

        match state.entries.get(key) {
            None => None,
            Some(entry) if entry.created.elapsed() > self.ttl => {
                state.entries.remove(key);
                state.access.retain(|k| k != key);
                None
            }
            Some(entry) => {
                let vector = entry.vector.clone();
                state.access.retain(|k| k != key);
                state.access.push_back(key.to_string());
                Some(vector)
            }
        }
    }

    /// Inserts an entry, evicting the least recently used one when full.
    pub(crate) fn put(&self, key: String, vector: Vec<f32>) {
        let mut guard = self.inner.lock();
        let state = &mut *guard;

        if state.entries.contains_key(&key) {
            state.access.retain(|k| k != &key);
        } else if state.entries.len() >= self.capacity {
            if let Some(oldest) = state.access.pop_front() {
                state.entries.remove(&oldest);
            }
        }

        state.access.push_back(key.clone());
        state.entries.insert(
            key,
            CacheEntry {
                vector,
                created: Instant::now(),
            },
        );
    }

    pub(crate) fn remove(&self, key: &str) -> bool {
        let mut state = self.inner.lock();
        let removed = state.entries.remove(key).is_some();
        if removed {
            state.access.retain(|k| k != key);
        }
        removed
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub(crate) const fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn clear(&self) {
        let mut state = self.inner.lock();
        state.entries.clear();
        state.access.clear();
    }
}
