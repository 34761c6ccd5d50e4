//! Read-through response cache for the upstream API client.
//!
//! Entries are keyed by the fully resolved request URL. Expiry is lazy: an
//! entry older than the TTL is reported as absent and stays in the map until
//! a later store overwrites it or the cache is cleared.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    stored_at: Instant,
    last_used: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    tick: u64,
}

/// In-memory TTL cache shared by concurrent requests.
///
/// The lock is never held across an await point, so two requests racing on
/// the same key may both miss and both fetch; the later store wins.
#[derive(Debug)]
pub struct TtlCache {
    ttl: Duration,
    capacity: Option<usize>,
    inner: Mutex<Inner>,
}

impl TtlCache {
    /// Unbounded cache. A zero `ttl` never produces a hit.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            capacity: None,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Cache holding at most `capacity` entries, evicting the least recently
    /// used one when full.
    pub fn with_capacity(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: Some(capacity.max(1)),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return a copy of the value stored under `key` if it is still fresh.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;
        let entry = inner.entries.get_mut(key)?;
        if entry.stored_at.elapsed() >= self.ttl {
            return None;
        }
        entry.last_used = tick;
        Some(entry.value.clone())
    }

    /// Store `value` under `key`, replacing any previous entry and its timestamp.
    pub fn insert(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;

        if let Some(cap) = self.capacity {
            if inner.entries.len() >= cap && !inner.entries.contains_key(&key) {
                let oldest = inner
                    .entries
                    .iter()
                    .min_by_key(|(_, e)| e.last_used)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    tracing::debug!(key = %oldest, "evicting least recently used cache entry");
                    inner.entries.remove(&oldest);
                }
            }
        }

        inner.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
                last_used: tick,
            },
        );
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Number of stored entries, fresh or expired.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
