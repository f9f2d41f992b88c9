//! Process-wide key/value store with per-entry expiry.
//!
//! Backed by a sharded `DashMap`, so concurrent readers and writers from
//! separate requests never block each other for long. There is no capacity
//! bound: entries only leave when they expire.

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Expiry used when `now + ttl` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct TtlCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Returns the live value for `key`; an expired entry is removed and
    /// reported as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Some(entry.value.clone());
            }
        } else {
            return None;
        }
        // a concurrent put may have refreshed the key since the read above
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        None
    }

    /// Stores `value` for `ttl`, replacing anything held under `key`.
    /// A ttl too large for the clock is capped at roughly a century.
    pub fn put(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        let entry = CacheEntry { value, expires_at };
        self.entries.insert(key.into(), entry);
    }

    /// Number of stored entries, expired ones included until read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
