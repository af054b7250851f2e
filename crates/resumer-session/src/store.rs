//! Endpoint-keyed session store.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::config::StoreConfig;
use crate::endpoint::EndpointKey;
use crate::record::SessionRecord;
use crate::ttl::TtlTracker;

/// Inner state protected by the store lock.
struct StoreInner {
    /// Records in recency order. Unbounded unless `max_sessions` is set.
    lru: LruCache<EndpointKey, SessionRecord>,

    /// TTL tracker for expiration.
    ttl: TtlTracker<EndpointKey>,

    hits: u64,
    misses: u64,
    inserts: u64,
    evictions: u64,
    capacity_drops: u64,
}

impl StoreInner {
    /// Drop `key` if its TTL has lapsed. Returns true if it was dropped.
    fn expire(&mut self, key: &EndpointKey) -> bool {
        if !self.ttl.is_expired(key) {
            return false;
        }
        self.ttl.remove(key);
        if self.lru.pop(key).is_some() {
            debug!(endpoint = %key, "Cached session expired");
        }
        true
    }
}

/// Maps each endpoint to at most one [`SessionRecord`].
///
/// All operations take a single short lock and never await, so concurrent
/// connection attempts can share one store freely. Interleaved `insert` and
/// `evict` calls on one key resolve last-writer-wins.
///
/// Cloning the store yields another handle to the same entries.
pub struct SessionStore {
    inner: Arc<Mutex<StoreInner>>,
    config: StoreConfig,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new(config: StoreConfig) -> Self {
        let lru = match config.max_sessions.and_then(NonZeroUsize::new) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };

        let inner = StoreInner {
            lru,
            ttl: TtlTracker::new(config.ttl),
            hits: 0,
            misses: 0,
            inserts: 0,
            evictions: 0,
            capacity_drops: 0,
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Get the current record for an endpoint, if any.
    ///
    /// Marks the endpoint as recently used.
    pub fn lookup(&self, key: &EndpointKey) -> Option<SessionRecord> {
        let mut inner = self.inner.lock();

        if inner.expire(key) {
            inner.misses += 1;
            return None;
        }

        match inner.lru.get(key).cloned() {
            Some(record) => {
                inner.hits += 1;
                trace!(endpoint = %key, version = %record.protocol_version(), "Session cache hit");
                Some(record)
            }
            None => {
                inner.misses += 1;
                trace!(endpoint = %key, "Session cache miss");
                None
            }
        }
    }

    /// Store a record, replacing whatever the endpoint had before.
    ///
    /// If the store is bounded and full, the least recently used endpoint
    /// is dropped to make room.
    pub fn insert(&self, key: EndpointKey, record: SessionRecord) {
        if !self.config.retains_sessions() {
            trace!(endpoint = %key, "Session caching disabled, dropping record");
            return;
        }

        let mut inner = self.inner.lock();

        if let Some((displaced, _)) = inner.lru.push(key.clone(), record) {
            if displaced != key {
                debug!(endpoint = %displaced, "Dropping least recently used session to make room");
                inner.ttl.remove(&displaced);
                inner.capacity_drops += 1;
            }
        }
        inner.ttl.touch(&key);
        inner.inserts += 1;

        trace!(
            endpoint = %key,
            cache_size = inner.lru.len(),
            "Session stored"
        );
    }

    /// Remove any record for an endpoint.
    ///
    /// Returns whether a record was present; evicting an absent key is a no-op.
    pub fn evict(&self, key: &EndpointKey) -> bool {
        let mut inner = self.inner.lock();
        inner.ttl.remove(key);
        let removed = inner.lru.pop(key).is_some();
        if removed {
            inner.evictions += 1;
            debug!(endpoint = %key, "Session evicted");
        }
        removed
    }

    /// Check whether a live record exists, without touching recency.
    pub fn has_entry(&self, key: &EndpointKey) -> bool {
        let inner = self.inner.lock();
        inner.lru.contains(key) && !inner.ttl.is_expired(key)
    }

    /// Look at a record without updating recency or stats.
    pub fn peek(&self, key: &EndpointKey) -> Option<SessionRecord> {
        let inner = self.inner.lock();
        if inner.ttl.is_expired(key) {
            None
        } else {
            inner.lru.peek(key).cloned()
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().lru.is_empty()
    }

    /// All endpoints with a live record, most recently used first.
    pub fn keys(&self) -> Vec<EndpointKey> {
        let inner = self.inner.lock();
        inner
            .lru
            .iter()
            .filter(|(key, _)| !inner.ttl.is_expired(key))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Drop every record.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        let count = inner.lru.len();
        inner.lru.clear();
        inner.ttl.clear();
        debug!(count = count, "Session store cleared");
    }

    /// Drop records whose TTL has lapsed. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut inner = self.inner.lock();
        let expired = inner.ttl.drain_expired();
        let mut count = 0;
        for key in expired {
            if inner.lru.pop(&key).is_some() {
                count += 1;
            }
        }

        if count > 0 {
            debug!(count = count, "Cleaned up expired sessions");
        }

        count
    }

    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.lock();
        StoreStats {
            size: inner.lru.len(),
            capacity: self.config.max_sessions,
            hits: inner.hits,
            misses: inner.misses,
            inserts: inner.inserts,
            evictions: inner.evictions,
            capacity_drops: inner.capacity_drops,
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl Clone for SessionStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            config: self.config.clone(),
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("config", &self.config)
            .field("size", &self.len())
            .finish()
    }
}

/// Store statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Current number of cached endpoints.
    pub size: usize,

    /// Configured bound, `None` when unbounded.
    pub capacity: Option<usize>,

    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,

    /// Explicit evictions (not capacity drops or expiry).
    pub evictions: u64,

    /// Entries dropped because the store was full.
    pub capacity_drops: u64,
}
