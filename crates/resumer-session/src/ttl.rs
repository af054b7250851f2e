//! TTL tracking for session expiration.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Tracks insert times for age-based expiration.
#[derive(Debug)]
pub(crate) struct TtlTracker<K> {
    /// When each key was last stored.
    stored_at: HashMap<K, Instant>,

    /// TTL duration (None means no expiration).
    ttl: Option<Duration>,
}

impl<K: Hash + Eq + Clone> TtlTracker<K> {
    /// Create a new TTL tracker with the given duration.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            stored_at: HashMap::new(),
            ttl,
        }
    }

    /// Record a fresh store for a key (restarts its clock).
    pub fn touch(&mut self, key: &K) {
        self.stored_at.insert(key.clone(), Instant::now());
    }

    /// Check if a key has expired.
    ///
    /// Untracked keys only count as expired when a TTL is configured.
    pub fn is_expired(&self, key: &K) -> bool {
        match self.ttl {
            None => false,
            Some(ttl) => match self.stored_at.get(key) {
                None => true,
                Some(stored) => stored.elapsed() > ttl,
            },
        }
    }

    /// Remove tracking for a key.
    pub fn remove(&mut self, key: &K) {
        self.stored_at.remove(key);
    }

    /// Get all expired keys.
    pub fn get_expired(&self) -> Vec<K> {
        match self.ttl {
            None => Vec::new(),
            Some(ttl) => {
                let now = Instant::now();
                self.stored_at
                    .iter()
                    .filter(|(_, stored)| now.duration_since(**stored) > ttl)
                    .map(|(key, _)| key.clone())
                    .collect()
            }
        }
    }

    /// Remove all expired entries and return their keys.
    pub fn drain_expired(&mut self) -> Vec<K> {
        let expired = self.get_expired();
        for key in &expired {
            self.stored_at.remove(key);
        }
        expired
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.stored_at.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.stored_at.is_empty()
    }

    pub fn clear(&mut self) {
        self.stored_at.clear();
    }
}
