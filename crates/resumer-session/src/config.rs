//! Configuration for the session store.

use std::time::Duration;

/// Default capacity (none - the store is unbounded).
pub const DEFAULT_MAX_SESSIONS: Option<usize> = None;

/// Default TTL for cached sessions (none - sessions live until replaced or evicted).
pub const DEFAULT_TTL: Option<Duration> = None;

/// Configuration for the session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Whether sessions are cached at all.
    /// A disabled store accepts inserts but never retains them.
    pub enabled: bool,

    /// Maximum number of endpoints to cache before dropping the least
    /// recently used one. `None` means unbounded.
    pub max_sessions: Option<usize>,

    /// Optional maximum age of a cached session, measured from insert.
    pub ttl: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_sessions: DEFAULT_MAX_SESSIONS,
            ttl: DEFAULT_TTL,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the number of cached endpoints.
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = Some(max);
        self
    }

    /// Remove the capacity bound.
    pub fn unbounded(mut self) -> Self {
        self.max_sessions = None;
        self
    }

    /// Set the TTL for cached sessions.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Disable TTL (sessions don't expire based on time).
    pub fn without_ttl(mut self) -> Self {
        self.ttl = None;
        self
    }

    /// Enable or disable caching entirely.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// A capacity of zero is the same as disabling the store.
    pub(crate) fn retains_sessions(&self) -> bool {
        self.enabled && self.max_sessions != Some(0)
    }
}
