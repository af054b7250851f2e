//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [cache]
//! enabled = true
//! max_sessions = 100        # omit for unbounded
//! ttl_secs = 300            # omit for no expiry
//!
//! [connect]
//! connect_timeout_ms = 10000   # 0 disables the limit
//! handshake_timeout_ms = 10000
//! family = 6                   # optional default pin
//! reuse_sessions = true
//!
//! [hosts]
//! "localhost" = ["::1", "127.0.0.1"]
//! ```

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use resumer_connect::{
    AddressFamily, Connector, Dispatcher, DispatcherConfig, Handshaker, Resolver, StaticResolver,
    SystemResolver,
};
use resumer_session::{SessionStore, StoreConfig};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumerConfig {
    /// Session store settings.
    pub cache: Option<CacheSection>,

    /// Dispatcher settings.
    pub connect: Option<ConnectSection>,

    /// Static host table, host name to addresses in preference order.
    ///
    /// Host names are matched case-insensitively; [`ResumerConfig::from_toml`]
    /// and [`ResumerConfig::merge`] store them lowercased.
    pub hosts: BTreeMap<String, Vec<IpAddr>>,
}

impl ResumerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string and validate.
    ///
    /// Two spellings of one host in the same document are rejected, since
    /// neither can be said to override the other.
    pub fn from_toml(s: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(s)?;
        config.hosts = fold_host_case(std::mem::take(&mut config.hosts))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one.
    ///
    /// Sections present in `other` replace ours; host entries are merged
    /// per host, ignoring case, with `other` winning.
    pub fn merge(&mut self, other: ResumerConfig) {
        if other.cache.is_some() {
            self.cache = other.cache;
        }

        if other.connect.is_some() {
            self.connect = other.connect;
        }

        if self.hosts.keys().any(|h| !is_folded(h)) {
            let hosts = std::mem::take(&mut self.hosts);
            self.hosts = hosts
                .into_iter()
                .map(|(host, addrs)| (host.to_ascii_lowercase(), addrs))
                .collect();
        }
        for (host, addrs) in other.hosts {
            self.hosts.insert(host.to_ascii_lowercase(), addrs);
        }
    }

    /// Check value ranges that the TOML types alone cannot express.
    pub fn validate(&self) -> Result<()> {
        if let Some(connect) = &self.connect {
            connect.family()?;
        }
        for (host, addrs) in &self.hosts {
            if host.trim().is_empty() {
                return Err(ConfigError::invalid("hosts", "empty host name"));
            }
            if addrs.is_empty() {
                return Err(ConfigError::invalid(
                    &format!("hosts.{host}"),
                    "at least one address is required",
                ));
            }
        }
        Ok(())
    }

    /// Session store settings, falling back to defaults.
    pub fn store_config(&self) -> StoreConfig {
        self.cache.clone().unwrap_or_default().into()
    }

    /// Dispatcher settings, falling back to defaults.
    pub fn dispatcher_config(&self) -> Result<DispatcherConfig> {
        self.connect.clone().unwrap_or_default().try_into()
    }

    /// The resolver described by `[hosts]`, backed by the system resolver.
    pub fn resolver(&self) -> Arc<dyn Resolver> {
        if self.hosts.is_empty() {
            return Arc::new(SystemResolver::new());
        }

        let mut table = StaticResolver::new().with_fallback(Arc::new(SystemResolver::new()));
        for (host, addrs) in &self.hosts {
            table.insert(host, addrs.iter().copied());
        }
        Arc::new(table)
    }

    /// Build a dispatcher over a fresh store with every section applied.
    pub fn dispatcher<C, H>(&self, connector: C, handshaker: H) -> Result<Dispatcher<C, H>>
    where
        C: Connector,
        H: Handshaker<C::Stream>,
    {
        let config = self.dispatcher_config()?;
        let store = SessionStore::new(self.store_config());
        tracing::debug!(
            hosts = self.hosts.len(),
            reuse_sessions = config.reuse_sessions,
            "building dispatcher from config"
        );
        Ok(Dispatcher::new(store, self.resolver(), connector, handshaker).with_config(config))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// [cache]
// ─────────────────────────────────────────────────────────────────────────────

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub enabled: bool,

    /// Bound on cached endpoints; unbounded when omitted.
    pub max_sessions: Option<usize>,

    /// Maximum session age in seconds; no expiry when omitted.
    pub ttl_secs: Option<u64>,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            max_sessions: None,
            ttl_secs: None,
        }
    }
}

impl From<CacheSection> for StoreConfig {
    fn from(section: CacheSection) -> Self {
        let mut config = StoreConfig::new().with_enabled(section.enabled);
        if let Some(max) = section.max_sessions {
            config = config.with_max_sessions(max);
        }
        if let Some(secs) = section.ttl_secs {
            config = config.with_ttl(Duration::from_secs(secs));
        }
        config
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// [connect]
// ─────────────────────────────────────────────────────────────────────────────

/// Default transport and handshake limits, in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// `[connect]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectSection {
    /// Transport open limit; `0` disables it.
    pub connect_timeout_ms: u64,

    /// Handshake limit; `0` disables it.
    pub handshake_timeout_ms: u64,

    /// Default address family pin, `4` or `6`.
    pub family: Option<u8>,

    /// Offer cached sessions by default; on when omitted.
    pub reuse_sessions: Option<bool>,
}

impl Default for ConnectSection {
    fn default() -> Self {
        Self {
            connect_timeout_ms: DEFAULT_TIMEOUT_MS,
            handshake_timeout_ms: DEFAULT_TIMEOUT_MS,
            family: None,
            reuse_sessions: None,
        }
    }
}

impl ConnectSection {
    /// The configured family pin, if valid.
    pub fn family(&self) -> Result<Option<AddressFamily>> {
        self.family
            .map(|n| {
                AddressFamily::try_from(n)
                    .map_err(|_| ConfigError::invalid("connect.family", format!("{n} is not 4 or 6")))
            })
            .transpose()
    }

    pub fn reuse_sessions(&self) -> bool {
        self.reuse_sessions.unwrap_or(true)
    }
}

fn is_folded(host: &str) -> bool {
    !host.bytes().any(|b| b.is_ascii_uppercase())
}

/// Lowercase host keys, rejecting two spellings of the same host.
fn fold_host_case(hosts: BTreeMap<String, Vec<IpAddr>>) -> Result<BTreeMap<String, Vec<IpAddr>>> {
    let mut folded = BTreeMap::new();
    for (host, addrs) in hosts {
        let key = host.to_ascii_lowercase();
        if folded.insert(key.clone(), addrs).is_some() {
            return Err(ConfigError::invalid(
                &format!("hosts.{host}"),
                format!("'{key}' is listed more than once with different case"),
            ));
        }
    }
    Ok(folded)
}

fn limit(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

impl TryFrom<ConnectSection> for DispatcherConfig {
    type Error = ConfigError;

    fn try_from(section: ConnectSection) -> Result<Self> {
        let family = section.family()?;
        let mut config = DispatcherConfig::new().without_timeouts();
        config.connect_timeout = limit(section.connect_timeout_ms);
        config.handshake_timeout = limit(section.handshake_timeout_ms);
        config.default_family = family;
        config.reuse_sessions = section.reuse_sessions();
        Ok(config)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
