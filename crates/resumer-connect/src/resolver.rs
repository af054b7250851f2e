//! Address resolution with exact address-family filtering.
//!
//! A [`Resolver`] returns candidate addresses in preference order. When a
//! family is requested the result contains only that family; an empty result
//! means the host exists but has no such address, which is distinct from
//! [`ResolveError::NotFound`].

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use crate::error::{ConnectError, ResolveError};

/// IP address family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Whether `addr` belongs to this family.
    pub fn matches(&self, addr: &IpAddr) -> bool {
        match self {
            Self::V4 => addr.is_ipv4(),
            Self::V6 => addr.is_ipv6(),
        }
    }

    /// The family number callers use (`4` or `6`).
    pub fn number(&self) -> u8 {
        match self {
            Self::V4 => 4,
            Self::V6 => 6,
        }
    }
}

impl TryFrom<u8> for AddressFamily {
    type Error = ConnectError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(Self::V4),
            6 => Ok(Self::V6),
            other => Err(ConnectError::InvalidFamily(other)),
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => f.write_str("IPv4"),
            Self::V6 => f.write_str("IPv6"),
        }
    }
}

/// Resolves host names to addresses.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `host`, keeping only addresses of `family` when given.
    async fn resolve(
        &self,
        host: &str,
        family: Option<AddressFamily>,
    ) -> Result<Vec<IpAddr>, ResolveError>;
}

/// Keep only addresses of the requested family, preserving order.
fn filter_family(addrs: Vec<IpAddr>, family: Option<AddressFamily>) -> Vec<IpAddr> {
    match family {
        Some(family) => addrs.into_iter().filter(|a| family.matches(a)).collect(),
        None => addrs,
    }
}

/// Parse `host` as an IP literal, accepting bracketed IPv6.
fn ip_literal(host: &str) -> Option<IpAddr> {
    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    bare.parse().ok()
}

/// Resolver backed by the operating system (`getaddrinfo` via tokio).
#[derive(Debug, Clone, Default)]
pub struct SystemResolver;

impl SystemResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve(
        &self,
        host: &str,
        family: Option<AddressFamily>,
    ) -> Result<Vec<IpAddr>, ResolveError> {
        if let Some(ip) = ip_literal(host) {
            return Ok(filter_family(vec![ip], family));
        }

        let resolved = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|e| ResolveError::not_found(host, e.to_string()))?;

        let mut addrs: Vec<IpAddr> = Vec::new();
        for sock in resolved {
            if !addrs.contains(&sock.ip()) {
                addrs.push(sock.ip());
            }
        }

        if addrs.is_empty() {
            return Err(ResolveError::not_found(host, "no addresses returned"));
        }

        trace!(host = %host, count = addrs.len(), "Resolved host");
        Ok(filter_family(addrs, family))
    }
}

/// Resolver backed by a fixed host table.
///
/// Host names are matched case-insensitively. Unknown hosts go to the
/// fallback resolver if one is set, otherwise they fail with `NotFound`.
#[derive(Clone, Default)]
pub struct StaticResolver {
    hosts: HashMap<String, Vec<IpAddr>>,
    fallback: Option<Arc<dyn Resolver>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `host` to `addrs` (in preference order), replacing any prior entry.
    pub fn with_host(mut self, host: impl AsRef<str>, addrs: impl IntoIterator<Item = IpAddr>) -> Self {
        self.insert(host, addrs);
        self
    }

    /// Consult `fallback` for hosts not in the table.
    pub fn with_fallback(mut self, fallback: Arc<dyn Resolver>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn insert(&mut self, host: impl AsRef<str>, addrs: impl IntoIterator<Item = IpAddr>) {
        self.hosts
            .insert(host.as_ref().to_ascii_lowercase(), addrs.into_iter().collect());
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl fmt::Debug for StaticResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticResolver")
            .field("hosts", &self.hosts)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn resolve(
        &self,
        host: &str,
        family: Option<AddressFamily>,
    ) -> Result<Vec<IpAddr>, ResolveError> {
        if let Some(addrs) = self.hosts.get(&host.to_ascii_lowercase()) {
            return Ok(filter_family(addrs.clone(), family));
        }
        if let Some(ip) = ip_literal(host) {
            return Ok(filter_family(vec![ip], family));
        }
        match &self.fallback {
            Some(fallback) => fallback.resolve(host, family).await,
            None => Err(ResolveError::not_found(host, "not in host table")),
        }
    }
}
