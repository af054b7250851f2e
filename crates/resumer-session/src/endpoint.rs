//! Endpoint identity used as the cache key.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A logical `(host, port)` a client connects to.
///
/// The host is lowercased on construction, so two keys are equal exactly when
/// their hosts match case-insensitively and their ports match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointKey {
    host: String,
    port: u16,
}

impl EndpointKey {
    /// Create a key, normalizing the host to lowercase.
    pub fn new(host: impl AsRef<str>, port: u16) -> Self {
        Self {
            host: host.as_ref().to_ascii_lowercase(),
            port,
        }
    }

    /// The normalized (lowercase) host.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for EndpointKey {
    type Err = Error;

    /// Parse `host:port` or `[v6-literal]:port`.
    fn from_str(s: &str) -> Result<Self> {
        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| Error::invalid_endpoint(s, "unterminated '['"))?;
            let port = tail
                .strip_prefix(':')
                .ok_or_else(|| Error::invalid_endpoint(s, "missing port"))?;
            (host, port)
        } else {
            let (host, port) = s
                .rsplit_once(':')
                .ok_or_else(|| Error::invalid_endpoint(s, "missing port"))?;
            if host.contains(':') {
                return Err(Error::invalid_endpoint(
                    s,
                    "IPv6 hosts must be written as [addr]:port",
                ));
            }
            (host, port)
        };

        if host.is_empty() {
            return Err(Error::invalid_endpoint(s, "empty host"));
        }
        let port = port
            .parse::<u16>()
            .map_err(|e| Error::invalid_endpoint(s, format!("bad port: {e}")))?;

        Ok(Self::new(host, port))
    }
}
