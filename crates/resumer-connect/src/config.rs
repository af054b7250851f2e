//! Dispatcher and per-call connection options.

use std::time::Duration;

use crate::error::Result;
use crate::resolver::AddressFamily;

/// Default time allowed for opening the transport.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time allowed for the handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Dispatcher-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Limit on transport open. `None` waits indefinitely.
    pub connect_timeout: Option<Duration>,

    /// Limit on the handshake. `None` waits indefinitely.
    pub handshake_timeout: Option<Duration>,

    /// Family pin applied when a call does not set one.
    pub default_family: Option<AddressFamily>,

    /// Whether cached sessions are offered by default.
    pub reuse_sessions: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            handshake_timeout: Some(DEFAULT_HANDSHAKE_TIMEOUT),
            default_family: None,
            reuse_sessions: true,
        }
    }
}

impl DispatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }

    /// Remove both timeouts.
    pub fn without_timeouts(mut self) -> Self {
        self.connect_timeout = None;
        self.handshake_timeout = None;
        self
    }

    pub fn with_default_family(mut self, family: AddressFamily) -> Self {
        self.default_family = Some(family);
        self
    }

    pub fn with_session_reuse(mut self, enabled: bool) -> Self {
        self.reuse_sessions = enabled;
        self
    }
}

/// Options for a single `connect` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Pin the connection to one address family.
    pub family: Option<AddressFamily>,

    /// Override the dispatcher's session reuse setting for this call.
    pub reuse_session: Option<bool>,
}

impl ConnectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_family(mut self, family: AddressFamily) -> Self {
        self.family = Some(family);
        self
    }

    /// Pin by family number, `4` or `6`.
    pub fn with_family_number(self, family: u8) -> Result<Self> {
        Ok(self.with_family(AddressFamily::try_from(family)?))
    }

    /// Never offer a cached session on this call.
    pub fn without_session_reuse(mut self) -> Self {
        self.reuse_session = Some(false);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectError;

    #[test]
    fn test_dispatcher_defaults() {
        let config = DispatcherConfig::default();
        assert_eq!(config.connect_timeout, Some(DEFAULT_CONNECT_TIMEOUT));
        assert_eq!(config.handshake_timeout, Some(DEFAULT_HANDSHAKE_TIMEOUT));
        assert_eq!(config.default_family, None);
        assert!(config.reuse_sessions);

        let config = config.without_timeouts();
        assert_eq!(config.connect_timeout, None);
        assert_eq!(config.handshake_timeout, None);
    }

    #[test]
    fn test_family_number() {
        let opts = ConnectOptions::new().with_family_number(6).unwrap();
        assert_eq!(opts.family, Some(AddressFamily::V6));

        let err = ConnectOptions::new().with_family_number(0).unwrap_err();
        assert!(matches!(err, ConnectError::InvalidFamily(0)));
    }
}
