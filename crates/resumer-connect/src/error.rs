//! Error types for connection establishment.

use std::io;
use std::net::SocketAddr;

use resumer_session::EndpointKey;
use thiserror::Error;

use crate::classifier::Classification;
use crate::handshake::{FailureReason, HandshakeFailure};
use crate::resolver::AddressFamily;

/// Result type for dispatcher operations.
pub type Result<T> = std::result::Result<T, ConnectError>;

/// Failure reported by a [`Resolver`](crate::Resolver).
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The host name has no addresses at all.
    #[error("host '{host}' not found: {reason}")]
    NotFound { host: String, reason: String },
}

impl ResolveError {
    pub fn not_found(host: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotFound {
            host: host.into(),
            reason: reason.into(),
        }
    }
}

/// Why a `connect` call failed.
///
/// Only [`ConnectError::Handshake`] can ever have touched the session store,
/// and only by evicting the endpoint's own entry.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The host could not be resolved.
    #[error("name resolution failed for '{host}': {source}")]
    NameResolution {
        host: String,
        #[source]
        source: ResolveError,
    },

    /// The host resolved, but not to any address of the pinned family.
    #[error("no {family} address available for '{host}'")]
    AddressFamilyUnavailable {
        host: String,
        family: AddressFamily,
    },

    /// Opening the transport failed before any handshake started.
    #[error("transport error connecting to {addr}: {source}")]
    Transport {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The peer rejected the handshake.
    #[error("handshake with {endpoint} failed: {failure}")]
    Handshake {
        endpoint: EndpointKey,
        #[source]
        failure: HandshakeFailure,
        /// How the failure was classified.
        classification: Classification,
        /// Whether a cached session was evicted because of it.
        evicted: bool,
    },

    /// An address family number other than 4 or 6 was requested.
    #[error("invalid address family {0}: expected 4 or 6")]
    InvalidFamily(u8),
}

impl ConnectError {
    /// True if the failure was attributed to an incompatible cached session.
    pub fn is_session_incompatible(&self) -> bool {
        matches!(
            self,
            Self::Handshake {
                classification: Classification::SessionIncompatible,
                ..
            }
        )
    }

    /// True if this failure caused the endpoint's cached session to be dropped.
    pub fn evicted_session(&self) -> bool {
        matches!(self, Self::Handshake { evicted: true, .. })
    }

    /// The handshake failure reason, if the attempt got that far.
    pub fn handshake_reason(&self) -> Option<FailureReason> {
        match self {
            Self::Handshake { failure, .. } => Some(failure.reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConnectError::AddressFamilyUnavailable {
            host: "v4only.example".to_string(),
            family: AddressFamily::V6,
        };
        assert_eq!(
            err.to_string(),
            "no IPv6 address available for 'v4only.example'"
        );

        let err = ConnectError::NameResolution {
            host: "nowhere.invalid".to_string(),
            source: ResolveError::not_found("nowhere.invalid", "no such host"),
        };
        assert!(err.to_string().contains("nowhere.invalid"));

        let err = ConnectError::InvalidFamily(5);
        assert!(err.to_string().contains("expected 4 or 6"));
    }

    #[test]
    fn test_handshake_helpers() {
        let err = ConnectError::Handshake {
            endpoint: EndpointKey::new("a.example", 443),
            failure: HandshakeFailure::new(FailureReason::VersionMismatch, "wrong version number"),
            classification: Classification::SessionIncompatible,
            evicted: true,
        };
        assert!(err.is_session_incompatible());
        assert!(err.evicted_session());
        assert_eq!(err.handshake_reason(), Some(FailureReason::VersionMismatch));
        assert!(err.to_string().contains("wrong version number"));

        let err = ConnectError::Transport {
            addr: "127.0.0.1:1".parse().unwrap(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        assert!(!err.is_session_incompatible());
        assert!(!err.evicted_session());
        assert_eq!(err.handshake_reason(), None);
    }
}
