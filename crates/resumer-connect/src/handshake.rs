//! The handshake capability the dispatcher drives.
//!
//! A [`Handshaker`] wraps whatever TLS library actually performs the
//! handshake. It receives the opened transport and, optionally, a cached
//! session to offer for resumption. The peer is free to ignore the offer.

use std::fmt;
use std::io;

use async_trait::async_trait;
use resumer_session::{EndpointKey, SessionRecord};
use thiserror::Error;

/// A completed handshake.
#[derive(Debug)]
pub struct Negotiated<S> {
    /// The secured stream.
    pub stream: S,

    /// Session state to cache for the endpoint.
    pub record: SessionRecord,

    /// Whether the offered session was resumed.
    pub reused: bool,
}

/// Symbolic reason a handshake failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// The peer refused the protocol version in play.
    VersionMismatch,
    /// Certificate verification failed.
    Certificate,
    /// The peer sent a fatal alert not covered above.
    Alert(u8),
    /// The peer closed the connection mid-handshake.
    ConnectionClosed,
    /// An I/O error surfaced during the handshake.
    Io(io::ErrorKind),
    /// The handshake did not finish in time.
    Timeout,
    Other,
}

impl FailureReason {
    /// Map a TLS library's error text onto a reason code.
    ///
    /// For handshakers whose underlying library reports failures only as
    /// strings. Unknown text maps to [`FailureReason::Other`].
    pub fn from_library_message(message: &str) -> Self {
        let msg = message.to_ascii_lowercase();

        const VERSION_MARKERS: [&str; 5] = [
            "wrong version number",
            "unsupported protocol",
            "version too low",
            "alert protocol version",
            "protocol version mismatch",
        ];

        if VERSION_MARKERS.iter().any(|m| msg.contains(m)) {
            Self::VersionMismatch
        } else if msg.contains("certificate") {
            Self::Certificate
        } else if msg.contains("timed out") || msg.contains("timeout") {
            Self::Timeout
        } else if msg.contains("unexpected eof")
            || msg.contains("connection reset")
            || msg.contains("socket hang up")
        {
            Self::ConnectionClosed
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VersionMismatch => f.write_str("protocol version mismatch"),
            Self::Certificate => f.write_str("certificate rejected"),
            Self::Alert(code) => write!(f, "fatal alert {code}"),
            Self::ConnectionClosed => f.write_str("connection closed"),
            Self::Io(kind) => write!(f, "I/O error ({kind})"),
            Self::Timeout => f.write_str("timed out"),
            Self::Other => f.write_str("handshake failed"),
        }
    }
}

/// The error signal produced by a failed handshake.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}: {detail}")]
pub struct HandshakeFailure {
    pub reason: FailureReason,
    /// Human-readable detail from the TLS library or peer.
    pub detail: String,
}

impl HandshakeFailure {
    pub fn new(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }

    /// Build a failure from library error text, deriving the reason code.
    pub fn from_library_message(message: impl Into<String>) -> Self {
        let detail = message.into();
        Self::new(FailureReason::from_library_message(&detail), detail)
    }

    pub fn timeout() -> Self {
        Self::new(FailureReason::Timeout, "handshake did not complete in time")
    }
}

impl From<io::Error> for HandshakeFailure {
    fn from(err: io::Error) -> Self {
        Self::new(FailureReason::Io(err.kind()), err.to_string())
    }
}

/// Performs a TLS handshake over an opened transport.
#[async_trait]
pub trait Handshaker<S: Send + 'static>: Send + Sync {
    /// Run the handshake, offering `offered` for resumption if present.
    async fn handshake(
        &self,
        stream: S,
        endpoint: &EndpointKey,
        offered: Option<&SessionRecord>,
    ) -> std::result::Result<Negotiated<S>, HandshakeFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_message_mapping() {
        let cases = [
            (
                "error:1408F10B:SSL routines:ssl3_get_record:wrong version number",
                FailureReason::VersionMismatch,
            ),
            ("tlsv1 alert protocol version", FailureReason::VersionMismatch),
            ("certificate verify failed", FailureReason::Certificate),
            ("operation timed out", FailureReason::Timeout),
            ("socket hang up", FailureReason::ConnectionClosed),
            ("something else entirely", FailureReason::Other),
        ];

        for (message, expected) in cases {
            assert_eq!(
                FailureReason::from_library_message(message),
                expected,
                "message: {message}"
            );
        }
    }

    #[test]
    fn test_failure_display() {
        let failure = HandshakeFailure::from_library_message("Wrong Version Number");
        assert_eq!(failure.reason, FailureReason::VersionMismatch);
        assert_eq!(
            failure.to_string(),
            "protocol version mismatch: Wrong Version Number"
        );
    }

    #[test]
    fn test_from_io_error() {
        let failure: HandshakeFailure = io::Error::from(io::ErrorKind::BrokenPipe).into();
        assert_eq!(failure.reason, FailureReason::Io(io::ErrorKind::BrokenPipe));
    }
}
