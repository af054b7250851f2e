//! Outcome classification for failed handshakes.
//!
//! Decides whether a failure is attributable to the cached session that was
//! offered. Only a protocol version mismatch while a session was on offer
//! counts: the peer could not resume a session negotiated under a version it
//! does not speak. Every other failure leaves the cache alone.

use crate::handshake::FailureReason;

/// What the dispatcher knows about a failed handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorSignal {
    pub reason: FailureReason,
    /// Whether a cached session was offered on this attempt.
    pub session_offered: bool,
}

impl ErrorSignal {
    pub fn new(reason: FailureReason, session_offered: bool) -> Self {
        Self {
            reason,
            session_offered,
        }
    }
}

/// Verdict on a failed handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The offered session caused the failure; evict it.
    SessionIncompatible,
    /// No cache action.
    Unrelated,
}

impl Classification {
    pub fn warrants_eviction(&self) -> bool {
        matches!(self, Self::SessionIncompatible)
    }
}

/// Classify a handshake failure.
pub fn classify(signal: &ErrorSignal) -> Classification {
    match signal.reason {
        FailureReason::VersionMismatch if signal.session_offered => {
            Classification::SessionIncompatible
        }
        _ => Classification::Unrelated,
    }
}
