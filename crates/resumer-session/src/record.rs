//! Resumable session snapshots.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// TLS protocol version a session was negotiated under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProtocolVersion {
    #[serde(rename = "tls1.0")]
    Tls10,
    #[serde(rename = "tls1.1")]
    Tls11,
    #[serde(rename = "tls1.2")]
    Tls12,
    #[serde(rename = "tls1.3")]
    Tls13,
}

impl ProtocolVersion {
    /// All versions, oldest first.
    pub const ALL: [ProtocolVersion; 4] = [Self::Tls10, Self::Tls11, Self::Tls12, Self::Tls13];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tls10 => "tls1.0",
            Self::Tls11 => "tls1.1",
            Self::Tls12 => "tls1.2",
            Self::Tls13 => "tls1.3",
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['v', '_'], ".");
        match normalized.as_str() {
            "tls1.0" | "tls1" | "tls.1" | "tls.1.0" => Ok(Self::Tls10),
            "tls1.1" | "tls.1.1" => Ok(Self::Tls11),
            "tls1.2" | "tls.1.2" => Ok(Self::Tls12),
            "tls1.3" | "tls.1.3" => Ok(Self::Tls13),
            _ => Err(Error::UnknownVersion(s.to_string())),
        }
    }
}

/// An immutable snapshot of resumable handshake state.
///
/// The ticket bytes are shared, so cloning a record is cheap and no clone
/// can observe a change in another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    ticket: Arc<[u8]>,
    protocol_version: ProtocolVersion,
    created_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Create a record stamped with the current time.
    pub fn new(ticket: impl Into<Vec<u8>>, protocol_version: ProtocolVersion) -> Self {
        Self::with_created_at(ticket, protocol_version, Utc::now())
    }

    /// Create a record with an explicit creation timestamp.
    pub fn with_created_at(
        ticket: impl Into<Vec<u8>>,
        protocol_version: ProtocolVersion,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            ticket: Arc::from(ticket.into()),
            protocol_version,
            created_at,
        }
    }

    /// The opaque resumable session blob.
    pub fn ticket(&self) -> &[u8] {
        &self.ticket
    }

    pub fn protocol_version(&self) -> ProtocolVersion {
        self.protocol_version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
