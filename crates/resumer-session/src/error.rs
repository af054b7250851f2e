//! Error types for session cache operations.

/// Error type for session cache operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An endpoint string could not be parsed as `host:port`.
    #[error("Invalid endpoint '{input}': {reason}")]
    InvalidEndpoint { input: String, reason: String },

    /// A protocol version tag was not recognized.
    #[error("Unknown protocol version: {0}")]
    UnknownVersion(String),
}

impl Error {
    pub(crate) fn invalid_endpoint(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for session cache operations.
pub type Result<T> = std::result::Result<T, Error>;
