//! Client-side TLS session cache.
//!
//! This crate holds the resumable state negotiated with remote endpoints:
//! - [`EndpointKey`] identifies a logical `host:port` (host compared case-insensitively)
//! - [`SessionRecord`] is an immutable snapshot of a resumable session
//! - [`SessionStore`] maps each endpoint to at most one record, last write wins
//!
//! The store is unbounded and never expires entries unless configured to.
//!
//! # Example
//!
//! ```rust,ignore
//! use resumer_session::{EndpointKey, ProtocolVersion, SessionRecord, SessionStore, StoreConfig};
//!
//! let store = SessionStore::new(StoreConfig::default());
//! let key = EndpointKey::new("Example.COM", 443);
//! store.insert(key.clone(), SessionRecord::new(vec![1, 2, 3], ProtocolVersion::Tls12));
//! assert!(store.has_entry(&EndpointKey::new("example.com", 443)));
//! ```

mod config;
mod endpoint;
mod error;
mod record;
mod store;
mod ttl;

pub use config::StoreConfig;
pub use endpoint::EndpointKey;
pub use error::{Error, Result};
pub use record::{ProtocolVersion, SessionRecord};
pub use store::{SessionStore, StoreStats};
