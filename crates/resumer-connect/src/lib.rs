//! Connection dispatcher with TLS session reuse.
//!
//! [`Dispatcher::connect`] resolves an endpoint (honoring an optional address
//! family pin exactly), opens a transport, offers any cached session to the
//! handshake, and keeps the [`SessionStore`] in step with the outcome:
//!
//! - a successful handshake always stores the freshly negotiated record
//! - a failure classified as [`Classification::SessionIncompatible`] evicts
//!   the endpoint's record so the next attempt performs a full handshake
//! - every failure is returned to the caller; nothing is retried internally
//!
//! The handshake itself, the byte transport and name resolution are
//! collaborators behind the [`Handshaker`], [`Connector`] and [`Resolver`]
//! traits. The [`mock`] module provides in-memory versions of all three.

pub mod classifier;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handshake;
pub mod mock;
pub mod resolver;
pub mod transport;

pub use classifier::{Classification, ErrorSignal, classify};
pub use config::{ConnectOptions, DispatcherConfig};
pub use connection::Connection;
pub use dispatcher::Dispatcher;
pub use error::{ConnectError, ResolveError, Result};
pub use handshake::{FailureReason, HandshakeFailure, Handshaker, Negotiated};
pub use resolver::{AddressFamily, Resolver, StaticResolver, SystemResolver};
pub use transport::{Connector, TcpConnector};

pub use resumer_session::{EndpointKey, ProtocolVersion, SessionRecord, SessionStore, StoreConfig};
