//! Connection dispatcher.
//!
//! One `connect` call is one attempt: resolve, open, handshake, then apply
//! exactly one store update for the outcome. The store is only touched after
//! the handshake future has resolved, so an attempt that is dropped part way
//! through leaves the cache as it found it.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use resumer_session::{EndpointKey, SessionRecord, SessionStore};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::classifier::{ErrorSignal, classify};
use crate::config::{ConnectOptions, DispatcherConfig};
use crate::connection::Connection;
use crate::error::{ConnectError, ResolveError, Result};
use crate::handshake::{HandshakeFailure, Handshaker, Negotiated};
use crate::resolver::{AddressFamily, Resolver};
use crate::transport::Connector;

/// Establishes TLS connections, reusing and maintaining cached sessions.
pub struct Dispatcher<C, H> {
    store: SessionStore,
    resolver: Arc<dyn Resolver>,
    connector: C,
    handshaker: H,
    config: DispatcherConfig,
}

impl<C, H> Dispatcher<C, H>
where
    C: Connector,
    H: Handshaker<C::Stream>,
{
    /// Create a dispatcher over an explicitly provided store.
    pub fn new(store: SessionStore, resolver: Arc<dyn Resolver>, connector: C, handshaker: H) -> Self {
        Self {
            store,
            resolver,
            connector,
            handshaker,
            config: DispatcherConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// The session store this dispatcher reads and maintains.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Connect to `host:port`.
    pub async fn connect_to(
        &self,
        host: &str,
        port: u16,
        options: ConnectOptions,
    ) -> Result<Connection<C::Stream>> {
        self.connect(&EndpointKey::new(host, port), options).await
    }

    /// Connect to `endpoint`, offering its cached session if one exists.
    ///
    /// Failures are always returned to the caller. A failure classified as
    /// session-incompatible additionally evicts the endpoint's session so the
    /// next call performs a full handshake.
    #[instrument(
        skip_all,
        fields(endpoint = %endpoint, family = ?options.family)
    )]
    pub async fn connect(
        &self,
        endpoint: &EndpointKey,
        options: ConnectOptions,
    ) -> Result<Connection<C::Stream>> {
        let family = options.family.or(self.config.default_family);
        let addr = self.select_address(endpoint, family).await?;
        let stream = self.open(addr).await?;

        let reuse = options.reuse_session.unwrap_or(self.config.reuse_sessions);
        let offered = if reuse { self.store.lookup(endpoint) } else { None };
        let session_offered = offered.is_some();

        debug!(
            remote = %addr,
            session_offered,
            offered_version = ?offered.as_ref().map(|s| s.protocol_version()),
            "Starting handshake"
        );

        match self.handshake(stream, endpoint, offered.as_ref()).await {
            Ok(negotiated) => Ok(self.complete(endpoint, addr, negotiated, session_offered)),
            Err(failure) => Err(self.fail(endpoint, failure, session_offered)),
        }
    }

    /// Resolve and pick the first candidate address.
    async fn select_address(
        &self,
        endpoint: &EndpointKey,
        family: Option<AddressFamily>,
    ) -> Result<SocketAddr> {
        let host = endpoint.host();
        let addrs = self
            .resolver
            .resolve(host, family)
            .await
            .map_err(|source| ConnectError::NameResolution {
                host: host.to_string(),
                source,
            })?;

        let Some(ip) = addrs.first().copied() else {
            return Err(match family {
                Some(family) => {
                    debug!(host = %host, %family, "No address of requested family");
                    ConnectError::AddressFamilyUnavailable {
                        host: host.to_string(),
                        family,
                    }
                }
                None => ConnectError::NameResolution {
                    host: host.to_string(),
                    source: ResolveError::not_found(host, "no addresses returned"),
                },
            });
        };

        Ok(SocketAddr::new(ip, endpoint.port()))
    }

    async fn open(&self, addr: SocketAddr) -> Result<C::Stream> {
        let opened = match self.config.connect_timeout {
            Some(limit) => timeout(limit, self.connector.open(addr))
                .await
                .unwrap_or_else(|_| {
                    Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("connect timed out after {limit:?}"),
                    ))
                }),
            None => self.connector.open(addr).await,
        };

        opened.map_err(|source| {
            debug!(remote = %addr, error = %source, "Transport open failed");
            ConnectError::Transport { addr, source }
        })
    }

    async fn handshake(
        &self,
        stream: C::Stream,
        endpoint: &EndpointKey,
        offered: Option<&SessionRecord>,
    ) -> std::result::Result<Negotiated<C::Stream>, HandshakeFailure> {
        let fut = self.handshaker.handshake(stream, endpoint, offered);
        match self.config.handshake_timeout {
            Some(limit) => timeout(limit, fut)
                .await
                .unwrap_or_else(|_| Err(HandshakeFailure::timeout())),
            None => fut.await,
        }
    }

    /// Apply the success side effects: cache the fresh record, always.
    fn complete(
        &self,
        endpoint: &EndpointKey,
        addr: SocketAddr,
        negotiated: Negotiated<C::Stream>,
        session_offered: bool,
    ) -> Connection<C::Stream> {
        let Negotiated {
            stream,
            record,
            reused,
        } = negotiated;

        if reused && !session_offered {
            warn!("Handshaker reported a resumed session although none was offered");
        }
        let reused = reused && session_offered;
        let version = record.protocol_version();

        self.store.insert(endpoint.clone(), record);

        info!(remote = %addr, %version, reused, "Connection established");
        Connection::new(stream, endpoint.clone(), addr, version, reused)
    }

    /// Apply the failure side effects: evict only if the offered session is to blame.
    fn fail(
        &self,
        endpoint: &EndpointKey,
        failure: HandshakeFailure,
        session_offered: bool,
    ) -> ConnectError {
        let classification = classify(&ErrorSignal::new(failure.reason, session_offered));
        let evicted = classification.warrants_eviction() && self.store.evict(endpoint);

        warn!(
            reason = %failure.reason,
            detail = %failure.detail,
            ?classification,
            evicted,
            "Handshake failed"
        );

        ConnectError::Handshake {
            endpoint: endpoint.clone(),
            failure,
            classification,
            evicted,
        }
    }
}

impl<C, H> std::fmt::Debug for Dispatcher<C, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
