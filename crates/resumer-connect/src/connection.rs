//! An established, secured connection.

use std::net::SocketAddr;

use resumer_session::{EndpointKey, ProtocolVersion};

/// A connection returned by [`Dispatcher::connect`](crate::Dispatcher::connect).
#[derive(Debug)]
pub struct Connection<S> {
    stream: S,
    endpoint: EndpointKey,
    remote_addr: SocketAddr,
    protocol_version: ProtocolVersion,
    session_reused: bool,
}

impl<S> Connection<S> {
    pub(crate) fn new(
        stream: S,
        endpoint: EndpointKey,
        remote_addr: SocketAddr,
        protocol_version: ProtocolVersion,
        session_reused: bool,
    ) -> Self {
        Self {
            stream,
            endpoint,
            remote_addr,
            protocol_version,
            session_reused,
        }
    }

    /// Whether the handshake resumed a cached session.
    pub fn is_session_reused(&self) -> bool {
        self.session_reused
    }

    /// The address actually connected to.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn endpoint(&self) -> &EndpointKey {
        &self.endpoint
    }

    pub fn protocol_version(&self) -> ProtocolVersion {
        self.protocol_version
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_stream(self) -> S {
        self.stream
    }
}
