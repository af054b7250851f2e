//! In-memory collaborators for driving the dispatcher without a network.
//!
//! [`MockNetwork`] acts as both the [`Connector`] and the [`Handshaker`]:
//! addresses with a [`MockPeer`] listening accept connections, everything
//! else is refused. Peers issue tickets on full handshakes and resume
//! sessions they issued, under versions they still support.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use resumer_session::{EndpointKey, ProtocolVersion, SessionRecord};

use crate::handshake::{FailureReason, HandshakeFailure, Handshaker, Negotiated};
use crate::transport::Connector;

/// Stream handed out by [`MockNetwork`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockStream {
    peer: SocketAddr,
    id: u64,
}

impl MockStream {
    /// Address of the peer this stream is connected to.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Sequence number of the connection on the network.
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug)]
struct PeerState {
    name: String,
    versions: Vec<ProtocolVersion>,
    issue_tickets: bool,
    legacy_version_lock: bool,
    failure: Option<HandshakeFailure>,
    delay: Option<Duration>,
    issued: Vec<Vec<u8>>,
    handshakes: usize,
    resumptions: usize,
}

/// A simulated TLS server instance.
///
/// Clones share state, so a test can keep a handle to inspect a peer after
/// placing it on a [`MockNetwork`].
#[derive(Debug, Clone)]
pub struct MockPeer {
    state: Arc<Mutex<PeerState>>,
}

impl MockPeer {
    /// A peer speaking the given protocol versions.
    pub fn new(name: impl Into<String>, versions: impl IntoIterator<Item = ProtocolVersion>) -> Self {
        Self {
            state: Arc::new(Mutex::new(PeerState {
                name: name.into(),
                versions: versions.into_iter().collect(),
                issue_tickets: true,
                legacy_version_lock: false,
                failure: None,
                delay: None,
                issued: Vec::new(),
                handshakes: 0,
                resumptions: 0,
            })),
        }
    }

    /// Reject an offered session whose version this peer does not speak
    /// with a version mismatch, instead of falling back to a full handshake.
    ///
    /// Older TLS stacks locked the client hello to the offered session's
    /// version, which such a peer sees as a wrong version number.
    pub fn with_legacy_version_lock(self) -> Self {
        self.state.lock().legacy_version_lock = true;
        self
    }

    /// Never resume; every handshake is full.
    pub fn without_tickets(self) -> Self {
        self.state.lock().issue_tickets = false;
        self
    }

    /// Fail every handshake with `reason`.
    pub fn failing_with(self, reason: FailureReason, detail: impl Into<String>) -> Self {
        self.set_failure(Some(HandshakeFailure::new(reason, detail)));
        self
    }

    /// Sleep before answering each handshake.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.state.lock().delay = Some(delay);
        self
    }

    /// Change the injected failure on a live peer.
    pub fn set_failure(&self, failure: Option<HandshakeFailure>) {
        self.state.lock().failure = failure;
    }

    pub fn name(&self) -> String {
        self.state.lock().name.clone()
    }

    /// Handshakes attempted against this peer.
    pub fn handshakes(&self) -> usize {
        self.state.lock().handshakes
    }

    /// Handshakes that resumed a session.
    pub fn resumptions(&self) -> usize {
        self.state.lock().resumptions
    }

    fn delay(&self) -> Option<Duration> {
        self.state.lock().delay
    }

    fn negotiate(&self, offered: Option<&SessionRecord>) -> Result<(SessionRecord, bool), HandshakeFailure> {
        let mut state = self.state.lock();
        state.handshakes += 1;

        if let Some(failure) = &state.failure {
            return Err(failure.clone());
        }

        if let Some(session) = offered {
            let supported = state.versions.contains(&session.protocol_version());
            if !supported && state.legacy_version_lock {
                return Err(HandshakeFailure::new(
                    FailureReason::VersionMismatch,
                    "wrong version number",
                ));
            }
            let known = state.issued.iter().any(|t| t.as_slice() == session.ticket());
            if supported && known {
                state.resumptions += 1;
                let resumed = SessionRecord::new(session.ticket().to_vec(), session.protocol_version());
                return Ok((resumed, true));
            }
        }

        let version = state.versions.iter().max().copied().ok_or_else(|| {
            HandshakeFailure::new(FailureReason::VersionMismatch, "no protocol versions enabled")
        })?;

        let ticket = format!("{}-{}", state.name, state.handshakes).into_bytes();
        if state.issue_tickets {
            state.issued.push(ticket.clone());
        }

        Ok((SessionRecord::new(ticket, version), false))
    }
}

#[derive(Debug, Default)]
struct NetworkState {
    peers: HashMap<SocketAddr, MockPeer>,
    opened: Vec<SocketAddr>,
    offers: Vec<Option<SessionRecord>>,
    next_id: u64,
}

/// A simulated network of TLS peers.
#[derive(Debug, Clone, Default)]
pub struct MockNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `peer` listening on `addr`, replacing whatever was there.
    pub fn listen(&self, addr: SocketAddr, peer: MockPeer) {
        self.state.lock().peers.insert(addr, peer);
    }

    /// Stop listening on `addr`; later connections are refused.
    pub fn shutdown(&self, addr: SocketAddr) -> Option<MockPeer> {
        self.state.lock().peers.remove(&addr)
    }

    /// Addresses connected to, in order.
    pub fn opened(&self) -> Vec<SocketAddr> {
        self.state.lock().opened.clone()
    }

    /// Sessions offered to each handshake, in order.
    pub fn offers(&self) -> Vec<Option<SessionRecord>> {
        self.state.lock().offers.clone()
    }

    /// The session offered to the most recent handshake.
    pub fn last_offer(&self) -> Option<SessionRecord> {
        self.state.lock().offers.last().cloned().flatten()
    }
}

#[async_trait]
impl Connector for MockNetwork {
    type Stream = MockStream;

    async fn open(&self, addr: SocketAddr) -> io::Result<MockStream> {
        let mut state = self.state.lock();
        if !state.peers.contains_key(&addr) {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("nothing listening on {addr}"),
            ));
        }
        state.opened.push(addr);
        state.next_id += 1;
        Ok(MockStream {
            peer: addr,
            id: state.next_id,
        })
    }
}

#[async_trait]
impl Handshaker<MockStream> for MockNetwork {
    async fn handshake(
        &self,
        stream: MockStream,
        _endpoint: &EndpointKey,
        offered: Option<&SessionRecord>,
    ) -> Result<Negotiated<MockStream>, HandshakeFailure> {
        let peer = {
            let mut state = self.state.lock();
            state.offers.push(offered.cloned());
            state.peers.get(&stream.peer).cloned()
        };

        let peer = peer.ok_or_else(|| {
            HandshakeFailure::new(FailureReason::ConnectionClosed, "peer went away")
        })?;

        if let Some(delay) = peer.delay() {
            tokio::time::sleep(delay).await;
        }

        let (record, reused) = peer.negotiate(offered)?;
        Ok(Negotiated {
            stream,
            record,
            reused,
        })
    }
}
