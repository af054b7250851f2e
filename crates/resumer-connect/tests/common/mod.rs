//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Once};

use resumer_connect::mock::{MockNetwork, MockPeer};
use resumer_connect::{Dispatcher, EndpointKey, SessionStore, StaticResolver, StoreConfig};

pub const HOST: &str = "localhost";
pub const PORT: u16 = 44330;

static TRACING: Once = Once::new();

/// Install a test-writer subscriber once per test binary.
///
/// Set `RUST_LOG=resumer_connect=debug` to see dispatcher decisions.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn v4() -> IpAddr {
    "127.0.0.1".parse().unwrap()
}

pub fn v6() -> IpAddr {
    "::1".parse().unwrap()
}

pub fn endpoint() -> EndpointKey {
    EndpointKey::new(HOST, PORT)
}

/// A dispatcher over a fresh store and mock network, resolving [`HOST`] to `addrs`.
pub struct Harness {
    pub dispatcher: Dispatcher<MockNetwork, MockNetwork>,
    pub net: MockNetwork,
}

impl Harness {
    pub fn new(addrs: &[IpAddr]) -> Self {
        Self::with_store(addrs, SessionStore::new(StoreConfig::default()))
    }

    pub fn with_store(addrs: &[IpAddr], store: SessionStore) -> Self {
        init_tracing();
        let net = MockNetwork::new();
        let resolver = StaticResolver::new().with_host(HOST, addrs.iter().copied());
        let dispatcher = Dispatcher::new(store, Arc::new(resolver), net.clone(), net.clone());
        Self { dispatcher, net }
    }

    /// Start `peer` on `ip:PORT`, replacing any previous peer there.
    pub fn serve(&self, ip: IpAddr, peer: MockPeer) -> MockPeer {
        self.net.listen(SocketAddr::new(ip, PORT), peer.clone());
        peer
    }

    pub fn store(&self) -> &SessionStore {
        self.dispatcher.store()
    }
}
