//! End-to-end session reuse, eviction and family pinning behavior.
//!
//! These tests drive the dispatcher against simulated peers on a
//! [`MockNetwork`], so they need no sockets or certificates.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use resumer_connect::mock::MockPeer;
use resumer_connect::{
    AddressFamily, Classification, ConnectError, ConnectOptions, EndpointKey, FailureReason,
    HandshakeFailure, ProtocolVersion, SessionStore, StoreConfig,
};

use common::{Harness, PORT, endpoint, v4, v6};

fn modern(name: &str) -> MockPeer {
    MockPeer::new(name, [ProtocolVersion::Tls12, ProtocolVersion::Tls11])
}

fn legacy_locked(name: &str) -> MockPeer {
    MockPeer::new(name, [ProtocolVersion::Tls10]).with_legacy_version_lock()
}

#[tokio::test]
async fn full_handshake_then_resumption() {
    let h = Harness::new(&[v4()]);
    let peer = h.serve(v4(), modern("server"));

    let first = h.dispatcher.connect(&endpoint(), ConnectOptions::new()).await.unwrap();
    assert!(!first.is_session_reused());
    assert!(h.store().has_entry(&endpoint()));

    let cached = h.store().peek(&endpoint()).unwrap();
    let second = h.dispatcher.connect(&endpoint(), ConnectOptions::new()).await.unwrap();

    assert_eq!(h.net.last_offer(), Some(cached));
    assert!(second.is_session_reused());
    assert_eq!(peer.resumptions(), 1);
    assert!(h.store().has_entry(&endpoint()));
}

#[tokio::test]
async fn incompatible_session_is_evicted_then_full_handshake_succeeds() {
    let h = Harness::new(&[v4()]);
    h.serve(v4(), modern("v12"));
    h.dispatcher.connect(&endpoint(), ConnectOptions::new()).await.unwrap();
    assert_eq!(
        h.store().peek(&endpoint()).map(|s| s.protocol_version()),
        Some(ProtocolVersion::Tls12)
    );

    // Same endpoint, now served by a TLS 1.0 only peer that trips over the offer
    h.serve(v4(), legacy_locked("v10"));

    let err = h
        .dispatcher
        .connect(&endpoint(), ConnectOptions::new())
        .await
        .expect_err("offering the 1.2 session must fail against the locked peer");

    match &err {
        ConnectError::Handshake {
            failure,
            classification,
            evicted,
            ..
        } => {
            assert_eq!(failure.reason, FailureReason::VersionMismatch);
            assert_eq!(*classification, Classification::SessionIncompatible);
            assert!(*evicted);
        }
        other => panic!("expected handshake error, got {other:?}"),
    }
    assert!(!h.store().has_entry(&endpoint()));

    // Caller-driven retry: nothing offered, full handshake, no reuse
    let conn = h.dispatcher.connect(&endpoint(), ConnectOptions::new()).await.unwrap();
    assert_eq!(h.net.last_offer(), None);
    assert!(!conn.is_session_reused());
    assert_eq!(conn.protocol_version(), ProtocolVersion::Tls10);
    assert!(h.store().has_entry(&endpoint()));
}

#[tokio::test]
async fn eviction_does_not_hide_the_failure() {
    let h = Harness::new(&[v4()]);
    h.serve(v4(), modern("v12"));
    h.dispatcher.connect(&endpoint(), ConnectOptions::new()).await.unwrap();
    let legacy = h.serve(v4(), legacy_locked("v10"));

    let result = h.dispatcher.connect(&endpoint(), ConnectOptions::new()).await;

    assert!(result.is_err());
    assert!(result.unwrap_err().evicted_session());
    // Exactly one handshake: no transparent retry
    assert_eq!(legacy.handshakes(), 1);
    assert_eq!(h.net.offers().len(), 2);
}

#[tokio::test]
async fn no_false_reuse_against_a_different_peer() {
    let h = Harness::new(&[v4()]);
    h.serve(v4(), modern("first"));
    h.dispatcher.connect(&endpoint(), ConnectOptions::new()).await.unwrap();

    // A modern TLS 1.0 peer ignores the foreign session and negotiates afresh
    let fallback = h.serve(v4(), MockPeer::new("second", [ProtocolVersion::Tls10]));
    let conn = h.dispatcher.connect(&endpoint(), ConnectOptions::new()).await.unwrap();
    assert!(h.net.last_offer().is_some());
    assert!(!conn.is_session_reused());
    assert_eq!(fallback.resumptions(), 0);

    // A version-locked peer rejects it outright; no connection claims reuse
    h.serve(v4(), modern("third"));
    h.dispatcher.connect(&endpoint(), ConnectOptions::new()).await.unwrap();
    h.serve(v4(), legacy_locked("fourth"));
    let err = h.dispatcher.connect(&endpoint(), ConnectOptions::new()).await.unwrap_err();
    assert!(err.is_session_incompatible());
}

#[tokio::test]
async fn transport_error_keeps_cached_session() {
    let h = Harness::new(&[v4()]);
    h.serve(v4(), modern("server"));
    h.dispatcher.connect(&endpoint(), ConnectOptions::new()).await.unwrap();
    let cached = h.store().peek(&endpoint());

    h.net.shutdown(SocketAddr::new(v4(), PORT));

    let err = h.dispatcher.connect(&endpoint(), ConnectOptions::new()).await.unwrap_err();
    match err {
        ConnectError::Transport { addr, source } => {
            assert_eq!(addr, SocketAddr::new(v4(), PORT));
            assert_eq!(source.kind(), std::io::ErrorKind::ConnectionRefused);
        }
        other => panic!("expected transport error, got {other:?}"),
    }
    assert_eq!(h.store().peek(&endpoint()), cached);
}

#[tokio::test]
async fn unrelated_handshake_errors_keep_cached_session() {
    let h = Harness::new(&[v4()]);
    let peer = h.serve(v4(), modern("server"));
    h.dispatcher.connect(&endpoint(), ConnectOptions::new()).await.unwrap();

    let failures = [
        HandshakeFailure::from_library_message("certificate verify failed"),
        HandshakeFailure::new(FailureReason::Alert(40), "handshake failure"),
        HandshakeFailure::new(FailureReason::ConnectionClosed, "socket hang up"),
    ];

    for failure in failures {
        peer.set_failure(Some(failure.clone()));
        let err = h.dispatcher.connect(&endpoint(), ConnectOptions::new()).await.unwrap_err();
        assert!(!err.is_session_incompatible(), "{failure}");
        assert!(!err.evicted_session());
        assert!(h.store().has_entry(&endpoint()));
    }
}

#[tokio::test]
async fn version_mismatch_without_offer_is_unrelated() {
    let h = Harness::new(&[v4()]);
    h.serve(
        v4(),
        MockPeer::new("strict", [ProtocolVersion::Tls13])
            .failing_with(FailureReason::VersionMismatch, "unsupported protocol"),
    );

    let err = h.dispatcher.connect(&endpoint(), ConnectOptions::new()).await.unwrap_err();
    assert_eq!(err.handshake_reason(), Some(FailureReason::VersionMismatch));
    assert!(!err.is_session_incompatible());
    assert!(!err.evicted_session());
}

#[tokio::test]
async fn ipv6_pin_against_ipv4_only_host_fails() {
    let h = Harness::new(&[v4()]);
    h.serve(v4(), modern("v4-only"));

    let err = h
        .dispatcher
        .connect(&endpoint(), ConnectOptions::new().with_family(AddressFamily::V6))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ConnectError::AddressFamilyUnavailable {
            family: AddressFamily::V6,
            ..
        }
    ));
    assert!(h.net.opened().is_empty(), "must never connect over IPv4");
    assert!(!h.store().has_entry(&endpoint()));
}

#[tokio::test]
async fn ipv6_pin_connects_to_loopback_v6() {
    let h = Harness::new(&[v4(), v6()]);
    h.serve(v4(), modern("v4"));
    h.serve(v6(), modern("v6"));

    let conn = h
        .dispatcher
        .connect(&endpoint(), ConnectOptions::new().with_family_number(6).unwrap())
        .await
        .unwrap();

    assert_eq!(conn.remote_addr().ip(), v6());
    assert_eq!(conn.remote_addr().to_string(), "[::1]:44330");
    assert_eq!(conn.stream().peer_addr(), SocketAddr::new(v6(), PORT));
    assert_eq!(h.net.opened(), vec![SocketAddr::new(v6(), PORT)]);
}

#[tokio::test]
async fn eviction_is_scoped_to_one_endpoint() {
    let h = Harness::new(&[v4()]);
    let other = EndpointKey::new(common::HOST, PORT + 1);
    h.serve(v4(), modern("a"));
    h.net.listen(SocketAddr::new(v4(), PORT + 1), modern("b"));

    h.dispatcher.connect(&endpoint(), ConnectOptions::new()).await.unwrap();
    h.dispatcher.connect(&other, ConnectOptions::new()).await.unwrap();

    h.serve(v4(), legacy_locked("a-legacy"));
    let err = h.dispatcher.connect(&endpoint(), ConnectOptions::new()).await.unwrap_err();
    assert!(err.evicted_session());

    assert!(!h.store().has_entry(&endpoint()));
    assert!(h.store().has_entry(&other));
}

#[tokio::test]
async fn host_case_does_not_split_the_cache() {
    let h = Harness::new(&[v4()]);
    h.serve(v4(), modern("server"));

    h.dispatcher
        .connect_to("LOCALHOST", PORT, ConnectOptions::new())
        .await
        .unwrap();
    let conn = h
        .dispatcher
        .connect_to("localhost", PORT, ConnectOptions::new())
        .await
        .unwrap();

    assert!(conn.is_session_reused());
    assert_eq!(h.store().len(), 1);
}

#[tokio::test]
async fn disabled_store_never_offers() {
    let store = SessionStore::new(StoreConfig::new().with_enabled(false));
    let h = Harness::with_store(&[v4()], store);
    h.serve(v4(), modern("server"));

    for _ in 0..3 {
        let conn = h.dispatcher.connect(&endpoint(), ConnectOptions::new()).await.unwrap();
        assert!(!conn.is_session_reused());
    }
    assert!(h.net.offers().iter().all(Option::is_none));
}

#[tokio::test]
async fn concurrent_connects_share_one_store() {
    let h = Arc::new(Harness::new(&[v4()]));
    h.serve(v4(), modern("server"));
    for port in PORT + 1..PORT + 4 {
        h.net.listen(SocketAddr::new(v4(), port), modern("aux"));
    }

    let tasks: Vec<_> = (0..32u16)
        .map(|i| {
            let h = Arc::clone(&h);
            tokio::spawn(async move {
                let key = EndpointKey::new(common::HOST, PORT + i % 4);
                h.dispatcher.connect(&key, ConnectOptions::new()).await
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(h.store().len(), 4);
    for i in 0..4 {
        assert!(h.store().has_entry(&EndpointKey::new(common::HOST, PORT + i)));
    }
}
