//! A synchronous request/response layer on top of the pump: `do_request`
//! sends a message and awaits the matching reply, `notify` sends one with
//! no reply expected, and incoming requests from the far side are routed
//! to a [`PeerHandler`] that produces the reply body.

mod response_table;
mod wire;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::done::DoneSignal;
use crate::error::{PeerError, PumpError};
use crate::handler::Handler;
use crate::pump::{Pump, PumpOptions};
use crate::stats::Statistics;
use crate::transport::Transport;
use response_table::ResponseTable;

/// Handles messages the far side of a [`Peer`] initiated: a request it
/// expects a reply to, or a fire-and-forget notification.
#[async_trait]
pub trait PeerHandler: Send + Sync {
    async fn handle_request(&self, body: Bytes) -> Bytes;
    async fn handle_notify(&self, body: Bytes);
}

pub struct Peer {
    pump: Arc<Pump>,
    response_table: Arc<ResponseTable>,
    next_id: AtomicU64,
}

impl Peer {
    pub fn new<T, H>(transport: T, peer_handler: H) -> Arc<Peer>
    where
        T: Transport,
        H: PeerHandler + 'static,
    {
        Self::with_options(transport, peer_handler, PumpOptions::default())
    }

    pub fn with_options<T, H>(transport: T, peer_handler: H, options: PumpOptions) -> Arc<Peer>
    where
        T: Transport,
        H: PeerHandler + 'static,
    {
        let response_table = Arc::new(ResponseTable::new());

        let pump = Arc::new_cyclic(|weak_pump: &Weak<Pump>| {
            let dispatcher = Dispatcher {
                pump: weak_pump.clone(),
                response_table: response_table.clone(),
                peer_handler: Arc::new(peer_handler),
            };
            Pump::spawn_with_options(transport, dispatcher, options)
        });

        let peer = Arc::new(Peer {
            pump: pump.clone(),
            response_table: response_table.clone(),
            next_id: AtomicU64::new(0),
        });

        // Release any caller still blocked in `do_request` once the pump
        // stops instead of leaving it waiting on a reply that can no
        // longer arrive.
        tokio::spawn(async move {
            pump.done_signal().wait().await;
            response_table.fail_all();
        });

        peer
    }

    fn next_request_id(&self) -> String {
        // Increment first, then format: the first id issued is 1, not 0.
        format!("{:x}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Send `body` as a request and wait for the matching reply, or for
    /// `cancel` to fire, or for the pump to stop first.
    pub async fn do_request(&self, cancel: &CancellationToken, body: Bytes) -> Result<Bytes, PeerError> {
        let id = self.next_request_id();
        let (tx, rx) = oneshot::channel();
        self.response_table.register(id.clone(), tx)?;

        let header = wire::encode_request_header(&id);
        if let Err(err) = self.pump.output_multipart(cancel, vec![header, body]).await {
            self.response_table.remove(&id);
            return Err(err.into());
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.response_table.remove(&id);
                Err(PeerError::Canceled)
            }
            result = rx => result.map_err(|_| PeerError::Stopped),
        }
    }

    /// Send `body` as a notification; there is no reply to wait for.
    pub async fn notify(&self, cancel: &CancellationToken, body: Bytes) -> Result<(), PeerError> {
        let header = wire::encode_notify_header();
        self.pump
            .output_multipart(cancel, vec![header, body])
            .await
            .map_err(PeerError::from)
    }

    pub fn stop(&self) {
        self.pump.stop();
    }

    pub fn stopped(&self) -> bool {
        self.pump.stopped()
    }

    pub fn done_signal(&self) -> DoneSignal {
        self.pump.done_signal()
    }

    pub fn error(&self) -> Option<PumpError> {
        self.pump.error()
    }

    pub fn statistics(&self) -> &Statistics {
        self.pump.statistics()
    }
}

struct Dispatcher<H> {
    pump: Weak<Pump>,
    response_table: Arc<ResponseTable>,
    peer_handler: Arc<H>,
}

#[async_trait]
impl<H> Handler for Dispatcher<H>
where
    H: PeerHandler + 'static,
{
    async fn handle(&self, _cancel: &CancellationToken, msg: Bytes) {
        match wire::parse(&msg) {
            Ok((wire::Header::Response(id), body)) => {
                if !self.response_table.route(&id, body) {
                    log::debug!(target: "msgpump::peer", "response for unknown or already-resolved request id {id}");
                }
            }
            Ok((wire::Header::Request(id), body)) => {
                let reply = self.peer_handler.handle_request(body).await;
                let Some(pump) = self.pump.upgrade() else {
                    return;
                };
                let header = wire::encode_response_header(&id);
                if !pump.try_output_multipart(vec![header, reply]) {
                    log::warn!(target: "msgpump::peer", "dropping reply to request {id}: queue full or pump stopped");
                }
            }
            Ok((wire::Header::Notify, body)) => {
                self.peer_handler.handle_notify(body).await;
            }
            Err(err) => {
                log::warn!(target: "msgpump::peer", "malformed peer message: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::duplex;
    use std::time::Duration;

    struct EchoPeerHandler;

    #[async_trait]
    impl PeerHandler for EchoPeerHandler {
        async fn handle_request(&self, body: Bytes) -> Bytes {
            body
        }

        async fn handle_notify(&self, _body: Bytes) {}
    }

    #[tokio::test]
    async fn do_request_round_trips_through_an_echoing_peer() {
        let (a, b) = duplex::pair(4096);
        let _peer_a = Peer::new(a, EchoPeerHandler);
        let peer_b = Peer::new(b, EchoPeerHandler);

        let cancel = CancellationToken::new();
        let reply = tokio::time::timeout(
            Duration::from_millis(200),
            peer_b.do_request(&cancel, Bytes::from_static(b"ping")),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(reply, Bytes::from_static(b"ping"));
    }

    struct RecordingNotifyHandler {
        received: Arc<std::sync::Mutex<Vec<Bytes>>>,
        notify: Arc<tokio::sync::Notify>,
    }

    #[async_trait]
    impl PeerHandler for RecordingNotifyHandler {
        async fn handle_request(&self, body: Bytes) -> Bytes {
            body
        }

        async fn handle_notify(&self, body: Bytes) {
            self.received.lock().unwrap().push(body);
            self.notify.notify_one();
        }
    }

    #[tokio::test]
    async fn notify_delivers_with_no_reply_expected() {
        let (a, b) = duplex::pair(4096);
        let received = Arc::new(std::sync::Mutex::new(Vec::new()));
        let notified = Arc::new(tokio::sync::Notify::new());
        let _peer_a = Peer::new(
            a,
            RecordingNotifyHandler {
                received: received.clone(),
                notify: notified.clone(),
            },
        );
        let peer_b = Peer::new(b, EchoPeerHandler);

        let cancel = CancellationToken::new();
        peer_b.notify(&cancel, Bytes::from_static(b"fyi")).await.unwrap();

        tokio::time::timeout(Duration::from_millis(200), notified.notified())
            .await
            .unwrap();
        assert_eq!(received.lock().unwrap().as_slice(), [Bytes::from_static(b"fyi")]);
    }

    #[tokio::test]
    async fn do_request_fails_once_the_pump_stops_mid_request() {
        let (a, _b) = duplex::pair(4096);
        let peer = Peer::new(a, EchoPeerHandler);

        peer.stop();

        let cancel = CancellationToken::new();
        let err = tokio::time::timeout(
            Duration::from_millis(200),
            peer.do_request(&cancel, Bytes::from_static(b"ping")),
        )
        .await
        .unwrap()
        .unwrap_err();

        assert!(matches!(err, PeerError::Stopped | PeerError::Pump(_)));
    }

    #[tokio::test]
    async fn do_request_is_canceled_by_the_callers_token() {
        let (a, _b) = duplex::pair(4096);
        let peer = Peer::new(a, EchoPeerHandler);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = peer.do_request(&cancel, Bytes::from_static(b"ping")).await.unwrap_err();
        assert!(matches!(err, PeerError::Canceled | PeerError::Pump(_)));
    }

    #[tokio::test]
    async fn request_ids_are_strictly_increasing_hex_starting_at_one() {
        let (a, _b) = duplex::pair(4096);
        let peer = Peer::new(a, EchoPeerHandler);

        let ids: Vec<String> = (0..20).map(|_| peer.next_request_id()).collect();
        let expected: Vec<String> = (1..=20u64).map(|n| format!("{n:x}")).collect();
        assert_eq!(ids, expected);
    }
}
