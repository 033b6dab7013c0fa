//! The worker-handler decorator: wraps a [`Handler`] so that slow or
//! concurrent message processing never blocks the reader task.
//!
//! `handle` first drops the message silently if the incoming cancellation
//! has already fired — no point spawning a helper to process something
//! the pump is already shutting down over. Otherwise it hands the message
//! to an elastic pool of helper tasks through a zero-capacity (rendezvous)
//! channel: a non-blocking send succeeds only when a helper is already
//! parked on `recv`, exactly the way an unbuffered Go channel's
//! non-blocking send only succeeds when a goroutine is parked on the
//! other end. When no helper is parked, a new one is spawned to take the
//! message directly. Idle helpers tear themselves down after
//! `idle_timeout` with nothing new to do.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use flume::TrySendError;
use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::error::panic_message;
use crate::handler::Handler;

/// Default idle timeout before a helper task exits.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// One entry handed from `handle` to a helper task: the message plus the
/// cancellation observed at dispatch time, so a helper that picks it up
/// later still knows which shutdown token the underlying handler belongs
/// to.
type Entry = (CancellationToken, Bytes);

pub struct ParallelHandler<H> {
    inner: Arc<H>,
    tx: flume::Sender<Entry>,
    rx: flume::Receiver<Entry>,
    idle_timeout: Duration,
}

impl<H> ParallelHandler<H>
where
    H: Handler + 'static,
{
    pub fn new(inner: H) -> Self {
        Self::with_idle_timeout(inner, DEFAULT_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(inner: H, idle_timeout: Duration) -> Self {
        let (tx, rx) = flume::bounded(0);
        Self {
            inner: Arc::new(inner),
            tx,
            rx,
            idle_timeout,
        }
    }
}

#[async_trait]
impl<H> Handler for ParallelHandler<H>
where
    H: Handler + 'static,
{
    async fn handle(&self, cancel: &CancellationToken, msg: Bytes) {
        if cancel.is_cancelled() {
            log::debug!(target: "msgpump::worker", "dropping message: pump already stopping");
            return;
        }

        match self.tx.try_send((cancel.clone(), msg)) {
            Ok(()) => {}
            Err(TrySendError::Full((cancel, msg))) | Err(TrySendError::Disconnected((cancel, msg))) => {
                spawn_helper(self.inner.clone(), self.rx.clone(), self.idle_timeout, cancel, msg);
            }
        }
    }
}

fn spawn_helper<H>(
    inner: Arc<H>,
    rx: flume::Receiver<Entry>,
    idle_timeout: Duration,
    first_cancel: CancellationToken,
    first_msg: Bytes,
) where
    H: Handler + 'static,
{
    tokio::spawn(async move {
        let mut cancel = first_cancel;
        let mut msg = first_msg;
        loop {
            run_contained(inner.as_ref(), &cancel, msg).await;

            (cancel, msg) = match tokio::time::timeout(idle_timeout, rx.recv_async()).await {
                Ok(Ok(next)) => next,
                Ok(Err(_)) => return, // dispatcher dropped, pool torn down
                Err(_) => return,     // idle timeout, nothing new to do
            };
        }
    });
}

/// Runs one handler invocation, catching a panic so it tears down only
/// this helper task rather than the whole pump.
async fn run_contained<H: Handler + ?Sized>(handler: &H, cancel: &CancellationToken, msg: Bytes) {
    let result = AssertUnwindSafe(handler.handle(cancel, msg)).catch_unwind().await;
    if let Err(panic) = result {
        log::error!(target: "msgpump::worker", "handler panicked: {}", panic_message(&*panic));
    }
}
