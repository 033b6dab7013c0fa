//! The pump engine: three cooperating tasks (reader, writer, monitor)
//! driving one transport, plus the public handle callers use to send
//! messages and observe the pump's lifecycle.

mod error_state;
mod monitor;
mod queue;
mod reader;
mod writer;

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::done::DoneSignal;
use crate::error::PumpError;
use crate::handler::Handler;
use crate::stats::Statistics;
use crate::transport::{StopNotifier, Transport};

pub use queue::DEFAULT_QUEUE_CAPACITY;

/// A caller-supplied panic logger, invoked with whatever
/// `std::panic::catch_unwind` caught. Replaces the default
/// `log::error!`-based logging when set.
pub type PanicLogHook = Arc<dyn Fn(&(dyn std::any::Any + Send)) + Send + Sync>;

/// Construction options for [`Pump::spawn`].
pub struct PumpOptions {
    /// Capacity of the write queue between `output`/`try_output` callers
    /// and the writer task.
    pub queue_capacity: usize,
    /// Overrides the default panic logging behavior.
    pub panic_log_hook: Option<PanicLogHook>,
    /// An object notified once the pump decides to stop, before the
    /// reader and writer tasks are guaranteed to have exited. Typically
    /// used to half-close a socket so a blocked read unblocks promptly.
    pub stop_notifier: Option<Arc<AsyncMutex<dyn StopNotifier>>>,
}

impl Default for PumpOptions {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            panic_log_hook: None,
            stop_notifier: None,
        }
    }
}

/// A running message pump: one reader task consuming a transport's inbound
/// side, one writer task consuming its outbound side, and one monitor task
/// coordinating their shutdown.
pub struct Pump {
    queue: queue::WriteQueue,
    cancel_token: CancellationToken,
    pump_done: DoneSignal,
    error_state: Arc<error_state::ErrorState>,
    stats: Arc<Statistics>,
    #[allow(dead_code)]
    reader_handle: JoinHandle<()>,
    #[allow(dead_code)]
    writer_handle: JoinHandle<()>,
    #[allow(dead_code)]
    monitor_handle: JoinHandle<()>,
}

impl Pump {
    /// Split `transport` and spawn the reader, writer, and monitor tasks,
    /// dispatching every inbound message to `handler`.
    pub fn spawn<T, H>(transport: T, handler: H) -> Self
    where
        T: Transport,
        H: Handler + 'static,
    {
        Self::spawn_with_options(transport, handler, PumpOptions::default())
    }

    pub fn spawn_with_options<T, H>(transport: T, handler: H, options: PumpOptions) -> Self
    where
        T: Transport,
        H: Handler + 'static,
    {
        let (reader_half, writer_half) = transport.split();
        let cancel_token = CancellationToken::new();
        let reader_done = DoneSignal::new();
        let writer_done = DoneSignal::new();
        let pump_done = DoneSignal::new();
        let error_state = Arc::new(error_state::ErrorState::new());
        let stats = Arc::new(Statistics::default());
        let handler = Arc::new(handler);

        let (queue, write_rx) = queue::WriteQueue::new(options.queue_capacity, cancel_token.clone());

        let reader_handle = reader::spawn_reader_task(
            reader_half,
            handler,
            cancel_token.clone(),
            error_state.clone(),
            stats.clone(),
            options.panic_log_hook.clone(),
            reader_done.clone(),
        );

        let writer_handle = writer::spawn_writer_task(
            writer_half,
            write_rx,
            cancel_token.clone(),
            error_state.clone(),
            stats.clone(),
            options.panic_log_hook.clone(),
            writer_done.clone(),
        );

        let monitor_handle = monitor::spawn_monitor_task(
            cancel_token.clone(),
            reader_done.clone(),
            writer_done.clone(),
            pump_done.clone(),
            options.stop_notifier.clone(),
        );

        Self {
            queue,
            cancel_token,
            pump_done,
            error_state,
            stats,
            reader_handle,
            writer_handle,
            monitor_handle,
        }
    }

    /// Enqueue a single message, waiting for queue capacity if necessary.
    /// Fails with [`PumpError::Canceled`] if `cancel` fires first, and
    /// with [`PumpError::Stopped`] if the pump has already stopped.
    pub async fn output(&self, cancel: &CancellationToken, msg: Bytes) -> Result<(), PumpError> {
        self.queue.output(cancel, msg.into()).await?;
        self.stats.record_output();
        Ok(())
    }

    /// Enqueue a single message only if the queue has room right now.
    /// Never blocks and never errors: `true` iff the queue had immediate
    /// capacity, `false` otherwise (queue full or pump already stopped).
    pub fn try_output(&self, msg: Bytes) -> bool {
        let accepted = self.queue.try_output(msg.into());
        if accepted {
            self.stats.record_output();
        }
        accepted
    }

    /// Enqueue a multipart message as a single logical write.
    pub async fn output_multipart(&self, cancel: &CancellationToken, parts: Vec<Bytes>) -> Result<(), PumpError> {
        self.queue.output(cancel, parts.into()).await?;
        self.stats.record_output();
        Ok(())
    }

    /// Non-blocking form of [`Pump::output_multipart`].
    pub fn try_output_multipart(&self, parts: Vec<Bytes>) -> bool {
        let accepted = self.queue.try_output(parts.into());
        if accepted {
            self.stats.record_output();
        }
        accepted
    }

    /// Request the pump to stop. Idempotent; safe to call more than once
    /// and from any task.
    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    /// True once `stop` has been called or the reader/writer hit a fatal
    /// condition on their own.
    pub fn stopped(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Resolves once the pump has fully stopped: both the reader and
    /// writer tasks have exited and the monitor has observed it.
    pub fn done_signal(&self) -> DoneSignal {
        self.pump_done.clone()
    }

    /// The combined fatal error, if any, per the `panic > reader > writer`
    /// tiebreak.
    pub fn error(&self) -> Option<PumpError> {
        self.error_state.combined()
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }
}

impl Drop for Pump {
    fn drop(&mut self) {
        // Safety net: if the caller never called `stop`, dropping the
        // handle must not leak the reader/writer/monitor tasks running
        // forever. This only cancels; it lets each task observe the
        // cancellation and exit on its own rather than aborting them
        // mid-write.
        self.cancel_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use crate::transport::duplex;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    struct EchoHandler {
        received: Arc<StdMutex<Vec<Bytes>>>,
        notify: Arc<tokio::sync::Notify>,
    }

    #[async_trait]
    impl Handler for EchoHandler {
        async fn handle(&self, _cancel: &CancellationToken, msg: Bytes) {
            self.received.lock().unwrap().push(msg);
            self.notify.notify_one();
        }
    }

    #[tokio::test]
    async fn output_reaches_the_peer_and_is_counted() {
        let (local, remote) = duplex::pair(4096);
        let received = Arc::new(StdMutex::new(Vec::new()));
        let notify = Arc::new(tokio::sync::Notify::new());
        let pump = Pump::spawn(
            local,
            EchoHandler {
                received: received.clone(),
                notify: notify.clone(),
            },
        );

        let cancel = CancellationToken::new();
        pump.output(&cancel, Bytes::from_static(b"hello")).await.unwrap();

        let (mut remote_reader, _remote_writer) = remote.split();
        use crate::transport::MessageReader;
        let got = tokio::time::timeout(Duration::from_millis(200), remote_reader.read_message())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, Bytes::from_static(b"hello"));
        assert_eq!(pump.statistics().output_count(), 1);
    }

    #[tokio::test]
    async fn stop_fully_quiesces_the_pump() {
        let (local, _remote) = duplex::pair(4096);
        let pump = Pump::spawn(
            local,
            EchoHandler {
                received: Arc::new(StdMutex::new(Vec::new())),
                notify: Arc::new(tokio::sync::Notify::new()),
            },
        );

        assert!(!pump.stopped());
        pump.stop();
        assert!(pump.stopped());

        tokio::time::timeout(Duration::from_millis(200), pump.done_signal().wait())
            .await
            .expect("pump should fully stop after stop()");
        assert!(pump.error().is_none());
    }

    #[tokio::test]
    async fn a_transport_read_error_surfaces_through_error_and_done_signal() {
        let (local, remote) = duplex::pair(4096);
        drop(remote);

        let pump = Pump::spawn(
            local,
            EchoHandler {
                received: Arc::new(StdMutex::new(Vec::new())),
                notify: Arc::new(tokio::sync::Notify::new()),
            },
        );

        tokio::time::timeout(Duration::from_millis(200), pump.done_signal().wait())
            .await
            .expect("pump should stop once the transport closes");
        assert!(pump.error().is_some());
    }
}
