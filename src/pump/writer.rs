//! The writer task: the sole consumer of the write queue, writing entries
//! to the transport one at a time and in order.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::done::DoneSignal;
use crate::error::{PumpError, panic_message};
use crate::message::OutboundEntry;
use crate::pump::PanicLogHook;
use crate::pump::error_state::ErrorState;
use crate::stats::Statistics;
use crate::transport::MessageWriter;

#[allow(clippy::too_many_arguments)]
pub fn spawn_writer_task<W>(
    mut writer: W,
    mut rx: mpsc::Receiver<OutboundEntry>,
    cancel_token: CancellationToken,
    error_state: Arc<ErrorState>,
    stats: Arc<Statistics>,
    panic_hook: Option<PanicLogHook>,
    done: DoneSignal,
) -> JoinHandle<()>
where
    W: MessageWriter + 'static,
{
    tokio::spawn(async move {
        let outcome = AssertUnwindSafe(writer_loop(&mut writer, &mut rx, &cancel_token, &error_state, &stats))
            .catch_unwind()
            .await;

        if let Err(panic) = outcome {
            match &panic_hook {
                Some(hook) => hook(&*panic),
                None => log::error!(target: "msgpump::pump::writer", "writer task panicked: {}", panic_message(&*panic)),
            }
            error_state.set_panic(PumpError::UnknownPanic);
            cancel_token.cancel();
        }

        done.fire();
    })
}

async fn writer_loop<W>(
    writer: &mut W,
    rx: &mut mpsc::Receiver<OutboundEntry>,
    cancel_token: &CancellationToken,
    error_state: &ErrorState,
    stats: &Statistics,
) where
    W: MessageWriter,
{
    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log::debug!(target: "msgpump::pump::writer", "writer stopping: cancellation requested");
                return;
            }
            entry = rx.recv() => {
                let Some(entry) = entry else {
                    log::debug!(target: "msgpump::pump::writer", "writer stopping: queue closed");
                    return;
                };

                let result = match &entry {
                    OutboundEntry::Single(bytes) => writer.write_message(bytes).await,
                    OutboundEntry::Multipart(parts) => writer.write_message_multipart(parts).await,
                };

                match result {
                    Ok(()) => stats.record_write(entry.byte_len()),
                    Err(err) => {
                        log::debug!(target: "msgpump::pump::writer", "writer stopping: {err}");
                        error_state.set_writer(PumpError::Transport(err));
                        cancel_token.cancel();
                        return;
                    }
                }
            }
        }
    }
}
