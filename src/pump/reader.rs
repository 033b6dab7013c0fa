//! The reader task: pulls one message at a time off the transport and
//! dispatches it to the handler, in order, until the transport errors,
//! the handler panics, or the pump is told to stop.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::done::DoneSignal;
use crate::error::{PumpError, panic_message};
use crate::handler::Handler;
use crate::pump::PanicLogHook;
use crate::pump::error_state::ErrorState;
use crate::stats::Statistics;
use crate::transport::MessageReader;

#[allow(clippy::too_many_arguments)]
pub fn spawn_reader_task<R, H>(
    mut reader: R,
    handler: Arc<H>,
    cancel_token: CancellationToken,
    error_state: Arc<ErrorState>,
    stats: Arc<Statistics>,
    panic_hook: Option<PanicLogHook>,
    done: DoneSignal,
) -> JoinHandle<()>
where
    R: MessageReader + 'static,
    H: Handler + 'static,
{
    tokio::spawn(async move {
        let outcome = AssertUnwindSafe(reader_loop(
            &mut reader,
            handler.as_ref(),
            &cancel_token,
            &error_state,
            &stats,
        ))
        .catch_unwind()
        .await;

        if let Err(panic) = outcome {
            match &panic_hook {
                Some(hook) => hook(&*panic),
                None => log::error!(target: "msgpump::pump::reader", "reader task panicked: {}", panic_message(&*panic)),
            }
            error_state.set_panic(PumpError::UnknownPanic);
            cancel_token.cancel();
        }

        done.fire();
    })
}

async fn reader_loop<R, H>(
    reader: &mut R,
    handler: &H,
    cancel_token: &CancellationToken,
    error_state: &ErrorState,
    stats: &Statistics,
) where
    R: MessageReader,
    H: Handler + ?Sized,
{
    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log::debug!(target: "msgpump::pump::reader", "reader stopping: cancellation requested");
                return;
            }
            result = reader.read_message() => {
                match result {
                    Ok(msg) => {
                        stats.record_read(msg.len());
                        handler.handle(cancel_token, msg).await;
                    }
                    Err(err) => {
                        log::debug!(target: "msgpump::pump::reader", "reader stopping: {err}");
                        error_state.set_reader(PumpError::Transport(err));
                        cancel_token.cancel();
                        return;
                    }
                }
            }
        }
    }
}
