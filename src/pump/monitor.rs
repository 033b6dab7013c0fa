//! The monitor task: the third cooperating task, with no direct I/O of
//! its own. It waits for a stop decision — either an external `stop()`
//! call or a fatal condition the reader or writer task reported by
//! cancelling the shared token — notifies the transport's
//! [`StopNotifier`] (so a blocked read can unblock), waits for both the
//! reader and writer to actually finish, and only then declares the pump
//! done.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::done::DoneSignal;
use crate::transport::StopNotifier;

pub fn spawn_monitor_task(
    cancel_token: CancellationToken,
    reader_done: DoneSignal,
    writer_done: DoneSignal,
    pump_done: DoneSignal,
    stop_notifier: Option<Arc<tokio::sync::Mutex<dyn StopNotifier>>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        cancel_token.cancelled().await;
        log::debug!(target: "msgpump::pump::monitor", "stop decided, notifying transport");

        if let Some(notifier) = stop_notifier {
            notifier.lock().await.on_stop().await;
        }

        reader_done.wait().await;
        writer_done.wait().await;

        log::debug!(target: "msgpump::pump::monitor", "reader and writer both finished, pump done");
        pump_done.fire();
    })
}
