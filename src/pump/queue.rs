//! The write queue: the single handoff point between message producers
//! (`output`/`try_output` callers) and the writer task.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::PumpError;
use crate::message::OutboundEntry;

/// Matches the teacher's outbound-queue sizing: deep enough to absorb a
/// burst without every caller blocking on the writer's pace, shallow
/// enough that a genuinely stuck writer makes `try_output` fail fast.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct WriteQueue {
    tx: mpsc::Sender<OutboundEntry>,
    stopped: CancellationToken,
}

impl WriteQueue {
    pub fn new(capacity: usize, stopped: CancellationToken) -> (Self, mpsc::Receiver<OutboundEntry>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, stopped }, rx)
    }

    /// Enqueue `entry`, waiting for room if the queue is full. Returns
    /// early with [`PumpError::Canceled`] if `cancel` fires first, or
    /// [`PumpError::Stopped`] if the pump has already stopped.
    pub async fn output(&self, cancel: &CancellationToken, entry: OutboundEntry) -> Result<(), PumpError> {
        if self.stopped.is_cancelled() {
            return Err(PumpError::Stopped);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PumpError::Canceled),
            _ = self.stopped.cancelled() => Err(PumpError::Stopped),
            result = self.tx.send(entry) => result.map_err(|_| PumpError::Stopped),
        }
    }

    /// Enqueue `entry` only if there is room right now. Never blocks and
    /// never errors: `true` iff the entry was accepted, `false` if the
    /// queue was full or the pump has already stopped.
    pub fn try_output(&self, entry: OutboundEntry) -> bool {
        if self.stopped.is_cancelled() {
            return false;
        }
        self.tx.try_send(entry).is_ok()
    }
}
