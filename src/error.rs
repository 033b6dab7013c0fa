//! Error types for the message pump and peer layers.

use std::sync::PoisonError;
use thiserror::Error;

/// Errors surfaced by the [`Pump`](crate::pump::Pump) and [`Peer`](crate::peer::Peer).
#[derive(Debug, Error)]
pub enum PumpError {
    /// The pump has already stopped; returned by `output` and by any
    /// in-flight call when the pump stops out from under it. `try_output`
    /// never returns this — it reports the same condition as a plain
    /// `false`.
    #[error("pump stopped")]
    Stopped,

    /// A caller-supplied cancellation token fired before the operation
    /// completed.
    #[error("operation canceled")]
    Canceled,

    /// A reader, writer, or handler task panicked and the panic payload
    /// could not be downcast to a printable message.
    #[error("unknown panic")]
    UnknownPanic,

    /// Transport-level failure (see [`TransportError`]).
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors a [`Transport`](crate::transport::Transport) implementation can
/// report from its read/write halves.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The framing layer read a length prefix outside `0..=max_message_length`.
    #[error("wrong message length: {0}")]
    WrongMessageLength(i64),

    /// Underlying I/O failure.
    #[error("transport io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type used throughout the pump and peer layers.
pub type PumpResult<T> = Result<T, PumpError>;

/// Errors from [`Peer`](crate::peer::Peer)'s request/response correlation.
#[derive(Debug, Error)]
pub enum PeerError {
    /// A caller-supplied cancellation token fired before a response came
    /// back.
    #[error("request canceled")]
    Canceled,

    /// The pump stopped (or the response table was drained because the
    /// pump stopped) before a response came back.
    #[error("pump stopped before a response arrived")]
    Stopped,

    /// The incoming message didn't match the `R,<id>\n` / `P,<id>\n` /
    /// `N\n` wire convention.
    #[error("malformed peer message header")]
    MalformedHeader,

    /// Two in-flight requests were assigned the same id. Shouldn't happen
    /// with a monotonic counter short of wrapping a `u64`, which would
    /// take centuries of sustained traffic; kept as a named case rather
    /// than an `unwrap` so it fails as data, not a panic.
    #[error("duplicate request id")]
    DuplicateRequestId,

    /// Failed to hand the request or notification to the pump.
    #[error(transparent)]
    Pump(#[from] PumpError),
}

/// Convert a [`PoisonError`] into a recovered guard, logging the recovery.
///
/// A poisoned lock here means some other task panicked while holding it;
/// since every guarded value (write queue, response table, stats) is plain
/// data with no invariant that a panic mid-mutation could violate, recovery
/// is always safe.
pub trait LockResultExt<T> {
    fn recover_poison(self, context: &str) -> T;
}

impl<T> LockResultExt<T> for Result<T, PoisonError<T>> {
    fn recover_poison(self, context: &str) -> T {
        match self {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!(target: "msgpump::lock_recovery", "recovered from poisoned lock in {context}");
                poisoned.into_inner()
            }
        }
    }
}

/// Best-effort human-readable rendering of a `catch_unwind` payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
