//! The pump's combined-error tiebreak: `combined(panic) > reader > writer`.
//!
//! Three independent tasks can each witness a fatal condition; whichever
//! one a caller of [`Pump::error`](crate::pump::Pump::error) sees back
//! should be the most informative one, not just whichever happened to
//! write first. A panic anywhere always wins (it means something is
//! actually broken, as opposed to an ordinary transport hangup); absent a
//! panic, the reader's error wins over the writer's, since a read failure
//! is usually the root cause of a subsequent write failure (the peer hung
//! up, the writer then fails trying to flush whatever was already
//! queued).

use std::sync::Mutex;

use crate::error::PumpError;

#[derive(Default)]
pub struct ErrorState {
    reader: Mutex<Option<PumpError>>,
    writer: Mutex<Option<PumpError>>,
    panic: Mutex<Option<PumpError>>,
}

impl ErrorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reader(&self, err: PumpError) {
        Self::set_once(&self.reader, err);
    }

    pub fn set_writer(&self, err: PumpError) {
        Self::set_once(&self.writer, err);
    }

    pub fn set_panic(&self, err: PumpError) {
        Self::set_once(&self.panic, err);
    }

    fn set_once(slot: &Mutex<Option<PumpError>>, err: PumpError) {
        let mut guard = slot.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_none() {
            *guard = Some(err);
        }
    }

    /// The error to report for the pump as a whole, or `None` if nothing
    /// has gone wrong yet.
    pub fn combined(&self) -> Option<PumpError> {
        if let Some(err) = take_message(&self.panic) {
            return Some(err);
        }
        if let Some(err) = take_message(&self.reader) {
            return Some(err);
        }
        take_message(&self.writer)
    }
}

fn take_message(slot: &Mutex<Option<PumpError>>) -> Option<PumpError> {
    let guard = slot.lock().unwrap_or_else(|e| e.into_inner());
    guard.as_ref().map(describe)
}

fn describe(err: &PumpError) -> PumpError {
    match err {
        PumpError::Stopped => PumpError::Stopped,
        PumpError::Canceled => PumpError::Canceled,
        PumpError::UnknownPanic => PumpError::UnknownPanic,
        PumpError::Transport(inner) => PumpError::Transport(match inner {
            crate::error::TransportError::WrongMessageLength(n) => {
                crate::error::TransportError::WrongMessageLength(*n)
            }
            crate::error::TransportError::Io(io_err) => {
                crate::error::TransportError::Io(std::io::Error::new(io_err.kind(), io_err.to_string()))
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_state_has_no_combined_error() {
        let state = ErrorState::new();
        assert!(state.combined().is_none());
    }

    #[test]
    fn reader_error_surfaces_when_alone() {
        let state = ErrorState::new();
        state.set_reader(PumpError::Transport(crate::error::TransportError::WrongMessageLength(-1)));
        assert!(matches!(
            state.combined(),
            Some(PumpError::Transport(crate::error::TransportError::WrongMessageLength(-1)))
        ));
    }

    #[test]
    fn panic_outranks_reader_and_writer() {
        let state = ErrorState::new();
        state.set_writer(PumpError::Stopped);
        state.set_reader(PumpError::Canceled);
        state.set_panic(PumpError::UnknownPanic);
        assert!(matches!(state.combined(), Some(PumpError::UnknownPanic)));
    }

    #[test]
    fn reader_outranks_writer() {
        let state = ErrorState::new();
        state.set_writer(PumpError::Stopped);
        state.set_reader(PumpError::Canceled);
        assert!(matches!(state.combined(), Some(PumpError::Canceled)));
    }

    #[test]
    fn first_write_to_a_slot_wins() {
        let state = ErrorState::new();
        state.set_reader(PumpError::Canceled);
        state.set_reader(PumpError::Stopped);
        assert!(matches!(state.combined(), Some(PumpError::Canceled)));
    }
}
