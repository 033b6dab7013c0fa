//! The collaborator contract a [`Pump`](crate::pump::Pump) drives.
//!
//! A transport is split once, up front, into a [`MessageReader`] half and
//! a [`MessageWriter`] half; the pump's reader task owns the former and its
//! writer task owns the latter for the rest of the pump's life. This
//! mirrors a duplex socket being handed to two independent loops rather
//! than shared behind a lock.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;

/// Reads one framed message at a time.
///
/// Implementations decide framing (length-prefixed, delimiter, whatever
/// the wire format calls for); the pump only ever asks for "the next
/// message".
#[async_trait]
pub trait MessageReader: Send {
    async fn read_message(&mut self) -> Result<Bytes, TransportError>;
}

/// Writes one framed message, or one multipart message, at a time.
#[async_trait]
pub trait MessageWriter: Send {
    async fn write_message(&mut self, msg: &Bytes) -> Result<(), TransportError>;

    /// Write a sequence of parts as a single logical message: on a framed
    /// transport this must land as one frame, not one per part, since a
    /// reader on the other end reconstructs it with a single
    /// `read_message` call. The default here writes one frame per part
    /// and is only correct for an unframed byte-stream transport; any
    /// framed implementation (see [`length_delimited`](crate::transport::length_delimited))
    /// must override it.
    async fn write_message_multipart(&mut self, parts: &[Bytes]) -> Result<(), TransportError> {
        for part in parts {
            self.write_message(part).await?;
        }
        Ok(())
    }
}

/// Optional hook a transport can implement to learn the pump has stopped,
/// e.g. to half-close a socket so a blocked peer read unblocks.
#[async_trait]
pub trait StopNotifier: Send {
    async fn on_stop(&mut self);
}

/// A transport that can be split into independently owned reader and
/// writer halves.
///
/// `Reader`/`Writer` are associated types rather than `Box<dyn ...>` so
/// concrete transports (e.g. [`length_delimited`](crate::transport::length_delimited))
/// can hand back zero-overhead halves; `Pump` itself only ever talks to
/// them through the `MessageReader`/`MessageWriter` trait objects it
/// stores.
pub trait Transport: Send + 'static {
    type Reader: MessageReader + 'static;
    type Writer: MessageWriter + 'static;

    fn split(self) -> (Self::Reader, Self::Writer);
}

pub mod duplex;
pub mod length_delimited;
