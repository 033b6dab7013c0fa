//! Reference transport: a 4-byte big-endian length prefix followed by that
//! many bytes, exactly as a TCP connection's wire format. Bounded to
//! `max_message_length` bytes (default 16 MiB) so a corrupt or hostile
//! peer can't make the reader allocate an unbounded buffer.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

use crate::error::TransportError;
use crate::transport::{MessageReader, MessageWriter, Transport};

/// Default upper bound on a single message, matching the reference Go
/// transport this one is modeled on.
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 16 * 1024 * 1024;

/// A length-delimited transport over any duplex byte stream (a TCP
/// connection, a Unix socket, an in-memory pipe).
pub struct LengthDelimitedTransport<S> {
    stream: S,
    max_message_length: usize,
}

impl<S> LengthDelimitedTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    pub fn new(stream: S) -> Self {
        Self::with_max_message_length(stream, DEFAULT_MAX_MESSAGE_LENGTH)
    }

    pub fn with_max_message_length(stream: S, max_message_length: usize) -> Self {
        Self {
            stream,
            max_message_length,
        }
    }

    fn codec(max_message_length: usize) -> LengthDelimitedCodec {
        LengthDelimitedCodec::builder()
            .max_frame_length(max_message_length)
            .new_codec()
    }
}

impl<S> Transport for LengthDelimitedTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    type Reader = LengthDelimitedReader<ReadHalf<S>>;
    type Writer = LengthDelimitedWriter<WriteHalf<S>>;

    fn split(self) -> (Self::Reader, Self::Writer) {
        let (read_half, write_half) = tokio::io::split(self.stream);
        let codec = Self::codec(self.max_message_length);
        let reader = FramedRead::new(read_half, codec.clone());
        let writer = FramedWrite::new(write_half, codec);
        (LengthDelimitedReader { framed: reader }, LengthDelimitedWriter { framed: writer })
    }
}

pub struct LengthDelimitedReader<R> {
    framed: FramedRead<R, LengthDelimitedCodec>,
}

#[async_trait]
impl<R> MessageReader for LengthDelimitedReader<R>
where
    R: AsyncRead + Send + Unpin,
{
    async fn read_message(&mut self) -> Result<Bytes, TransportError> {
        match self.framed.next().await {
            Some(Ok(bytes)) if bytes.is_empty() => Err(TransportError::WrongMessageLength(0)),
            Some(Ok(bytes)) => Ok(bytes.freeze()),
            Some(Err(err)) => Err(map_frame_error(err)),
            None => Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "transport closed",
            ))),
        }
    }
}

pub struct LengthDelimitedWriter<W> {
    framed: FramedWrite<W, LengthDelimitedCodec>,
}

#[async_trait]
impl<W> MessageWriter for LengthDelimitedWriter<W>
where
    W: AsyncWrite + Send + Unpin,
{
    async fn write_message(&mut self, msg: &Bytes) -> Result<(), TransportError> {
        self.framed.send(msg.clone()).await.map_err(map_frame_error)
    }

    async fn write_message_multipart(&mut self, parts: &[Bytes]) -> Result<(), TransportError> {
        // One length prefix covering every part, not one frame per part:
        // the parts are logically a single message (the peer layer's
        // header plus body, say), and a reader on the other end expects
        // to get them back as a single `read_message` call.
        let total = parts.iter().map(Bytes::len).sum();
        let mut combined = bytes::BytesMut::with_capacity(total);
        for part in parts {
            combined.extend_from_slice(part);
        }
        self.framed
            .send(combined.freeze())
            .await
            .map_err(map_frame_error)
    }
}

fn map_frame_error(err: std::io::Error) -> TransportError {
    if err.kind() == std::io::ErrorKind::InvalidData {
        // tokio-util reports an oversized or malformed length prefix this
        // way; the exact invalid value isn't recoverable from here.
        TransportError::WrongMessageLength(-1)
    } else {
        TransportError::Io(err)
    }
}
