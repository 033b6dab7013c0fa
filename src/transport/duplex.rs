//! An in-memory transport pair for tests, so exercising the pump never
//! requires a real socket or a spawned subprocess.

use tokio::io::DuplexStream;

use crate::transport::length_delimited::LengthDelimitedTransport;

/// Build a connected pair of length-delimited transports backed by an
/// in-memory pipe. `buffer` is the pipe's internal buffer size in bytes.
pub fn pair(buffer: usize) -> (LengthDelimitedTransport<DuplexStream>, LengthDelimitedTransport<DuplexStream>) {
    let (a, b) = tokio::io::duplex(buffer);
    (
        LengthDelimitedTransport::new(a),
        LengthDelimitedTransport::new(b),
    )
}

/// Same as [`pair`] but with an explicit max message length, for tests
/// that exercise the oversized-message rejection path.
pub fn pair_with_max_message_length(
    buffer: usize,
    max_message_length: usize,
) -> (LengthDelimitedTransport<DuplexStream>, LengthDelimitedTransport<DuplexStream>) {
    let (a, b) = tokio::io::duplex(buffer);
    (
        LengthDelimitedTransport::with_max_message_length(a, max_message_length),
        LengthDelimitedTransport::with_max_message_length(b, max_message_length),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MessageReader, MessageWriter, Transport};
    use bytes::Bytes;

    #[tokio::test]
    async fn pair_is_connected_both_ways() {
        let (a, b) = pair(4096);
        let (mut a_reader, mut a_writer) = a.split();
        let (mut b_reader, mut b_writer) = b.split();

        a_writer.write_message(&Bytes::from_static(b"ping")).await.unwrap();
        assert_eq!(b_reader.read_message().await.unwrap(), Bytes::from_static(b"ping"));

        b_writer.write_message(&Bytes::from_static(b"pong")).await.unwrap();
        assert_eq!(a_reader.read_message().await.unwrap(), Bytes::from_static(b"pong"));
    }
}
