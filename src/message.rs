//! The message types carried across the write queue.

use bytes::Bytes;

/// A single entry on the write queue: either a plain message or a
/// multipart message written as one logical unit.
///
/// Multipart exists so a caller that already has its header and body as
/// separate buffers (the peer layer's `R,<id>\n` header plus the request
/// body, for instance) never has to copy them into one contiguous buffer
/// just to hand them to the writer task.
#[derive(Debug, Clone)]
pub enum OutboundEntry {
    Single(Bytes),
    Multipart(Vec<Bytes>),
}

impl OutboundEntry {
    /// Total byte length across all parts, for statistics.
    pub fn byte_len(&self) -> usize {
        match self {
            OutboundEntry::Single(b) => b.len(),
            OutboundEntry::Multipart(parts) => parts.iter().map(Bytes::len).sum(),
        }
    }
}

impl From<Bytes> for OutboundEntry {
    fn from(b: Bytes) -> Self {
        OutboundEntry::Single(b)
    }
}

impl From<Vec<Bytes>> for OutboundEntry {
    fn from(parts: Vec<Bytes>) -> Self {
        OutboundEntry::Multipart(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_len_single() {
        let entry = OutboundEntry::Single(Bytes::from_static(b"hello"));
        assert_eq!(entry.byte_len(), 5);
    }

    #[test]
    fn byte_len_multipart_sums_parts() {
        let entry = OutboundEntry::Multipart(vec![
            Bytes::from_static(b"R,1\n"),
            Bytes::from_static(b"payload"),
        ]);
        assert_eq!(entry.byte_len(), 4 + 7);
    }
}
