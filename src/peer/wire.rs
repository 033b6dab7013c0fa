//! The header convention a [`Peer`](crate::peer::Peer) prefixes onto every
//! message it sends, so the receiving side can tell a request from a
//! response from a plain notification:
//!
//! - `R,<id>\n<body>` — a request awaiting a `P,<id>\n` reply.
//! - `P,<id>\n<body>` — the reply to a previously seen `R,<id>`.
//! - `N\n<body>` — a notification; no reply expected or sent.
//!
//! `<id>` is the request's sequence number rendered as lowercase hex.

use bytes::Bytes;

use crate::error::PeerError;

/// Messages with no newline within this many leading bytes are dropped as
/// malformed rather than scanned to the end: a well-formed header is a few
/// bytes of tag and hex id, so a missing newline this far in means the
/// payload isn't a peer-framed message at all.
const HEADER_SCAN_LIMIT: usize = 128;

pub enum Header {
    Request(String),
    Response(String),
    Notify,
}

pub fn encode_request_header(id: &str) -> Bytes {
    Bytes::from(format!("R,{id}\n"))
}

pub fn encode_response_header(id: &str) -> Bytes {
    Bytes::from(format!("P,{id}\n"))
}

pub fn encode_notify_header() -> Bytes {
    Bytes::from_static(b"N\n")
}

/// Split a received message into its header and body. The body is a
/// zero-copy slice of the original buffer.
pub fn parse(msg: &Bytes) -> Result<(Header, Bytes), PeerError> {
    let scan_end = msg.len().min(HEADER_SCAN_LIMIT);
    let newline = msg[..scan_end]
        .iter()
        .position(|&b| b == b'\n')
        .ok_or(PeerError::MalformedHeader)?;
    let header_str = std::str::from_utf8(&msg[..newline]).map_err(|_| PeerError::MalformedHeader)?;
    let body = msg.slice(newline + 1..);

    if header_str == "N" {
        return Ok((Header::Notify, body));
    }

    let (tag, id) = header_str.split_once(',').ok_or(PeerError::MalformedHeader)?;
    if id.is_empty() {
        return Err(PeerError::MalformedHeader);
    }
    match tag {
        "R" => Ok((Header::Request(id.to_string()), body)),
        "P" => Ok((Header::Response(id.to_string()), body)),
        _ => Err(PeerError::MalformedHeader),
    }
}
