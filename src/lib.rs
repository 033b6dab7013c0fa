//! A bidirectional, framed message pump and a request/response peer layer
//! built on top of it.
//!
//! [`pump::Pump`] drives a [`transport::Transport`] with three cooperating
//! tasks — reader, writer, monitor — dispatching every inbound message to
//! a [`handler::Handler`] and accepting outbound messages through
//! `output`/`try_output`. [`peer::Peer`] wraps a pump with request id
//! correlation so a caller can `do_request` and await the matching
//! response, or fire-and-forget a `notify`.

pub mod done;
pub mod error;
pub mod handler;
pub mod message;
pub mod peer;
pub mod pump;
pub mod stats;
pub mod transport;
pub mod worker;

pub use done::DoneSignal;
pub use error::{PumpError, PumpResult, TransportError};
pub use handler::{Handler, HandlerFn};
pub use message::OutboundEntry;
pub use peer::{Peer, PeerHandler};
pub use pump::{Pump, PumpOptions};
pub use stats::Statistics;
pub use worker::ParallelHandler;
