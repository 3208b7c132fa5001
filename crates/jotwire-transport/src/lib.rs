//! Loopback TCP transport for the jotwire protocol.
//!
//! This is the lowest layer of jotwire: socket creation and binding, the acceptor,
//! and the per-connection blocking read/write primitives. Framing and protocol
//! decisions live in `jotwire-frame`; nothing here knows about JSON.

pub mod connection;
pub mod endpoint;
pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod listener;

pub use connection::{Connection, DEFAULT_READ_CHUNK_SIZE};
pub use endpoint::Endpoint;
pub use error::{Result, SocketOp, TransportError};
pub use traits::{ConnectionId, Link, ReadOutcome};

#[cfg(unix)]
pub use listener::ListeningSocket;
