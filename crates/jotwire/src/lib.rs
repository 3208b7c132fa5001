//! Length-prefixed JSON over loopback TCP.
//!
//! Every frame is a 2-byte protocol tag (206), a 4-byte payload length, and a JSON
//! body, with both integers little-endian.
//!
//! # Crate Structure
//!
//! - [`transport`]: sockets, the acceptor, and per-connection reads and writes
//! - [`frame`]: the frame codec and the incremental parser
//! - [`decode`]: multi-error decoding into typed messages
//! - [`server`]: sessions, the connection registry, the threaded server, and a client
//!   (behind the `server` feature)

/// Re-export transport types.
pub mod transport {
    pub use jotwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use jotwire_frame::*;
}

/// Re-export decoding and message types.
pub mod decode {
    pub use jotwire_decode::*;
}

/// Re-export server types (requires `server` feature).
#[cfg(feature = "server")]
pub mod server {
    pub use jotwire_server::*;
}
