//! Serving jotwire connections.
//!
//! A [`JsonServer`] accepts loopback TCP connections, registers each one in a
//! [`ConnectionRegistry`], and runs a session per connection on its own thread.
//! Sessions feed complete frames to a [`MessageHandler`] and write back whatever
//! it returns. The registry can push frames to every live connection at once.

pub mod client;
pub mod error;
pub mod handler;
pub mod registry;
#[cfg(unix)]
pub mod server;
pub mod session;

#[cfg(test)]
mod testing;

pub use client::{connect, connect_with_config, Client};
pub use error::{Result, ServerError, SessionError};
pub use handler::{MessageHandler, TypedHandler};
pub use registry::{BroadcastReport, ConnectionRegistry};
#[cfg(unix)]
pub use server::{JsonServer, ServerConfig, DEFAULT_PORT};
pub use session::{
    run_session, EmptyReadPolicy, SessionConfig, SessionEnd, DEFAULT_WRITE_TIMEOUT,
};
