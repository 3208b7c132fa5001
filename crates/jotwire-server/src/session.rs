//! Drives one connection: read, accumulate, parse, apply actions.

use std::time::Duration;

use bytes::{Buf, BytesMut};
use jotwire_frame::{Action, FrameParser, DEFAULT_MAX_PAYLOAD};
use jotwire_transport::{Link, ReadOutcome, DEFAULT_READ_CHUNK_SIZE};
use tracing::{debug, info, trace, warn};

use crate::error::SessionError;
use crate::handler::MessageHandler;

/// What a session does when a read returns zero bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyReadPolicy {
    /// Treat it as the peer closing the stream.
    #[default]
    Close,
    /// Keep reading. Only meaningful for links that can report empty reads spuriously.
    Retry,
}

/// How long a write may block before the peer is treated as gone.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Upper bound on bytes appended per read. Applied when the server wraps
    /// an accepted socket.
    pub read_chunk_size: usize,
    /// Applied to accepted sockets. A peer that stops reading turns into a failed
    /// write once it expires. `None` lets writes block indefinitely.
    pub write_timeout: Option<Duration>,
    pub empty_read: EmptyReadPolicy,
    /// Frames announcing a larger payload close the connection.
    pub max_payload_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            write_timeout: Some(DEFAULT_WRITE_TIMEOUT),
            empty_read: EmptyReadPolicy::default(),
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

/// How a session ended without an I/O failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The parser rejected the stream and the connection was closed.
    Closed { reason: String },
    /// The peer closed its side.
    PeerClosed,
}

/// Run the read loop for `link` until it ends.
///
/// Every complete frame is handed to `handler`; responses are written back on the
/// same link. Several frames arriving in one read are all processed before the next
/// read. A failed read or write aborts the session with the error; the caller is
/// responsible for removing the link from any registry.
pub fn run_session<L, H>(
    link: &L,
    config: &SessionConfig,
    handler: &H,
) -> Result<SessionEnd, SessionError>
where
    L: Link + ?Sized,
    H: MessageHandler + ?Sized,
{
    let id = link.id();
    let parser = FrameParser::with_max_payload_size(config.max_payload_size);
    let mut buffer = BytesMut::new();

    loop {
        match link.read(&mut buffer)? {
            ReadOutcome::Data(n) => {
                debug!(id, bytes = n, buffered = buffer.len(), "read");
            }
            ReadOutcome::EndOfStream => match config.empty_read {
                EmptyReadPolicy::Close => {
                    link.close();
                    info!(id, discarded = buffer.len(), "peer closed connection");
                    return Ok(SessionEnd::PeerClosed);
                }
                EmptyReadPolicy::Retry => {
                    trace!(id, "empty read, retrying");
                    std::thread::yield_now();
                    continue;
                }
            },
        }

        if let Some(end) = drain(link, &parser, &mut buffer, handler)? {
            return Ok(end);
        }
    }
}

/// Step the parser until it has nothing left to do with the buffered bytes.
fn drain<L, H>(
    link: &L,
    parser: &FrameParser,
    buffer: &mut BytesMut,
    handler: &H,
) -> Result<Option<SessionEnd>, SessionError>
where
    L: Link + ?Sized,
    H: MessageHandler + ?Sized,
{
    loop {
        let actions = parser.step(&buffer[..], |message| handler.on_message(message));
        if actions.is_empty() {
            return Ok(None);
        }

        for action in actions {
            match action {
                Action::Consumed(n) => {
                    buffer.advance(n);
                    debug!(id = link.id(), consumed = n, "frame consumed");
                }
                Action::WriteBytes(bytes) => link.write(&bytes)?,
                Action::CloseConnection(reason) => {
                    warn!(id = link.id(), %reason, "closing connection");
                    buffer.clear();
                    link.close();
                    return Ok(Some(SessionEnd::Closed { reason }));
                }
            }
        }
    }
}
