use bytes::BytesMut;

use crate::error::Result;

/// Process-unique identity of a connection.
pub type ConnectionId = u64;

/// Result of a single blocking read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// This many bytes were appended to the caller's buffer.
    Data(usize),
    /// The OS returned a zero-length read.
    EndOfStream,
}

/// A live, bidirectional byte link to one peer.
///
/// [`Connection`](crate::Connection) is the socket-backed implementation. The session
/// driver and the registry are written against this trait so that they can be
/// exercised without sockets.
pub trait Link: Send + Sync {
    /// Identity used as the registry key.
    fn id(&self) -> ConnectionId;

    /// One blocking read, appending whatever arrived to `dst`.
    fn read(&self, dst: &mut BytesMut) -> Result<ReadOutcome>;

    /// Write all of `bytes` in one call or fail.
    fn write(&self, bytes: &[u8]) -> Result<()>;

    /// Release the link. Returns `true` only for the call that actually closed it.
    fn close(&self) -> bool;

    fn is_closed(&self) -> bool;
}
