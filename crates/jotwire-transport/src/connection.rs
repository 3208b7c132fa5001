use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use bytes::BytesMut;
use tracing::{debug, trace};

use crate::endpoint::Endpoint;
use crate::error::{Result, SocketOp, TransportError};
use crate::traits::{ConnectionId, Link, ReadOutcome};

/// Default number of bytes reserved in the caller's buffer per read.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 1024;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// One connected TCP socket.
///
/// Reads and writes go through `&self` so the session worker can block in `read` while
/// the registry writes broadcasts. Writes are serialized by an internal lock so frames
/// from different writers never interleave. The handle is released when the value is
/// dropped; [`Connection::close`] only shuts the socket down, which also wakes a reader
/// blocked on it.
pub struct Connection {
    id: ConnectionId,
    stream: TcpStream,
    peer: Option<Endpoint>,
    read_chunk_size: usize,
    write_lock: Mutex<()>,
    closed: AtomicBool,
}

impl Connection {
    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream) -> Self {
        let peer = stream.peer_addr().ok().and_then(Endpoint::from_socket_addr);
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            stream,
            peer,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            write_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }

    /// Connect to a listening endpoint (blocking).
    pub fn connect(endpoint: Endpoint) -> Result<Self> {
        let stream = TcpStream::connect(endpoint.socket_addr())
            .map_err(|e| TransportError::os(SocketOp::Connect, e))?;
        debug!(%endpoint, "connected");
        Ok(Self::from_stream(stream))
    }

    /// Override how many bytes a single read may append.
    pub fn with_read_chunk_size(mut self, read_chunk_size: usize) -> Self {
        self.read_chunk_size = read_chunk_size.max(1);
        self
    }

    /// Bound how long one `write` may block on a peer that stopped reading.
    ///
    /// An expired write fails with [`TransportError::Os`]. `None` blocks indefinitely.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.stream
            .set_write_timeout(timeout)
            .map_err(|e| TransportError::os(SocketOp::Configure, e))
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Remote endpoint, when the OS reported an IPv4 peer.
    pub fn peer_endpoint(&self) -> Option<Endpoint> {
        self.peer
    }

    pub fn read_chunk_size(&self) -> usize {
        self.read_chunk_size
    }

    /// One blocking read of at most `read_chunk_size` bytes, appended to `dst`.
    pub fn read(&self, dst: &mut BytesMut) -> Result<ReadOutcome> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let start = dst.len();
        dst.resize(start + self.read_chunk_size, 0);
        loop {
            match (&self.stream).read(&mut dst[start..]) {
                Ok(0) => {
                    dst.truncate(start);
                    trace!(id = self.id, "zero-length read");
                    return Ok(ReadOutcome::EndOfStream);
                }
                Ok(n) => {
                    dst.truncate(start + n);
                    trace!(id = self.id, bytes = n, "read");
                    return Ok(ReadOutcome::Data(n));
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    dst.truncate(start);
                    return Err(TransportError::os(SocketOp::Read, err));
                }
            }
        }
    }

    /// Write `bytes` with a single OS write. A short write is a hard error.
    pub fn write(&self, bytes: &[u8]) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        loop {
            match (&self.stream).write(bytes) {
                Ok(n) if n == bytes.len() => return Ok(()),
                Ok(n) => {
                    return Err(TransportError::ShortWrite {
                        written: n,
                        expected: bytes.len(),
                    })
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::os(SocketOp::Write, err)),
            }
        }
    }

    /// Shut the socket down in both directions.
    ///
    /// Returns `true` for the first call; later calls are no-ops.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        // The peer may already have gone away; the handle is still released on drop.
        let _ = self.stream.shutdown(Shutdown::Both);
        debug!(id = self.id, peer = ?self.peer, "connection closed");
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Give up the connection wrapper and take the raw stream.
    pub fn into_stream(self) -> TcpStream {
        self.stream
    }
}

impl Link for Connection {
    fn id(&self) -> ConnectionId {
        Connection::id(self)
    }

    fn read(&self, dst: &mut BytesMut) -> Result<ReadOutcome> {
        Connection::read(self, dst)
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        Connection::write(self, bytes)
    }

    fn close(&self) -> bool {
        Connection::close(self)
    }

    fn is_closed(&self) -> bool {
        Connection::is_closed(self)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use super::*;

    fn loopback_pair() -> (Connection, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (Connection::from_stream(server), client)
    }

    #[test]
    fn read_appends_to_buffer() {
        let (conn, mut client) = loopback_pair();
        client.write_all(b"hello").unwrap();

        let mut buf = BytesMut::from(&b"xy"[..]);
        let mut total = 0;
        while total < 5 {
            match conn.read(&mut buf).unwrap() {
                ReadOutcome::Data(n) => total += n,
                ReadOutcome::EndOfStream => panic!("unexpected end of stream"),
            }
        }
        assert_eq!(buf.as_ref(), b"xyhello");
    }

    #[test]
    fn read_respects_chunk_size() {
        let (conn, mut client) = loopback_pair();
        let conn = conn.with_read_chunk_size(4);
        client.write_all(b"0123456789").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));

        let mut buf = BytesMut::new();
        let outcome = conn.read(&mut buf).unwrap();
        assert!(matches!(outcome, ReadOutcome::Data(n) if n <= 4));
        assert!(buf.len() <= 4);
    }

    #[test]
    fn peer_shutdown_reads_as_end_of_stream() {
        let (conn, client) = loopback_pair();
        client.shutdown(Shutdown::Write).unwrap();

        let mut buf = BytesMut::new();
        assert_eq!(conn.read(&mut buf).unwrap(), ReadOutcome::EndOfStream);
        assert!(buf.is_empty());
    }

    #[test]
    fn write_delivers_all_bytes() {
        let (conn, mut client) = loopback_pair();
        conn.write(b"frame-bytes").unwrap();

        let mut got = [0u8; 11];
        client.read_exact(&mut got).unwrap();
        assert_eq!(&got, b"frame-bytes");
    }

    #[test]
    fn close_is_reported_once() {
        let (conn, _client) = loopback_pair();
        assert!(conn.close());
        assert!(!conn.close());
        assert!(conn.is_closed());
    }

    #[test]
    fn io_after_close_fails() {
        let (conn, _client) = loopback_pair();
        conn.close();

        assert!(matches!(conn.write(b"late"), Err(TransportError::Closed)));
        let mut buf = BytesMut::new();
        assert!(matches!(conn.read(&mut buf), Err(TransportError::Closed)));
    }

    #[test]
    fn write_to_stalled_peer_times_out() {
        let (conn, _silent) = loopback_pair();
        conn.set_write_timeout(Some(Duration::from_millis(100)))
            .unwrap();

        let chunk = vec![b'x'; 64 * 1024];
        let err = (0..4096)
            .find_map(|_| conn.write(&chunk).err())
            .expect("send buffer should fill up");
        // The last write either times out outright or lands partially.
        assert!(matches!(
            err,
            TransportError::Os {
                op: SocketOp::Write,
                ..
            } | TransportError::ShortWrite { .. }
        ));
    }

    #[test]
    fn connection_ids_are_unique() {
        let (a, _ca) = loopback_pair();
        let (b, _cb) = loopback_pair();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn connect_to_closed_port_fails_with_os_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = Connection::connect(Endpoint::localhost(port)).unwrap_err();
        assert!(matches!(
            err,
            TransportError::Os {
                op: SocketOp::Connect,
                ..
            }
        ));
    }
}
