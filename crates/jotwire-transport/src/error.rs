use std::fmt;

/// Socket call that produced a [`TransportError::Os`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketOp {
    Create,
    Configure,
    Bind,
    Listen,
    Poll,
    Accept,
    Connect,
    Read,
    Write,
}

impl SocketOp {
    pub fn as_str(self) -> &'static str {
        match self {
            SocketOp::Create => "socket",
            SocketOp::Configure => "setsockopt",
            SocketOp::Bind => "bind",
            SocketOp::Listen => "listen",
            SocketOp::Poll => "poll",
            SocketOp::Accept => "accept",
            SocketOp::Connect => "connect",
            SocketOp::Read => "read",
            SocketOp::Write => "write",
        }
    }
}

impl fmt::Display for SocketOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in socket operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// An OS-level socket call failed.
    #[error("{op} failed: ({code}) {message}")]
    Os {
        op: SocketOp,
        code: i32,
        message: String,
    },

    /// The OS accepted fewer bytes than requested in a single write.
    #[error("short write ({written} of {expected} bytes)")]
    ShortWrite { written: usize, expected: usize },

    /// The connection was already closed locally.
    #[error("connection closed")]
    Closed,
}

impl TransportError {
    /// Capture an OS error right after the failing call.
    pub fn os(op: SocketOp, err: std::io::Error) -> Self {
        Self::Os {
            op,
            code: err.raw_os_error().unwrap_or(-1),
            message: err.to_string(),
        }
    }

    /// Capture `errno` for a raw libc call that just returned a failure code.
    pub fn last_os_error(op: SocketOp) -> Self {
        Self::os(op, std::io::Error::last_os_error())
    }

    /// OS error code, if this error came from a socket call.
    pub fn code(&self) -> Option<i32> {
        match self {
            TransportError::Os { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
