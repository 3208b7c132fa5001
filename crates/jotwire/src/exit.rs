use std::fmt;
use std::io;

use jotwire_decode::ValidationError;
use jotwire_frame::FrameError;
use jotwire_server::ServerError;
use jotwire_transport::TransportError;

// sysexits-style process exit codes.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

fn code_for_kind(kind: io::ErrorKind) -> Option<i32> {
    match kind {
        io::ErrorKind::PermissionDenied => Some(PERMISSION_DENIED),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Some(TIMEOUT),
        io::ErrorKind::UnexpectedEof => Some(FAILURE),
        _ => None,
    }
}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = code_for_kind(err.kind()).unwrap_or(INTERNAL);
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let code = match &err {
        TransportError::Os { code, .. } => {
            code_for_kind(io::Error::from_raw_os_error(*code).kind()).unwrap_or(TRANSPORT_ERROR)
        }
        TransportError::ShortWrite { .. } | TransportError::Closed => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. }
        | FrameError::InvalidTag(_)
        | FrameError::InvalidJson(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn validation_error(context: &str, err: &ValidationError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn server_error(context: &str, err: ServerError) -> CliError {
    match err {
        ServerError::Transport(err) => transport_error(context, err),
        ServerError::Frame(err) => frame_error(context, err),
        ServerError::Validation(err) => validation_error(context, &err),
        ServerError::Io(err) => io_error(context, err),
    }
}

#[cfg(test)]
mod tests {
    use jotwire_transport::SocketOp;

    use super::*;

    #[test]
    fn refused_connection_is_a_transport_error() {
        let err = TransportError::os(
            SocketOp::Connect,
            io::Error::from(io::ErrorKind::ConnectionRefused),
        );
        assert_eq!(transport_error("connect failed", err).code, TRANSPORT_ERROR);
    }

    #[test]
    fn read_timeout_maps_to_timeout() {
        let err = FrameError::Io(io::Error::from(io::ErrorKind::WouldBlock));
        assert_eq!(frame_error("receive failed", err).code, TIMEOUT);
    }

    #[test]
    fn permission_denied_from_os_code() {
        let err = TransportError::Os {
            op: SocketOp::Bind,
            code: 13,
            message: "Permission denied".to_string(),
        };
        assert_eq!(transport_error("bind failed", err).code, PERMISSION_DENIED);
    }

    #[test]
    fn server_transport_failures_keep_their_code() {
        let err = ServerError::Transport(TransportError::Closed);
        assert_eq!(server_error("send failed", err).code, TRANSPORT_ERROR);

        let err = ServerError::Io(io::Error::from(io::ErrorKind::TimedOut));
        assert_eq!(server_error("recv failed", err).code, TIMEOUT);
    }

    #[test]
    fn invalid_payloads_are_data_errors() {
        let err = ServerError::Validation(ValidationError::MissingType);
        let cli = server_error("decode failed", err);
        assert_eq!(cli.code, DATA_INVALID);
        assert_eq!(cli.message, "decode failed: no message type");
    }
}
