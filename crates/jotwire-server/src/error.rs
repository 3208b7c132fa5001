use jotwire_decode::ValidationError;
use jotwire_frame::FrameError;
use jotwire_transport::TransportError;

/// Why a connection session stopped abnormally.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Reading from or writing to the connection failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Errors from the server, the registry, and the client.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// A received payload did not decode into the requested message type.
    #[error("invalid message: {0}")]
    Validation(#[from] ValidationError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
