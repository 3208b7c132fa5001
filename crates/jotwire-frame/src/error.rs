/// Failures while turning bytes into JSON values and back.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame header carries a protocol tag other than 206.
    #[error("invalid protocol identifier {0} (expected 206)")]
    InvalidTag(u16),

    /// The payload is not valid JSON.
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// A value could not be serialized to JSON.
    #[error("failed to serialize JSON: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("payload too large: {size} bytes, limit {max}")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended, or stopped accepting bytes, before a whole frame got through.
    #[error("connection closed mid-frame")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
