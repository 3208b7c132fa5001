//! Incremental frame parser.
//!
//! [`FrameParser::step`] looks at an accumulation buffer and describes what the caller
//! should do next as a list of [`Action`]s. It never reads, writes, or mutates the
//! buffer itself, so the protocol can be exercised with plain byte slices.

use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, warn};

use crate::codec::{decode_frame, encode, DEFAULT_MAX_PAYLOAD};
use crate::error::FrameError;

/// Close reason for a frame whose tag is not 206.
pub const INVALID_TAG_REASON: &str = "invalid protocol identifier, expected 206";

/// Close reason for a payload that is not valid JSON.
pub const INVALID_JSON_REASON: &str = "invalid JSON";

/// Prefix of the close reason for a length above the configured limit.
pub const PAYLOAD_TOO_LARGE_REASON: &str = "payload too large";

/// An instruction for the connection driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Drop the first `n` bytes of the accumulation buffer.
    Consumed(usize),
    /// Send these bytes on the same connection.
    WriteBytes(Bytes),
    /// Close the connection and discard whatever is still buffered.
    CloseConnection(String),
}

impl Action {
    pub fn is_close(&self) -> bool {
        matches!(self, Action::CloseConnection(_))
    }
}

/// Stateless frame parser with a configurable payload limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameParser {
    max_payload_size: usize,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close connections that announce a payload larger than `max_payload_size`.
    pub fn with_max_payload_size(max_payload_size: usize) -> Self {
        Self { max_payload_size }
    }

    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }

    /// Decode at most one frame from the front of `buffer`.
    ///
    /// Returns an empty list while the frame is incomplete. A complete frame always
    /// yields `Consumed(frame_len)` first, followed by `WriteBytes` when `on_message`
    /// produced a response. Protocol violations yield a single `CloseConnection`.
    /// The caller re-invokes `step` after trimming to find further pipelined frames.
    pub fn step<F>(&self, buffer: &[u8], mut on_message: F) -> Vec<Action>
    where
        F: FnMut(Value) -> Option<Value>,
    {
        let frame = match decode_frame(buffer, self.max_payload_size) {
            Ok(Some(frame)) => frame,
            Ok(None) => return Vec::new(),
            Err(FrameError::InvalidTag(tag)) => {
                debug!(tag, "rejecting frame with unknown protocol tag");
                return vec![Action::CloseConnection(INVALID_TAG_REASON.to_string())];
            }
            Err(FrameError::InvalidJson(err)) => {
                debug!(error = %err, "rejecting frame with malformed payload");
                return vec![Action::CloseConnection(INVALID_JSON_REASON.to_string())];
            }
            Err(FrameError::PayloadTooLarge { size, max }) => {
                debug!(size, max, "rejecting oversized frame");
                return vec![Action::CloseConnection(format!(
                    "{PAYLOAD_TOO_LARGE_REASON}: {size} bytes, limit {max}"
                ))];
            }
            Err(err) => return vec![Action::CloseConnection(err.to_string())],
        };

        let mut actions = vec![Action::Consumed(frame.consumed)];
        if let Some(response) = on_message(frame.value) {
            match encode(&response) {
                Ok(bytes) => actions.push(Action::WriteBytes(bytes)),
                Err(err) => warn!(error = %err, "dropping response that cannot be encoded"),
            }
        }
        actions
    }
}

/// [`FrameParser::step`] with the default configuration.
pub fn step<F>(buffer: &[u8], on_message: F) -> Vec<Action>
where
    F: FnMut(Value) -> Option<Value>,
{
    FrameParser::default().step(buffer, on_message)
}
