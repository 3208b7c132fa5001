//! Tagged length-prefixed JSON framing.
//!
//! Every message on the wire is framed with:
//! - A 2-byte little-endian protocol tag, always 206
//! - A 4-byte little-endian payload length (JSON body only)
//! - The JSON body itself
//!
//! [`codec`] encodes and decodes single frames. [`parser`] turns an accumulation
//! buffer into [`Action`]s for a connection driver. [`FrameReader`] and
//! [`FrameWriter`] are blocking helpers for clients.

pub mod codec;
pub mod error;
pub mod parser;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_frame, decode_header, encode, encode_into, encode_payload, encode_value, DecodedFrame,
    Header, HeaderStatus, DEFAULT_MAX_PAYLOAD, HEADER_SIZE, PROTOCOL_TAG,
};
pub use error::{FrameError, Result};
pub use parser::{
    step, Action, FrameParser, INVALID_JSON_REASON, INVALID_TAG_REASON, PAYLOAD_TOO_LARGE_REASON,
};
pub use reader::{FrameConfig, FrameReader};
pub use writer::FrameWriter;
