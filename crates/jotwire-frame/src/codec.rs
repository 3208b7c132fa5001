use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use serde_json::Value;

use crate::error::{FrameError, Result};

/// Frame header: tag (2) + length (4) = 6 bytes.
pub const HEADER_SIZE: usize = 6;

/// Protocol tag carried by every frame.
pub const PROTOCOL_TAG: u16 = 206;

/// Default maximum payload size: anything the 4-byte length field can describe.
pub const DEFAULT_MAX_PAYLOAD: usize = u32::MAX as usize;

/// A decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Protocol tag; valid frames carry [`PROTOCOL_TAG`].
    pub tag: u16,
    /// Byte count of the JSON body, excluding the header.
    pub length: u32,
}

impl Header {
    pub fn has_valid_tag(&self) -> bool {
        self.tag == PROTOCOL_TAG
    }

    /// Total wire size of the frame this header introduces.
    ///
    /// `None` when the size does not fit in `usize`, which only happens on targets
    /// narrower than 64 bits.
    pub fn frame_len(&self) -> Option<usize> {
        usize::try_from(self.length)
            .ok()
            .and_then(|length| length.checked_add(HEADER_SIZE))
    }
}

/// Outcome of looking at the start of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStatus {
    /// Fewer than [`HEADER_SIZE`] bytes are available.
    NeedMoreBytes,
    Ready(Header),
}

/// A fully decoded frame and the number of buffer bytes it occupied.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub value: Value,
    pub consumed: usize,
}

/// Read the frame header at the start of `src`, if all six bytes are present.
pub fn decode_header(src: &[u8]) -> HeaderStatus {
    if src.len() < HEADER_SIZE {
        return HeaderStatus::NeedMoreBytes;
    }
    HeaderStatus::Ready(Header {
        tag: u16::from_le_bytes([src[0], src[1]]),
        length: u32::from_le_bytes([src[2], src[3], src[4], src[5]]),
    })
}

/// Encode a JSON value as a complete frame.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────┬──────────────────────┐
/// │ Tag (2B LE)  │ Length (4B   │ JSON payload          │
/// │ 206          │ LE)          │ (Length bytes)        │
/// └──────────────┴──────────────┴──────────────────────┘
/// ```
pub fn encode(json: &Value) -> Result<Bytes> {
    encode_value(json)
}

/// Encode any serializable value as a complete frame.
pub fn encode_value<T: Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    let mut dst = BytesMut::new();
    encode_into(value, &mut dst)?;
    Ok(dst.freeze())
}

/// Serialize `value` and append the resulting frame to `dst`.
pub fn encode_into<T: Serialize + ?Sized>(value: &T, dst: &mut BytesMut) -> Result<()> {
    let payload = serde_json::to_vec(value).map_err(FrameError::Serialization)?;
    encode_payload(&payload, dst)
}

/// Append a frame around an already serialized JSON payload.
pub fn encode_payload(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > u32::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u16_le(PROTOCOL_TAG);
    dst.put_u32_le(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

/// Decode the frame at the start of `src` without consuming anything.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
pub fn decode_frame(src: &[u8], max_payload: usize) -> Result<Option<DecodedFrame>> {
    let header = match decode_header(src) {
        HeaderStatus::NeedMoreBytes => return Ok(None),
        HeaderStatus::Ready(header) => header,
    };

    if !header.has_valid_tag() {
        return Err(FrameError::InvalidTag(header.tag));
    }

    if header.length as usize > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: header.length as usize,
            max: max_payload,
        });
    }

    let total = header.frame_len().ok_or(FrameError::PayloadTooLarge {
        size: header.length as usize,
        max: max_payload,
    })?;
    if src.len() < total {
        return Ok(None);
    }

    let value = serde_json::from_slice(&src[HEADER_SIZE..total]).map_err(FrameError::InvalidJson)?;
    Ok(Some(DecodedFrame {
        value,
        consumed: total,
    }))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn encode_writes_little_endian_header() {
        let frame = encode(&json!({"ok": true})).unwrap();
        assert_eq!(&frame[..2], &[206, 0]);
        assert_eq!(&frame[2..6], &[11, 0, 0, 0]);
        assert_eq!(&frame[6..], br#"{"ok":true}"#);
    }

    #[test]
    fn encode_decode_roundtrip() {
        let value = json!({
            "type": "window",
            "title": "Ünïcødé",
            "width": 200,
            "root": {"type": "stack", "items": [], "direction": "vertical"},
            "ratio": 0.5,
            "nothing": null
        });
        let frame = encode(&value).unwrap();
        let decoded = decode_frame(&frame, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert_eq!(decoded.value, value);
        assert_eq!(decoded.consumed, frame.len());
    }

    #[test]
    fn scalar_values_roundtrip() {
        for value in [json!(null), json!(42), json!("text"), json!([1, 2, 3])] {
            let frame = encode(&value).unwrap();
            let decoded = decode_frame(&frame, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
            assert_eq!(decoded.value, value);
        }
    }

    #[test]
    fn length_counts_payload_bytes_only() {
        let frame = encode(&json!("é")).unwrap();
        let header = match decode_header(&frame) {
            HeaderStatus::Ready(header) => header,
            HeaderStatus::NeedMoreBytes => panic!("header should be complete"),
        };
        // "é" is two UTF-8 bytes plus two quotes.
        assert_eq!(header.length, 4);
        assert_eq!(header.frame_len(), Some(frame.len()));
    }

    #[test]
    fn decode_header_needs_six_bytes() {
        assert_eq!(decode_header(&[206, 0, 1, 0, 0]), HeaderStatus::NeedMoreBytes);
        assert_eq!(
            decode_header(&[206, 0, 1, 0, 0, 0]),
            HeaderStatus::Ready(Header {
                tag: 206,
                length: 1
            })
        );
    }

    #[test]
    fn decode_incomplete_payload() {
        let frame = encode(&json!({"a": 1})).unwrap();
        let result = decode_frame(&frame[..frame.len() - 1], DEFAULT_MAX_PAYLOAD).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn decode_invalid_tag() {
        let result = decode_frame(&[0xFF, 0xFF, 0, 0, 0, 0], DEFAULT_MAX_PAYLOAD);
        assert!(matches!(result, Err(FrameError::InvalidTag(0xFFFF))));
    }

    #[test]
    fn decode_invalid_json() {
        let mut buf = BytesMut::new();
        encode_payload(b"{nope", &mut buf).unwrap();
        let result = decode_frame(&buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(result, Err(FrameError::InvalidJson(_))));
    }

    #[test]
    fn decode_payload_too_large() {
        let mut buf = BytesMut::new();
        buf.put_u16_le(PROTOCOL_TAG);
        buf.put_u32_le(1024);
        let result = decode_frame(&buf, 16);
        assert!(matches!(
            result,
            Err(FrameError::PayloadTooLarge {
                size: 1024,
                max: 16
            })
        ));
    }

    #[test]
    fn largest_announced_length_still_waits_for_bytes() {
        let header = Header {
            tag: PROTOCOL_TAG,
            length: u32::MAX,
        };
        let expected = (u32::MAX as usize).checked_add(HEADER_SIZE);
        assert_eq!(header.frame_len(), expected);

        let mut buf = BytesMut::new();
        buf.put_u16_le(PROTOCOL_TAG);
        buf.put_u32_le(u32::MAX);
        buf.put_slice(b"{}");
        let result = decode_frame(&buf, DEFAULT_MAX_PAYLOAD);
        if expected.is_some() {
            assert!(matches!(result, Ok(None)));
        } else {
            assert!(matches!(result, Err(FrameError::PayloadTooLarge { .. })));
        }
    }

    #[test]
    fn decode_reports_only_first_frame() {
        let mut buf = BytesMut::new();
        encode_into(&json!(1), &mut buf).unwrap();
        encode_into(&json!(2), &mut buf).unwrap();

        let first = decode_frame(&buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert_eq!(first.value, json!(1));
        assert_eq!(first.consumed, HEADER_SIZE + 1);

        let second = decode_frame(&buf[first.consumed..], DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();
        assert_eq!(second.value, json!(2));
    }
}
