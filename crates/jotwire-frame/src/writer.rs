use std::io::{ErrorKind, Write};
use std::net::TcpStream;

use bytes::BytesMut;
use serde::Serialize;

use crate::codec::{encode_into, encode_payload, HEADER_SIZE};
use crate::error::{FrameError, Result};
use crate::reader::FrameConfig;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Frames JSON values onto a byte stream, one write per frame.
pub struct FrameWriter<T> {
    inner: T,
    staging: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            staging: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Serialize `value` and send it as one frame.
    pub fn send<V: Serialize + ?Sized>(&mut self, value: &V) -> Result<()> {
        self.staging.clear();
        encode_into(value, &mut self.staging)?;
        self.transmit()
    }

    /// Frame bytes that are already JSON, leaving them untouched.
    pub fn send_payload(&mut self, payload: &[u8]) -> Result<()> {
        self.staging.clear();
        encode_payload(payload, &mut self.staging)?;
        self.transmit()
    }

    fn transmit(&mut self) -> Result<()> {
        let size = self.staging.len() - HEADER_SIZE;
        let max = self.config.max_payload_size;
        if size > max {
            return Err(FrameError::PayloadTooLarge { size, max });
        }

        self.inner
            .write_all(&self.staging)
            .and_then(|()| self.inner.flush())
            .map_err(|err| match err.kind() {
                ErrorKind::WriteZero => FrameError::ConnectionClosed,
                _ => FrameError::Io(err),
            })
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl FrameWriter<TcpStream> {
    /// Wrap a TCP stream, applying `config.write_timeout` to the socket.
    pub fn with_config_tcp(inner: TcpStream, config: FrameConfig) -> Result<Self> {
        inner.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use serde_json::json;

    use super::*;
    use crate::codec::{decode_frame, DEFAULT_MAX_PAYLOAD};
    use crate::reader::FrameReader;

    #[test]
    fn write_single_frame() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(&json!({"type": "get", "id": "two"})).unwrap();

        let wire = writer.into_inner().into_inner();
        let frame = decode_frame(&wire, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert_eq!(frame.value, json!({"type": "get", "id": "two"}));
        assert_eq!(frame.consumed, wire.len());
    }

    #[test]
    fn send_payload_keeps_bytes_verbatim() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send_payload(br#"{"b": 2,  "a": 1}"#).unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(&wire[HEADER_SIZE..], br#"{"b": 2,  "a": 1}"#);
    }

    #[test]
    fn oversized_payload_is_rejected_before_writing() {
        let config = FrameConfig {
            max_payload_size: 4,
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(Cursor::new(Vec::<u8>::new()), config);
        let err = writer.send(&json!("too long")).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert!(writer.get_ref().get_ref().is_empty());
    }

    #[test]
    fn zero_length_write_reports_closed() {
        let mut writer = FrameWriter::new(ZeroWriter);
        assert!(matches!(
            writer.send(&json!(1)),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.send(&json!({"seq": 1})).unwrap();
        writer.send(&json!({"seq": 2})).unwrap();
        assert_eq!(reader.read_frame().unwrap(), json!({"seq": 1}));
        assert_eq!(reader.read_frame().unwrap(), json!({"seq": 2}));
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
