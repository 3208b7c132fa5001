use std::io::{ErrorKind, Read};
use std::net::TcpStream;

use bytes::{Buf, BytesMut};
use serde_json::Value;

use crate::codec::{decode_frame, DEFAULT_MAX_PAYLOAD};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Configuration for blocking frame readers and writers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes.
    pub max_payload_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

/// Pulls whole JSON values off a byte stream.
///
/// Bytes that arrive ahead of the value being returned stay pending for the next call.
pub struct FrameReader<T> {
    inner: T,
    pending: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            pending: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Block until one value has been decoded.
    ///
    /// End of stream, even in the middle of a frame, is `FrameError::ConnectionClosed`.
    pub fn read_frame(&mut self) -> Result<Value> {
        loop {
            match decode_frame(&self.pending, self.config.max_payload_size)? {
                Some(decoded) => {
                    self.pending.advance(decoded.consumed);
                    return Ok(decoded.value);
                }
                None => self.fill()?,
            }
        }
    }

    fn fill(&mut self) -> Result<()> {
        let mut scratch = [0u8; READ_CHUNK_SIZE];
        let n = loop {
            match self.inner.read(&mut scratch) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        };
        self.pending.extend_from_slice(&scratch[..n]);
        Ok(())
    }

    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl FrameReader<TcpStream> {
    /// Wrap a TCP stream, applying `config.read_timeout` to the socket.
    pub fn with_config_tcp(inner: TcpStream, config: FrameConfig) -> Result<Self> {
        inner.set_read_timeout(config.read_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}
