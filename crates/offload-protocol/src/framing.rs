//! Length-prefixed primitives layered over a byte-exact stream.

use std::io::{Read, Write};

use crate::error::TransportError;
use crate::message::FAILURE_FLAG;
use crate::transport;

/// Default ceiling for payload and output frames.
const DEFAULT_MAX_PAYLOAD: usize = 1 << 30;
/// Default ceiling for handler names and error messages.
const DEFAULT_MAX_STRING: usize = 64 * 1024;

/// Upper bounds applied to incoming length prefixes before allocating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLimits {
    /// Largest accepted binary frame.
    pub max_payload: usize,
    /// Largest accepted string frame.
    pub max_string: usize,
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self {
            max_payload: DEFAULT_MAX_PAYLOAD,
            max_string: DEFAULT_MAX_STRING,
        }
    }
}

/// A stream wrapped with the protocol's framing rules.
#[derive(Debug)]
pub struct Framed<S> {
    stream: S,
    limits: FrameLimits,
}

impl<S> Framed<S> {
    /// Wraps `stream` with the default frame limits.
    #[must_use]
    pub fn new(stream: S) -> Self {
        Self::with_limits(stream, FrameLimits::default())
    }

    /// Wraps `stream` with explicit frame limits.
    #[must_use]
    pub const fn with_limits(stream: S, limits: FrameLimits) -> Self {
        Self { stream, limits }
    }

    /// Limits applied to incoming frames.
    #[must_use]
    pub const fn limits(&self) -> FrameLimits {
        self.limits
    }

    /// Unwraps the stream.
    #[must_use]
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Read> Framed<S> {
    /// Reads a little-endian `u32`.
    ///
    /// # Errors
    ///
    /// Fails when the stream closes or errors before four bytes arrive.
    #[expect(clippy::little_endian_bytes, reason = "the wire format is little-endian")]
    pub fn read_u32(&mut self) -> Result<u32, TransportError> {
        let mut bytes = [0_u8; 4];
        transport::read_exact(&mut self.stream, &mut bytes)?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Reads a little-endian `u32`, or `None` if the peer closed cleanly first.
    ///
    /// # Errors
    ///
    /// Fails when the stream closes after a partial value or errors.
    #[expect(clippy::little_endian_bytes, reason = "the wire format is little-endian")]
    pub fn read_u32_or_eof(&mut self) -> Result<Option<u32>, TransportError> {
        let mut bytes = [0_u8; 4];
        let complete = transport::read_exact_or_eof(&mut self.stream, &mut bytes)?;
        Ok(complete.then_some(u32::from_le_bytes(bytes)))
    }

    /// Reads a little-endian IEEE-754 `f64`.
    ///
    /// # Errors
    ///
    /// Fails when the stream closes or errors before eight bytes arrive.
    #[expect(clippy::little_endian_bytes, reason = "the wire format is little-endian")]
    pub fn read_f64(&mut self) -> Result<f64, TransportError> {
        let mut bytes = [0_u8; 8];
        transport::read_exact(&mut self.stream, &mut bytes)?;
        Ok(f64::from_le_bytes(bytes))
    }

    /// Reads exactly `len` raw bytes.
    ///
    /// # Errors
    ///
    /// Fails when `len` exceeds the payload limit or the transfer fails.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, TransportError> {
        check_limit(len, self.limits.max_payload)?;
        let mut bytes = vec![0_u8; len];
        transport::read_exact(&mut self.stream, &mut bytes)?;
        Ok(bytes)
    }

    /// Reads a length-prefixed binary frame.
    ///
    /// # Errors
    ///
    /// Fails when the prefix exceeds the payload limit or the transfer fails.
    pub fn read_blob(&mut self) -> Result<Vec<u8>, TransportError> {
        let len = self.read_u32()?;
        self.read_bytes(widen(len))
    }

    /// Reads a length-prefixed UTF-8 string.
    ///
    /// # Errors
    ///
    /// Fails when the prefix exceeds the string limit, the transfer fails, or
    /// the bytes are not UTF-8.
    pub fn read_string(&mut self) -> Result<String, TransportError> {
        let len = self.read_u32()?;
        self.read_string_body(widen(len))
    }

    /// Reads a length-prefixed string whose prefix may be replaced by a clean
    /// close of the stream.
    ///
    /// # Errors
    ///
    /// As [`Framed::read_string`], once any byte of the prefix has arrived.
    pub fn read_string_or_eof(&mut self) -> Result<Option<String>, TransportError> {
        self.read_u32_or_eof()?
            .map(|len| self.read_string_body(widen(len)))
            .transpose()
    }

    fn read_string_body(&mut self, len: usize) -> Result<String, TransportError> {
        check_limit(len, self.limits.max_string)?;
        let mut bytes = vec![0_u8; len];
        transport::read_exact(&mut self.stream, &mut bytes)?;
        Ok(String::from_utf8(bytes)?)
    }
}

impl<S: Write> Framed<S> {
    /// Writes a little-endian `u32`.
    ///
    /// # Errors
    ///
    /// Fails when the channel rejects the bytes.
    #[expect(clippy::little_endian_bytes, reason = "the wire format is little-endian")]
    pub fn write_u32(&mut self, value: u32) -> Result<(), TransportError> {
        transport::write_all(&mut self.stream, &value.to_le_bytes())
    }

    /// Writes a little-endian IEEE-754 `f64`.
    ///
    /// # Errors
    ///
    /// Fails when the channel rejects the bytes.
    #[expect(clippy::little_endian_bytes, reason = "the wire format is little-endian")]
    pub fn write_f64(&mut self, value: f64) -> Result<(), TransportError> {
        transport::write_all(&mut self.stream, &value.to_le_bytes())
    }

    /// Writes raw bytes with no prefix.
    ///
    /// # Errors
    ///
    /// Fails when the channel rejects the bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        transport::write_all(&mut self.stream, bytes)
    }

    /// Writes the `u32` length prefix for a frame of `len` bytes.
    ///
    /// Lengths that do not fit in 32 bits, or that would collide with the
    /// failure flag, are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::TooLarge`] for unrepresentable lengths.
    pub fn write_len(&mut self, len: usize) -> Result<(), TransportError> {
        let prefix = u32::try_from(len)
            .ok()
            .filter(|prefix| *prefix != FAILURE_FLAG)
            .ok_or(TransportError::TooLarge {
                size: len,
                limit: widen(FAILURE_FLAG - 1),
            })?;
        self.write_u32(prefix)
    }

    /// Writes a length-prefixed binary frame.
    ///
    /// # Errors
    ///
    /// Fails for unrepresentable lengths or when the channel rejects bytes.
    pub fn write_blob(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.write_len(bytes.len())?;
        self.write_bytes(bytes)
    }

    /// Writes a length-prefixed UTF-8 string.
    ///
    /// # Errors
    ///
    /// Fails for unrepresentable lengths or when the channel rejects bytes.
    pub fn write_string(&mut self, text: &str) -> Result<(), TransportError> {
        self.write_blob(text.as_bytes())
    }

    /// Flushes buffered output.
    ///
    /// # Errors
    ///
    /// Fails when the channel cannot flush.
    pub fn flush(&mut self) -> Result<(), TransportError> {
        self.stream.flush().map_err(TransportError::Io)
    }
}

pub(crate) const fn check_limit(len: usize, limit: usize) -> Result<(), TransportError> {
    if len > limit {
        return Err(TransportError::TooLarge { size: len, limit });
    }
    Ok(())
}

/// Converts a wire length to `usize`; every supported target is 32-bit or wider.
fn widen(len: u32) -> usize {
    usize::try_from(len).unwrap_or(usize::MAX)
}
