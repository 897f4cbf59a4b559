//! Request and response messages.

use std::io::{Read, Write};

use crate::error::TransportError;
use crate::framing::{FrameLimits, Framed, check_limit};

/// Value of the output-length field that marks a failure response.
pub const FAILURE_FLAG: u32 = 0xFFFF_FFFF;

/// A job submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    /// Name of the compute handler that should process the payload.
    pub handler: String,
    /// Opaque input bytes.
    pub payload: Vec<u8>,
}

impl JobRequest {
    /// Reads the next request, or `None` when the peer closed the connection
    /// cleanly between exchanges.
    ///
    /// # Errors
    ///
    /// Fails when the stream closes mid-request or a frame is malformed.
    pub fn read_from<S: Read>(framed: &mut Framed<S>) -> Result<Option<Self>, TransportError> {
        let Some(handler) = framed.read_string_or_eof()? else {
            return Ok(None);
        };
        let payload = framed.read_blob()?;
        Ok(Some(Self { handler, payload }))
    }
}

/// Writes a request without taking ownership of its parts.
///
/// Nothing is sent when either part exceeds the stream's [`FrameLimits`],
/// since a reader applying the same limits would drop the connection.
///
/// # Errors
///
/// Returns [`TransportError::TooLarge`] for oversized parts, or fails when
/// the channel rejects the bytes.
pub fn write_request<S: Write>(
    framed: &mut Framed<S>,
    handler: &str,
    payload: &[u8],
) -> Result<(), TransportError> {
    let limits = framed.limits();
    check_limit(handler.len(), limits.max_string)?;
    check_limit(payload.len(), limits.max_payload)?;
    framed.write_string(handler)?;
    framed.write_blob(payload)?;
    framed.flush()
}

/// The daemon's answer to a [`JobRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum JobResponse {
    /// The handler produced `output`; `elapsed` covers the whole server-side
    /// wait, queueing included.
    Success {
        /// Bytes the handler wrote for this job.
        output: Vec<u8>,
        /// Seconds between admission and settlement.
        elapsed: f64,
    },
    /// The job was rejected or its batch failed.
    Failure {
        /// Human-readable reason.
        message: String,
    },
}

impl JobResponse {
    /// Builds a failure response.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    /// Reads a response.
    ///
    /// # Errors
    ///
    /// Fails when the stream closes early or a frame is malformed.
    pub fn read_from<S: Read>(framed: &mut Framed<S>) -> Result<Self, TransportError> {
        let len = framed.read_u32()?;
        if len == FAILURE_FLAG {
            let message = framed.read_string()?;
            return Ok(Self::Failure { message });
        }
        let output = framed.read_bytes(usize::try_from(len).unwrap_or(usize::MAX))?;
        let elapsed = framed.read_f64()?;
        Ok(Self::Success { output, elapsed })
    }

    /// Writes this response and flushes the stream.
    ///
    /// Every frame written fits the stream's [`FrameLimits`], so a peer
    /// reading with the same limits always gets a response. Failure messages
    /// are cut at the string limit and an output beyond the payload limit is
    /// answered as a failure instead.
    ///
    /// # Errors
    ///
    /// Fails when the channel rejects the bytes.
    pub fn write_to<S: Write>(&self, framed: &mut Framed<S>) -> Result<(), TransportError> {
        let limits = framed.limits();
        match self {
            Self::Success { output, elapsed } if output.len() <= limits.max_payload => {
                framed.write_blob(output)?;
                framed.write_f64(*elapsed)?;
            }
            Self::Success { output, .. } => {
                let message = format!(
                    "handler output of {} bytes exceeds the {}-byte frame limit",
                    output.len(),
                    limits.max_payload
                );
                write_failure(framed, &message, limits)?;
            }
            Self::Failure { message } => write_failure(framed, message, limits)?,
        }
        framed.flush()
    }
}

fn write_failure<S: Write>(
    framed: &mut Framed<S>,
    message: &str,
    limits: FrameLimits,
) -> Result<(), TransportError> {
    framed.write_u32(FAILURE_FLAG)?;
    framed.write_string(truncate_to_boundary(message, limits.max_string))
}

/// Longest prefix of `text` no longer than `limit` bytes that ends on a
/// character boundary.
fn truncate_to_boundary(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let end = (0..=limit)
        .rev()
        .find(|index| text.is_char_boundary(*index))
        .unwrap_or(0);
    text.get(..end).unwrap_or_default()
}
