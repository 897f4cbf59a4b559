//! Transport failures shared by the daemon and the client.

use std::io;
use std::string::FromUtf8Error;

use thiserror::Error;

/// Failures raised while moving frames across a connection.
///
/// Every variant is fatal to the connection it occurred on.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Peer closed the stream before the requested byte count arrived.
    #[error("peer closed the connection after {received} of {expected} bytes")]
    Closed {
        /// Bytes the transfer asked for.
        expected: usize,
        /// Bytes that arrived before the close.
        received: usize,
    },

    /// The underlying channel reported an error.
    #[error("transport I/O failed: {0}")]
    Io(#[from] io::Error),

    /// A declared or outgoing length exceeds the permitted frame size.
    #[error("frame of {size} bytes exceeds the {limit} byte limit")]
    TooLarge {
        /// Length of the offending frame.
        size: usize,
        /// Largest length allowed.
        limit: usize,
    },

    /// A string frame did not hold UTF-8 text.
    #[error("string frame is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),
}

impl TransportError {
    /// Returns `true` when the peer hung up mid-transfer.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }
}
