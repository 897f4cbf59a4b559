//! Byte-exact reads and writes over a blocking stream.
//!
//! A transfer of `N` bytes either moves exactly `N` bytes or fails. Partial
//! transfers are retried internally and `Interrupted` errors are retried
//! transparently. A zero-length read before the transfer completes means the
//! peer closed the connection and is reported as [`TransportError::Closed`],
//! never as a short success.

use std::io::{self, Read, Write};

use crate::error::TransportError;

/// Fills `buf` completely from `reader`.
///
/// # Errors
///
/// Returns [`TransportError::Closed`] when the peer closes the stream early
/// and [`TransportError::Io`] for any other channel failure.
pub fn read_exact<R>(reader: &mut R, buf: &mut [u8]) -> Result<(), TransportError>
where
    R: Read + ?Sized,
{
    fill(reader, buf, 0)
}

/// Fills `buf` completely, or reports a clean close before any byte arrived.
///
/// Returns `Ok(false)` only when the peer closed the stream without sending a
/// single byte of this transfer; this is how a connection ends between
/// exchanges. A close after the first byte is still a transport failure.
///
/// # Errors
///
/// As [`read_exact`], once at least one byte has been received.
pub fn read_exact_or_eof<R>(reader: &mut R, buf: &mut [u8]) -> Result<bool, TransportError>
where
    R: Read + ?Sized,
{
    if buf.is_empty() {
        return Ok(true);
    }
    let first = read_with_retry(reader, buf)?;
    if first == 0 {
        return Ok(false);
    }
    fill(reader, buf, first)?;
    Ok(true)
}

/// Writes all of `buf` to `writer`.
///
/// # Errors
///
/// Returns [`TransportError::Closed`] when the channel stops accepting bytes
/// and [`TransportError::Io`] for any other channel failure.
pub fn write_all<W>(writer: &mut W, buf: &[u8]) -> Result<(), TransportError>
where
    W: Write + ?Sized,
{
    let mut sent = 0;
    while let Some(remaining) = buf.get(sent..).filter(|rest| !rest.is_empty()) {
        match writer.write(remaining) {
            Ok(0) => {
                return Err(TransportError::Closed {
                    expected: buf.len(),
                    received: sent,
                });
            }
            Ok(written) => sent += written,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(TransportError::Io(error)),
        }
    }
    Ok(())
}

fn fill<R>(reader: &mut R, buf: &mut [u8], mut filled: usize) -> Result<(), TransportError>
where
    R: Read + ?Sized,
{
    let expected = buf.len();
    while let Some(remaining) = buf.get_mut(filled..).filter(|rest| !rest.is_empty()) {
        let received = read_with_retry(reader, remaining)?;
        if received == 0 {
            return Err(TransportError::Closed {
                expected,
                received: filled,
            });
        }
        filled += received;
    }
    Ok(())
}

fn read_with_retry<R>(reader: &mut R, buf: &mut [u8]) -> Result<usize, TransportError>
where
    R: Read + ?Sized,
{
    loop {
        match reader.read(buf) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(TransportError::Io(error)),
        }
    }
}
