//! Accepted streams and the trait that serves them.

use std::io::{self, Read, Write};
use std::net::TcpStream;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// Stream accepted by the listener.
#[derive(Debug)]
pub enum ConnectionStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl ConnectionStream {
    /// Switches the stream back to blocking mode for its serving thread.
    pub(crate) fn into_blocking(self) -> io::Result<Self> {
        match &self {
            Self::Tcp(stream) => {
                stream.set_nonblocking(false)?;
                // Responses are written as several small frames.
                stream.set_nodelay(true)?;
            }
            #[cfg(unix)]
            Self::Unix(stream) => stream.set_nonblocking(false)?,
        }
        Ok(self)
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

/// Serves accepted connections.
///
/// The listener calls [`ConnectionHandler::handle`] on a dedicated thread per
/// connection; the call owns the stream until it returns. Implementations
/// should report failures through logging rather than panicking.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Serves one connection until the peer disconnects or an error occurs.
    fn handle(&self, stream: ConnectionStream);
}
