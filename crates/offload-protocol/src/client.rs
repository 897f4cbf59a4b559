//! Blocking client for submitting jobs to `offloadd`.

use std::io::{self, Read, Write};
use std::net::TcpStream;
#[cfg(unix)]
use std::os::unix::net::UnixStream;

use offload_config::SocketEndpoint;
use thiserror::Error;
use tracing::debug;

use crate::error::TransportError;
use crate::framing::Framed;
use crate::message::{JobResponse, write_request};

const CLIENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::client");

/// Errors surfaced to client callers.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The daemon endpoint could not be reached.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        /// Endpoint as configured.
        endpoint: String,
        /// Error from the socket layer.
        #[source]
        source: io::Error,
    },
    /// Unix endpoints were requested on a platform without them.
    #[error("unix sockets are unsupported for endpoint {endpoint}")]
    UnsupportedUnix {
        /// Endpoint as configured.
        endpoint: String,
    },
    /// The connection failed mid-exchange.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The daemon answered with a failure response.
    #[error("job rejected: {message}")]
    Rejected {
        /// Reason sent after the failure flag.
        message: String,
    },
}

/// Output of a successful job.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// Bytes produced by the handler.
    pub output: Vec<u8>,
    /// Seconds the daemon spent between admission and completion.
    pub elapsed: f64,
}

/// Connected stream to the daemon.
#[derive(Debug)]
pub enum ClientStream {
    /// TCP connection.
    Tcp(TcpStream),
    /// Unix domain socket connection.
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Read for ClientStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for ClientStream {
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

/// A connection that submits jobs one at a time.
///
/// # Example
///
/// ```rust,no_run
/// use offload_config::SocketEndpoint;
/// use offload_protocol::OffloadClient;
///
/// let endpoint = SocketEndpoint::tcp("127.0.0.1", 9870);
/// let mut client = OffloadClient::connect(&endpoint)?;
/// let submission = client.submit("reverse", b"abc")?;
/// assert_eq!(submission.output, b"cba");
/// # Ok::<(), offload_protocol::ClientError>(())
/// ```
#[derive(Debug)]
pub struct OffloadClient {
    framed: Framed<ClientStream>,
}

impl OffloadClient {
    /// Connects to the daemon at `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connect`] when the endpoint refuses the
    /// connection.
    pub fn connect(endpoint: &SocketEndpoint) -> Result<Self, ClientError> {
        let stream = match endpoint {
            SocketEndpoint::Tcp { host, port } => TcpStream::connect((host.as_str(), *port))
                .map(ClientStream::Tcp)
                .map_err(|source| ClientError::Connect {
                    endpoint: endpoint.to_string(),
                    source,
                })?,
            SocketEndpoint::Unix { path } => connect_unix(endpoint, path.as_std_path())?,
        };
        debug!(target: CLIENT_TARGET, %endpoint, "connected to daemon");
        Ok(Self::from_stream(stream))
    }

    /// Wraps an already connected stream.
    #[must_use]
    pub fn from_stream(stream: ClientStream) -> Self {
        Self {
            framed: Framed::new(stream),
        }
    }

    /// Submits `payload` to `handler` and waits for the response.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Rejected`] when the daemon answers with a
    /// failure response and [`ClientError::Transport`] when the exchange
    /// breaks down.
    pub fn submit(&mut self, handler: &str, payload: &[u8]) -> Result<Submission, ClientError> {
        write_request(&mut self.framed, handler, payload)?;
        match JobResponse::read_from(&mut self.framed)? {
            JobResponse::Success { output, elapsed } => Ok(Submission { output, elapsed }),
            JobResponse::Failure { message } => Err(ClientError::Rejected { message }),
        }
    }
}

#[cfg(unix)]
fn connect_unix(
    endpoint: &SocketEndpoint,
    path: &std::path::Path,
) -> Result<ClientStream, ClientError> {
    UnixStream::connect(path)
        .map(ClientStream::Unix)
        .map_err(|source| ClientError::Connect {
            endpoint: endpoint.to_string(),
            source,
        })
}

#[cfg(not(unix))]
fn connect_unix(
    endpoint: &SocketEndpoint,
    _path: &std::path::Path,
) -> Result<ClientStream, ClientError> {
    Err(ClientError::UnsupportedUnix {
        endpoint: endpoint.to_string(),
    })
}
