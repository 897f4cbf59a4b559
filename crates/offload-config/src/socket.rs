//! Socket endpoints shared by the daemon listener and the client.

use std::fmt;
use std::fs::DirBuilder;
use std::io;
use std::str::FromStr;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Where the offload daemon accepts connections.
///
/// Serialised as a tagged table so configuration files read
/// `daemon_socket = { transport = "tcp", host = "127.0.0.1", port = 9870 }`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum SocketEndpoint {
    /// Unix domain socket.
    Unix {
        /// Filesystem location of the socket.
        path: Utf8PathBuf,
    },
    /// TCP socket.
    Tcp {
        /// Host name or address to bind or dial.
        host: String,
        /// Port number.
        port: u16,
    },
}

impl SocketEndpoint {
    /// Builds a Unix domain socket endpoint.
    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// Builds a TCP socket endpoint.
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Creates the parent directory of a Unix socket with mode 0700.
    ///
    /// TCP endpoints are left alone.
    pub fn prepare_filesystem(&self) -> Result<(), SocketPreparationError> {
        let Self::Unix { path } = self else {
            return Ok(());
        };
        let parent = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .ok_or_else(|| SocketPreparationError::MissingParent { path: path.clone() })?;

        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        std::os::unix::fs::DirBuilderExt::mode(&mut builder, 0o700);

        match builder.create(parent.as_std_path()) {
            Err(source) if source.kind() != io::ErrorKind::AlreadyExists => {
                Err(SocketPreparationError::CreateDirectory {
                    path: parent.to_path_buf(),
                    source,
                })
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for SocketEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix { path } => write!(formatter, "unix://{path}"),
            Self::Tcp { host, port } => write!(formatter, "tcp://{host}:{port}"),
        }
    }
}

impl FromStr for SocketEndpoint {
    type Err = SocketParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input)?;
        let incomplete = || SocketParseError::Incomplete(input.to_owned());
        match url.scheme() {
            "unix" if url.path().is_empty() => Err(incomplete()),
            "unix" => Ok(Self::unix(url.path())),
            "tcp" => {
                let host = url.host_str().ok_or_else(incomplete)?;
                let port = url.port().ok_or_else(incomplete)?;
                Ok(Self::tcp(host, port))
            }
            other => Err(SocketParseError::UnsupportedScheme(other.to_owned())),
        }
    }
}

/// Reasons a `--daemon-socket` value was refused.
#[derive(Debug, Error)]
pub enum SocketParseError {
    /// Only `unix` and `tcp` endpoints are served.
    #[error("unsupported socket scheme '{0}'")]
    UnsupportedScheme(String),
    /// A TCP endpoint lacked its host or port, or a Unix endpoint its path.
    #[error("incomplete socket endpoint '{0}'")]
    Incomplete(String),
    /// Input was not a URL.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

/// Failures creating the directory that holds a Unix socket.
#[derive(Debug, Error)]
pub enum SocketPreparationError {
    /// A bare file name leaves nowhere to create.
    #[error("socket path '{path}' has no parent directory")]
    MissingParent {
        /// Socket path as configured.
        path: Utf8PathBuf,
    },
    /// Directory creation failed for a reason other than it existing.
    #[error("failed to create socket directory '{path}': {source}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}
