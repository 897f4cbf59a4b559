//! Values used when no file, environment variable or flag supplies one.

use camino::Utf8PathBuf;

use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

/// Loopback port the daemon serves on hosts without Unix sockets.
pub const DEFAULT_TCP_PORT: u16 = 9870;

/// Log filter applied when none is configured.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// File name of the daemon socket inside its runtime directory.
const SOCKET_FILE_NAME: &str = "offloadd.sock";

/// Owned [`DEFAULT_LOG_FILTER`], for serde and `ortho_config` defaults.
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Daemon logs are JSON unless configured otherwise.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Endpoint shared by `offloadd` and `offload` when nothing else is set.
///
/// On Unix this is `$XDG_RUNTIME_DIR/offload/offloadd.sock`. Without a
/// runtime directory the socket lives under the temp dir in a per-uid
/// subdirectory so users never collide.
#[cfg(unix)]
#[must_use]
pub fn default_socket_endpoint() -> SocketEndpoint {
    let runtime = dirs::runtime_dir().and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok());
    let directory = match runtime {
        Some(dir) => dir.join("offload"),
        None => {
            let temp = Utf8PathBuf::from_path_buf(std::env::temp_dir())
                .unwrap_or_else(|_| Utf8PathBuf::from("/tmp"));
            // SAFETY: geteuid has no preconditions and cannot fail.
            let uid = unsafe { libc::geteuid() };
            temp.join("offload").join(format!("uid-{uid}"))
        }
    };
    SocketEndpoint::unix(directory.join(SOCKET_FILE_NAME))
}

/// Endpoint shared by `offloadd` and `offload` when nothing else is set.
#[cfg(not(unix))]
#[must_use]
pub fn default_socket_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", DEFAULT_TCP_PORT)
}
