//! Shared configuration for the offload daemon and its clients.
//!
//! Values are layered by `ortho_config`: built-in defaults, then an optional
//! TOML file (`--config-path` or `OFFLOAD_CONFIG_PATH`), then `OFFLOAD_*`
//! environment variables, then command-line flags.

mod defaults;
mod logging;
mod socket;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_TCP_PORT, default_log_filter_string, default_log_format,
    default_socket_endpoint,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Resolved configuration shared by `offloadd` and `offload`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "OFFLOAD")]
pub struct Config {
    /// Endpoint the daemon listens on and clients connect to.
    #[serde(default = "defaults::default_socket_endpoint")]
    #[ortho_config(default = defaults::default_socket_endpoint())]
    pub daemon_socket: SocketEndpoint,
    /// `tracing` filter expression.
    #[serde(default = "defaults::default_log_filter_string")]
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Output format for daemon logs.
    #[serde(default = "defaults::default_log_format")]
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
    /// Compute handlers loaded at startup and on reload.
    #[serde(default)]
    #[ortho_config(default = Vec::new(), merge_strategy = "replace")]
    pub handlers: Vec<String>,
    /// File receiving one JSON line per executed batch.
    #[serde(default)]
    pub perf_log: Option<Utf8PathBuf>,
    /// File receiving one framed record per completed request.
    #[serde(default)]
    pub data_log: Option<Utf8PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon_socket: default_socket_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            handlers: Vec::new(),
            perf_log: None,
            data_log: None,
        }
    }
}

impl Config {
    /// Endpoint the daemon binds and clients dial.
    #[must_use]
    pub fn daemon_socket(&self) -> &SocketEndpoint {
        &self.daemon_socket
    }

    /// Filter expression handed to the tracing subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Selected log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Names of the handlers to install, in configuration order.
    #[must_use]
    pub fn handlers(&self) -> &[String] {
        &self.handlers
    }

    /// Destination of the per-batch performance log, when file-backed.
    #[must_use]
    pub fn perf_log(&self) -> Option<&camino::Utf8Path> {
        self.perf_log.as_deref()
    }

    /// Destination of the per-request data log, when file-backed.
    #[must_use]
    pub fn data_log(&self) -> Option<&camino::Utf8Path> {
        self.data_log.as_deref()
    }
}
