//! Defines the unified error surface for daemon launch and supervision.

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::dispatch::WorkerError;
use crate::sinks::SinkError;
use crate::transport::ListenerError;

use super::signals::ShutdownError;

/// Errors surfaced while launching or supervising the daemon process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrapping the daemon failed.
    #[error("daemon bootstrap failed: {source}")]
    Bootstrap {
        #[source]
        source: BootstrapError,
    },
    /// A configured log file could not be opened.
    #[error("failed to open record sink: {source}")]
    Sink {
        #[source]
        source: SinkError,
    },
    /// The socket listener could not be bound, started or joined.
    #[error("daemon socket listener failed: {source}")]
    Listener {
        #[source]
        source: ListenerError,
    },
    /// The dispatch worker could not be started or stopped.
    #[error("dispatch worker failed: {source}")]
    Worker {
        #[source]
        source: WorkerError,
    },
    /// Waiting for control signals failed.
    #[error("failed to await control signals: {source}")]
    Shutdown {
        #[source]
        source: ShutdownError,
    },
}

impl From<BootstrapError> for LaunchError {
    fn from(source: BootstrapError) -> Self {
        Self::Bootstrap { source }
    }
}

impl From<SinkError> for LaunchError {
    fn from(source: SinkError) -> Self {
        Self::Sink { source }
    }
}

impl From<ListenerError> for LaunchError {
    fn from(source: ListenerError) -> Self {
        Self::Listener { source }
    }
}

impl From<WorkerError> for LaunchError {
    fn from(source: WorkerError) -> Self {
        Self::Worker { source }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}
