//! Operator signals that stop the daemon or reload its handlers.

use std::io;
use std::sync::{Mutex, PoisonError};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// What the operator asked the daemon to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Stop accepting connections, drain and exit.
    Shutdown,
    /// Reload every configured handler in place.
    Reload,
}

/// Source of operator control events.
pub trait ControlSignals: Send + Sync {
    /// Blocks until the next control event arrives.
    ///
    /// # Errors
    ///
    /// Returns a [`ShutdownError`] when the source can no longer deliver
    /// events.
    fn next_event(&self) -> Result<ControlEvent, ShutdownError>;
}

/// Errors reported by control signal sources.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The signal stream ended without a shutdown request.
    #[error("signal stream closed")]
    Closed,
}

/// Control events driven by process signals.
///
/// `SIGTERM`, `SIGINT` and `SIGQUIT` request shutdown; `SIGHUP` requests a
/// handler reload.
#[derive(Debug)]
pub struct SystemControlSignals {
    signals: Mutex<Signals>,
}

impl SystemControlSignals {
    /// Installs the signal handlers.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::Install`] when registration fails.
    pub fn install() -> Result<Self, ShutdownError> {
        let signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        Ok(Self {
            signals: Mutex::new(signals),
        })
    }
}

impl ControlSignals for SystemControlSignals {
    fn next_event(&self) -> Result<ControlEvent, ShutdownError> {
        let mut signals = self.signals.lock().unwrap_or_else(PoisonError::into_inner);
        let signal = signals.forever().next().ok_or(ShutdownError::Closed)?;
        let event = if signal == SIGHUP {
            ControlEvent::Reload
        } else {
            ControlEvent::Shutdown
        };
        info!(
            target: PROCESS_TARGET,
            signal,
            ?event,
            "control signal received"
        );
        Ok(event)
    }
}
