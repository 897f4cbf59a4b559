//! Error types for admission, registry and per-request failures.

use thiserror::Error;

/// Failure delivered to a single waiting request.
///
/// The message is surfaced verbatim to the client behind the failure flag.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct JobFailure {
    message: String,
}

impl JobFailure {
    /// The batch's handler failed; every request in the batch carries `message`.
    pub fn handler(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The handler was unloaded between admission and dispatch.
    pub(crate) fn unknown_handler(message: String) -> Self {
        Self { message }
    }

    /// The queue was interrupted before the request reached the worker.
    pub(crate) fn stopped() -> Self {
        Self {
            message: "server stopped".to_owned(),
        }
    }

    /// The worker dropped the request without answering it.
    pub(crate) fn abandoned() -> Self {
        Self {
            message: "request abandoned by worker".to_owned(),
        }
    }

    /// Human-readable failure text.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Terminal conditions reported by the batch queue.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The queue was interrupted; the dispatch loop should exit.
    #[error("batch queue interrupted")]
    Interrupted,
}

/// Errors surfaced while loading handlers into the registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The factory does not know the requested name.
    #[error("could not load handler '{name}'")]
    UnknownHandler { name: String },
}

/// Errors surfaced while starting or stopping the worker thread.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The operating system refused to spawn the worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
    /// The worker thread panicked outside a handler invocation.
    #[error("worker thread panicked")]
    ThreadPanic,
}
