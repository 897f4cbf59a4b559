//! The compute-offload daemon.
//!
//! Clients connect over the socket configured in [`offload_config`] and
//! submit named jobs: a handler name and an opaque payload. Jobs for the same
//! handler that queue up while the worker is busy are executed together as
//! one batch, so a handler pays its per-invocation cost (kernel launches,
//! device transfers) once per batch rather than once per job. Results and
//! timings flow back to each waiting client individually.
//!
//! ## Runtime shape
//!
//! - one thread per client connection runs
//!   [`DispatchConnectionHandler`], admitting jobs and blocking until they
//!   complete;
//! - exactly one worker thread runs [`Dispatcher::run`], so handlers never
//!   execute concurrently;
//! - a [`HandlerRegistry`] maps names to [`ComputeHandler`]s and supports
//!   reloading a handler while the daemon serves traffic (`SIGHUP`).
//!
//! A failing batch fails every job in it with the same message; nothing a
//! handler does can stop the worker. The only way to end the dispatch loop
//! is [`BatchQueue::interrupt`], which also rejects every job still queued.

mod bootstrap;
pub mod compute;
pub mod dispatch;
mod health;
mod process;
pub mod sinks;
pub mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, SystemConfigLoader, bootstrap_with,
};
pub use compute::{BuiltinHandlerFactory, ComputeHandler, HandlerError, HandlerFactory, OutputSlots};
pub use dispatch::{BatchQueue, DispatchConnectionHandler, Dispatcher, HandlerRegistry, JobFailure};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    ControlEvent, ControlSignals, LaunchError, ShutdownError, SystemControlSignals, run_daemon,
};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{ConnectionHandler, ConnectionStream, ListenerError, ListenerHandle, SocketListener};

#[cfg(test)]
mod tests;
