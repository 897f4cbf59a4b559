//! Job admission, batching and execution.
//!
//! Connection threads run [`DispatchConnectionHandler`], which fast-fails
//! unknown handler names and otherwise pushes each job onto the shared
//! [`BatchQueue`] before blocking on the job's [`Pending`] completion. A
//! single worker thread runs [`Dispatcher::run`], popping one batch at a
//! time, invoking the batch's handler from the [`HandlerRegistry`] exactly
//! once, and settling every job in the batch.

mod completion;
mod errors;
mod handler;
mod queue;
mod registry;
mod worker;

pub use self::completion::{Completion, JobOutcome, Pending, channel};
pub use self::errors::{JobFailure, QueueError, RegistryError, WorkerError};
pub use self::handler::DispatchConnectionHandler;
pub use self::queue::{Batch, BatchQueue, Job};
pub use self::registry::HandlerRegistry;
pub use self::worker::{Dispatcher, WorkerHandle};

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
