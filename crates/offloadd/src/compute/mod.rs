//! The compute handler capability invoked once per batch.
//!
//! A [`ComputeHandler`] receives every input of a batch at once, in
//! submission order, together with an [`OutputSlots`] value holding one output
//! buffer per input. Handlers size each output independently through
//! [`OutputSlots::allocate`] and may leave slots they produce nothing for
//! untouched. Output `i` always answers input `i`.
//!
//! Handlers are created by name through a [`HandlerFactory`]; the daemon ships
//! [`BuiltinHandlerFactory`] so it is usable without external plugins.

mod builtin;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

pub use self::builtin::BuiltinHandlerFactory;

/// A named, pluggable compute capability.
pub trait ComputeHandler: Send + Sync {
    /// Processes one batch.
    ///
    /// # Errors
    ///
    /// Returning an error fails every request in the batch with the same
    /// message; no request in a failed batch receives output.
    fn process(&self, inputs: &[&[u8]], outputs: &mut OutputSlots<'_>) -> Result<(), HandlerError>;
}

/// Resolves handler names to fresh handler instances.
#[cfg_attr(test, mockall::automock)]
pub trait HandlerFactory: Send + Sync {
    /// Creates the handler registered under `name`, or `None` if the name is
    /// unknown to this factory.
    fn create(&self, name: &str) -> Option<Box<dyn ComputeHandler>>;
}

/// Output buffers for one batch, indexed like the batch inputs.
#[derive(Debug)]
pub struct OutputSlots<'a> {
    slots: &'a mut [Vec<u8>],
}

impl<'a> OutputSlots<'a> {
    /// Wraps the batch's output buffers.
    pub fn new(slots: &'a mut [Vec<u8>]) -> Self {
        Self { slots }
    }

    /// Number of slots, equal to the batch size.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` for an empty batch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Sizes slot `index` to `size` zeroed bytes and returns it for writing.
    ///
    /// A `size` of zero allocates nothing and yields `None`; the slot keeps
    /// whatever it held before. Allocating the same slot twice resizes it.
    ///
    /// # Errors
    ///
    /// Returns a [`HandlerError`] when `index` is outside the batch.
    pub fn allocate(&mut self, index: usize, size: usize) -> Result<Option<&mut [u8]>, HandlerError> {
        let batch_size = self.slots.len();
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            HandlerError::new(format!(
                "output index {index} is out of range for a batch of {batch_size}"
            ))
        })?;
        if size == 0 {
            return Ok(None);
        }
        slot.clear();
        slot.resize(size, 0);
        Ok(Some(slot.as_mut_slice()))
    }
}

/// Failure reported by a compute handler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Builds an error from a human-readable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message surfaced verbatim to every client in the batch.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|text| (*text).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_owned());
        Self::new(format!("handler panicked: {detail}"))
    }
}

/// Runs `handler` over one batch, converting a panic into a [`HandlerError`].
pub(crate) fn invoke(
    handler: &dyn ComputeHandler,
    inputs: &[&[u8]],
    outputs: &mut [Vec<u8>],
) -> Result<(), HandlerError> {
    let mut slots = OutputSlots::new(outputs);
    panic::catch_unwind(AssertUnwindSafe(|| handler.process(inputs, &mut slots)))
        .unwrap_or_else(|payload| Err(HandlerError::from_panic(payload.as_ref())))
}
