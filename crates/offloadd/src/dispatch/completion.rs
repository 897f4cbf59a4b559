//! One-shot completion shared by a submitter and the worker.
//!
//! [`channel`] creates a linked pair: the worker keeps the [`Completion`] and
//! settles it exactly once, the submitting connection thread blocks on the
//! [`Pending`] until the outcome is published. Settling consumes the
//! completion, so a request cannot be answered twice, and dropping an
//! unsettled completion rejects the request rather than leaving its client
//! blocked forever.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use super::errors::JobFailure;

/// Result delivered to a waiting submitter.
pub type JobOutcome = Result<Vec<u8>, JobFailure>;

#[derive(Debug, Default)]
struct Slot {
    outcome: Mutex<Option<JobOutcome>>,
    ready: Condvar,
}

impl Slot {
    fn lock(&self) -> MutexGuard<'_, Option<JobOutcome>> {
        // A poisoned slot still holds a coherent Option; the worker never
        // panics while holding it.
        self.outcome.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, outcome: JobOutcome) {
        let mut guard = self.lock();
        if guard.is_none() {
            *guard = Some(outcome);
        }
        drop(guard);
        self.ready.notify_all();
    }
}

/// Creates a linked completion pair.
#[must_use]
pub fn channel() -> (Completion, Pending) {
    let slot = Arc::new(Slot::default());
    (
        Completion {
            slot: Some(Arc::clone(&slot)),
        },
        Pending { slot },
    )
}

/// Worker half of a request's completion.
#[derive(Debug)]
pub struct Completion {
    slot: Option<Arc<Slot>>,
}

impl Completion {
    /// Publishes the handler output and wakes the submitter.
    pub fn fulfil(mut self, output: Vec<u8>) {
        self.settle(Ok(output));
    }

    /// Publishes a failure and wakes the submitter.
    pub fn reject(mut self, failure: JobFailure) {
        self.settle(Err(failure));
    }

    fn settle(&mut self, outcome: JobOutcome) {
        if let Some(slot) = self.slot.take() {
            slot.publish(outcome);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.settle(Err(JobFailure::abandoned()));
    }
}

/// Submitter half of a request's completion.
#[derive(Debug)]
pub struct Pending {
    slot: Arc<Slot>,
}

impl Pending {
    /// Blocks until the worker settles the request.
    pub fn wait(self) -> JobOutcome {
        let guard = self.slot.lock();
        let mut guard = self
            .slot
            .ready
            .wait_while(guard, |outcome| outcome.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        guard.take().unwrap_or_else(|| Err(JobFailure::abandoned()))
    }

    /// Returns `true` once the outcome has been published.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.slot.lock().is_some()
    }
}
