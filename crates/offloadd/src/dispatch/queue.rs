//! Batching admission queue shared by connection threads and the worker.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::DISPATCH_TARGET;
use super::completion::{self, Completion, Pending};
use super::errors::{JobFailure, QueueError};

/// A request admitted to the queue.
#[derive(Debug)]
pub struct Job {
    handler: String,
    input: Arc<[u8]>,
    completion: Completion,
}

impl Job {
    /// Input bytes supplied by the client.
    #[must_use]
    pub fn input(&self) -> &[u8] {
        &self.input
    }

    /// Splits the job into its input and the completion the worker settles.
    pub fn into_parts(self) -> (Arc<[u8]>, Completion) {
        (self.input, self.completion)
    }
}

/// Jobs sharing one handler name, in admission order.
#[derive(Debug)]
pub struct Batch {
    handler: String,
    jobs: Vec<Job>,
}

impl Batch {
    /// Handler every job in the batch targets.
    #[must_use]
    pub fn handler(&self) -> &str {
        self.handler.as_str()
    }

    /// Jobs in admission order.
    #[must_use]
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Number of jobs in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Returns `true` when the batch holds no jobs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Consumes the batch, yielding its handler name and jobs.
    pub fn into_parts(self) -> (String, Vec<Job>) {
        (self.handler, self.jobs)
    }
}

#[derive(Debug, Default)]
struct QueueState {
    jobs: VecDeque<Job>,
    interrupted: bool,
}

/// Multi-producer, single-consumer queue that groups jobs by handler.
///
/// [`BatchQueue::pop_batch`] takes the oldest job together with every other
/// queued job for the same handler. Nothing waits for more jobs to arrive:
/// the batch is whatever accumulated while the worker was busy.
#[derive(Debug, Default)]
pub struct BatchQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl BatchQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admits a job and wakes the worker.
    ///
    /// After [`BatchQueue::interrupt`] the job is rejected immediately with
    /// "server stopped".
    pub fn push(&self, handler: impl Into<String>, input: Arc<[u8]>) -> Pending {
        let (completion, pending) = completion::channel();
        let job = Job {
            handler: handler.into(),
            input,
            completion,
        };
        let mut state = self.lock();
        if state.interrupted {
            drop(state);
            job.completion.reject(JobFailure::stopped());
            return pending;
        }
        state.jobs.push_back(job);
        drop(state);
        self.available.notify_one();
        pending
    }

    /// Blocks until a job is queued, then removes the oldest job and every
    /// other queued job for the same handler.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Interrupted`] once the queue has been
    /// interrupted, whether the caller was already waiting or not.
    pub fn pop_batch(&self) -> Result<Batch, QueueError> {
        let guard = self.lock();
        let mut state = self
            .available
            .wait_while(guard, |state| state.jobs.is_empty() && !state.interrupted)
            .unwrap_or_else(PoisonError::into_inner);
        if state.interrupted {
            return Err(QueueError::Interrupted);
        }
        let Some(head) = state.jobs.pop_front() else {
            return Err(QueueError::Interrupted);
        };

        let handler = head.handler.clone();
        let mut jobs = vec![head];
        let mut remaining = VecDeque::with_capacity(state.jobs.len());
        for job in state.jobs.drain(..) {
            if job.handler == handler {
                jobs.push(job);
            } else {
                remaining.push_back(job);
            }
        }
        state.jobs = remaining;
        let queued = state.jobs.len();
        drop(state);

        debug!(
            target: DISPATCH_TARGET,
            handler = %handler,
            batch_size = jobs.len(),
            queued,
            "batch formed"
        );
        Ok(Batch { handler, jobs })
    }

    /// Stops the queue.
    ///
    /// Every queued job is rejected with "server stopped", the worker is woken
    /// and later pushes are rejected on arrival.
    pub fn interrupt(&self) {
        let mut state = self.lock();
        state.interrupted = true;
        let drained: Vec<Job> = state.jobs.drain(..).collect();
        drop(state);
        self.available.notify_all();

        if !drained.is_empty() {
            debug!(
                target: DISPATCH_TARGET,
                rejected = drained.len(),
                "rejecting queued jobs on interrupt"
            );
        }
        for job in drained {
            job.completion.reject(JobFailure::stopped());
        }
    }

    /// Number of jobs waiting for the worker.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    /// Returns `true` when no jobs are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
