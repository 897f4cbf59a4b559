//! The single worker that drains the batch queue.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::compute;
use crate::sinks::{PerfRecord, PerfSink};

use super::DISPATCH_TARGET;
use super::completion::Completion;
use super::errors::{JobFailure, QueueError, WorkerError};
use super::queue::{Batch, BatchQueue, Job};
use super::registry::HandlerRegistry;

const WORKER_THREAD_NAME: &str = "offload-worker";

/// Runs batches one at a time until the queue is interrupted.
pub struct Dispatcher {
    queue: Arc<BatchQueue>,
    registry: Arc<HandlerRegistry>,
    perf: Arc<dyn PerfSink>,
}

impl Dispatcher {
    /// Creates a dispatcher over shared state.
    pub fn new(
        queue: Arc<BatchQueue>,
        registry: Arc<HandlerRegistry>,
        perf: Arc<dyn PerfSink>,
    ) -> Self {
        Self {
            queue,
            registry,
            perf,
        }
    }

    /// Pops and executes batches until [`BatchQueue::interrupt`] is called.
    pub fn run(&self) {
        info!(target: DISPATCH_TARGET, "dispatch loop started");
        loop {
            match self.queue.pop_batch() {
                Ok(batch) => self.execute(batch),
                Err(QueueError::Interrupted) => break,
            }
        }
        info!(target: DISPATCH_TARGET, "dispatch loop stopped");
    }

    /// Invokes the batch's handler once and settles every job in the batch.
    ///
    /// A missing handler or a handler failure rejects every job with the same
    /// message. One performance record is emitted either way.
    pub fn execute(&self, batch: Batch) {
        let (handler_name, jobs) = batch.into_parts();
        let (inputs, completions): (Vec<Arc<[u8]>>, Vec<Completion>) =
            jobs.into_iter().map(Job::into_parts).unzip();
        let input_refs: Vec<&[u8]> = inputs.iter().map(AsRef::as_ref).collect();
        let mut outputs = vec![Vec::new(); inputs.len()];

        let started = Instant::now();
        let result = match self.registry.get(&handler_name) {
            Some(handler) => compute::invoke(handler.as_ref(), &input_refs, &mut outputs)
                .map_err(|error| JobFailure::handler(error.message())),
            None => Err(JobFailure::unknown_handler(
                self.registry.unknown_handler_message(&handler_name),
            )),
        };
        let seconds = started.elapsed().as_secs_f64();

        let input_bytes = inputs.iter().map(|input| input.len()).sum();
        let output_bytes = outputs.iter().map(Vec::len).sum();
        let record = PerfRecord::now(
            handler_name.as_str(),
            seconds,
            input_bytes,
            output_bytes,
            completions.len(),
        );
        if let Err(error) = self.perf.record(&record) {
            warn!(
                target: DISPATCH_TARGET,
                %error,
                handler = %handler_name,
                "failed to record batch performance"
            );
        }

        match result {
            Ok(()) => {
                for (completion, output) in completions.into_iter().zip(outputs) {
                    completion.fulfil(output);
                }
            }
            Err(failure) => {
                debug!(
                    target: DISPATCH_TARGET,
                    handler = %handler_name,
                    batch_size = completions.len(),
                    failure = %failure,
                    "batch failed"
                );
                for completion in completions {
                    completion.reject(failure.clone());
                }
            }
        }
    }
}

/// Handle to the running worker thread.
#[derive(Debug)]
pub struct WorkerHandle {
    queue: Arc<BatchQueue>,
    thread: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Starts `dispatcher` on a dedicated, named thread.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Spawn`] when the thread cannot be created.
    pub fn spawn(dispatcher: Dispatcher) -> Result<Self, WorkerError> {
        let queue = Arc::clone(&dispatcher.queue);
        let thread = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_owned())
            .spawn(move || dispatcher.run())
            .map_err(WorkerError::Spawn)?;
        Ok(Self {
            queue,
            thread: Some(thread),
        })
    }

    /// Interrupts the queue and waits for the worker to finish its current
    /// batch and exit.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::ThreadPanic`] when the worker thread panicked.
    pub fn stop(mut self) -> Result<(), WorkerError> {
        self.queue.interrupt();
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| WorkerError::ThreadPanic),
            None => Ok(()),
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.queue.interrupt();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use rstest::{fixture, rstest};

    use super::*;
    use crate::compute::{
        BuiltinHandlerFactory, ComputeHandler, HandlerError, HandlerFactory, OutputSlots,
    };
    use crate::sinks::SinkError;

    #[derive(Default)]
    struct RecordingPerf {
        records: Mutex<Vec<PerfRecord>>,
    }

    impl PerfSink for RecordingPerf {
        fn record(&self, record: &PerfRecord) -> Result<(), SinkError> {
            self.records.lock().expect("perf mutex").push(record.clone());
            Ok(())
        }
    }

    struct Failing;

    impl ComputeHandler for Failing {
        fn process(&self, _: &[&[u8]], _: &mut OutputSlots<'_>) -> Result<(), HandlerError> {
            Err(HandlerError::new("out of device memory"))
        }
    }

    struct Panicking;

    impl ComputeHandler for Panicking {
        fn process(&self, _: &[&[u8]], _: &mut OutputSlots<'_>) -> Result<(), HandlerError> {
            panic!("kernel fault");
        }
    }

    /// Builtins plus `crash` (panics) and `fft` (fails).
    struct FaultyFactory;

    impl HandlerFactory for FaultyFactory {
        fn create(&self, name: &str) -> Option<Box<dyn ComputeHandler>> {
            match name {
                "crash" => Some(Box::new(Panicking)),
                "fft" => Some(Box::new(Failing)),
                other => BuiltinHandlerFactory.create(other),
            }
        }
    }

    struct Fixture {
        queue: Arc<BatchQueue>,
        registry: Arc<HandlerRegistry>,
        perf: Arc<RecordingPerf>,
        dispatcher: Dispatcher,
    }

    #[fixture]
    fn fixture() -> Fixture {
        let queue = Arc::new(BatchQueue::new());
        let registry = Arc::new(HandlerRegistry::new(Arc::new(BuiltinHandlerFactory)));
        registry.load("reverse").expect("builtin");
        let perf = Arc::new(RecordingPerf::default());
        let dispatcher = Dispatcher::new(
            Arc::clone(&queue),
            Arc::clone(&registry),
            Arc::clone(&perf) as Arc<dyn PerfSink>,
        );
        Fixture {
            queue,
            registry,
            perf,
            dispatcher,
        }
    }

    fn bytes(text: &str) -> Arc<[u8]> {
        Arc::from(text.as_bytes())
    }

    #[rstest]
    fn outputs_align_with_inputs_and_one_record_is_emitted(fixture: Fixture) {
        let first = fixture.queue.push("reverse", bytes("abc"));
        let second = fixture.queue.push("reverse", bytes("hello"));
        let batch = fixture.queue.pop_batch().expect("batch");
        fixture.dispatcher.execute(batch);

        assert_eq!(first.wait(), Ok(b"cba".to_vec()));
        assert_eq!(second.wait(), Ok(b"olleh".to_vec()));
        let records = fixture.perf.records.lock().expect("perf mutex");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].handler, "reverse");
        assert_eq!(records[0].batch_size, 2);
        assert_eq!(records[0].input_bytes, 8);
        assert_eq!(records[0].output_bytes, 8);
    }

    #[rstest]
    fn handler_failure_rejects_the_whole_batch(fixture: Fixture) {
        let registry = HandlerRegistry::new(Arc::new({
            let mut factory = crate::compute::MockHandlerFactory::new();
            factory
                .expect_create()
                .returning(|_| Some(Box::new(Failing) as Box<dyn ComputeHandler>));
            factory
        }));
        registry.load("fft").expect("mocked");
        let dispatcher = Dispatcher::new(
            Arc::clone(&fixture.queue),
            Arc::new(registry),
            Arc::clone(&fixture.perf) as Arc<dyn PerfSink>,
        );

        let pending: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .map(|text| fixture.queue.push("fft", bytes(text)))
            .collect();
        dispatcher.execute(fixture.queue.pop_batch().expect("batch"));

        for request in pending {
            let failure = request.wait().expect_err("batch failed");
            assert_eq!(failure.message(), "out of device memory");
        }
        assert_eq!(fixture.perf.records.lock().expect("perf mutex").len(), 1);
    }

    #[rstest]
    fn handler_removed_after_admission_fails_per_request(fixture: Fixture) {
        let pending = fixture.queue.push("reverse", bytes("abc"));
        assert!(fixture.registry.unload("reverse"));
        fixture
            .dispatcher
            .execute(fixture.queue.pop_batch().expect("batch"));

        let failure = pending.wait().expect_err("handler missing");
        assert_eq!(
            failure.message(),
            "invalid handler name: reverse; valid handlers: ."
        );
    }

    #[rstest]
    fn stop_ends_the_loop_and_rejects_queued_work(fixture: Fixture) {
        let Fixture {
            queue, dispatcher, ..
        } = fixture;
        let worker = WorkerHandle::spawn(dispatcher).expect("spawn worker");
        let served = queue.push("reverse", bytes("ab"));
        assert_eq!(served.wait(), Ok(b"ba".to_vec()));

        worker.stop().expect("worker stops cleanly");
        let late = queue.push("reverse", bytes("cd"));
        assert_eq!(late.wait(), Err(JobFailure::stopped()));
    }

    #[rstest]
    fn running_worker_survives_failing_and_panicking_batches(fixture: Fixture) {
        let registry = Arc::new(HandlerRegistry::new(Arc::new(FaultyFactory)));
        for name in ["crash", "fft", "reverse"] {
            registry.load(name).expect("known handler");
        }
        let worker = WorkerHandle::spawn(Dispatcher::new(
            Arc::clone(&fixture.queue),
            registry,
            Arc::clone(&fixture.perf) as Arc<dyn PerfSink>,
        ))
        .expect("spawn worker");

        let crashed = fixture.queue.push("crash", bytes("abc")).wait();
        assert_eq!(
            crashed.expect_err("panic fails the batch").message(),
            "handler panicked: kernel fault"
        );
        let failed = fixture.queue.push("fft", bytes("abc")).wait();
        assert_eq!(
            failed.expect_err("error fails the batch").message(),
            "out of device memory"
        );
        let served = fixture.queue.push("reverse", bytes("abc")).wait();
        assert_eq!(served, Ok(b"cba".to_vec()));

        worker.stop().expect("worker stops cleanly");
        assert_eq!(fixture.perf.records.lock().expect("perf mutex").len(), 3);
    }
}
