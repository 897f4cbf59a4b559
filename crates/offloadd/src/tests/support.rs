//! Shared fixtures for the behavioural suites: recording observers, test
//! configuration loaders, scripted control signals and controllable compute
//! handlers.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use offload_config::{Config, SocketEndpoint};

use crate::bootstrap::{BootstrapError, ConfigLoader};
use crate::compute::{BuiltinHandlerFactory, ComputeHandler, HandlerError, HandlerFactory, OutputSlots};
use crate::dispatch::RegistryError;
use crate::health::HealthReporter;
use crate::process::{ControlEvent, ControlSignals, ShutdownError};

/// Upper bound for any polling loop in the suites.
pub const WAIT_LIMIT: Duration = Duration::from_secs(5);

/// Polls `condition` until it holds or [`WAIT_LIMIT`] elapses.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT_LIMIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}

/// Loader that provisions a Unix socket path under a temporary directory.
#[derive(Clone)]
pub struct TestConfigLoader {
    socket_dir: Arc<TempDir>,
    handlers: Vec<String>,
}

impl TestConfigLoader {
    pub fn new(handlers: &[&str]) -> Self {
        let dir = TempDir::new().expect("failed to create temporary directory for socket");
        Self {
            socket_dir: Arc::new(dir),
            handlers: handlers.iter().map(|name| (*name).to_owned()).collect(),
        }
    }

    pub fn handlers(&self) -> &[String] {
        &self.handlers
    }

    pub fn socket_path(&self) -> std::path::PathBuf {
        self.socket_dir.path().join("offloadd.sock")
    }

    pub fn endpoint(&self) -> SocketEndpoint {
        let path = self.socket_path();
        SocketEndpoint::unix(
            path.to_str()
                .expect("temporary socket path was not valid UTF-8"),
        )
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            daemon_socket: self.endpoint(),
            handlers: self.handlers.clone(),
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing an unusable endpoint.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("offloadd"),
            OsString::from("--daemon-socket"),
            OsString::from("invalid://socket"),
        ];
        Config::load_from_iter(args)
    }
}

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    HandlerLoaded(String),
    /// A handler failed to load with an error description.
    HandlerLoadFailed(String),
    WorkerStarted,
    WorkerStopped,
}

/// Records health events for assertions.
#[derive(Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Counts recorded events equal to `event`.
    pub fn count(&self, event: &HealthEvent) -> usize {
        self.events().iter().filter(|seen| *seen == event).count()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn handler_loaded(&self, name: &str) {
        self.record(HealthEvent::HandlerLoaded(name.to_owned()));
    }

    fn handler_load_failed(&self, error: &RegistryError) {
        self.record(HealthEvent::HandlerLoadFailed(error.to_string()));
    }

    fn worker_started(&self) {
        self.record(HealthEvent::WorkerStarted);
    }

    fn worker_stopped(&self) {
        self.record(HealthEvent::WorkerStopped);
    }
}

/// Control events fed by the test instead of the operating system.
#[derive(Clone, Default)]
pub struct ScriptedSignals {
    inner: Arc<(Mutex<VecDeque<ControlEvent>>, Condvar)>,
}

impl ScriptedSignals {
    pub fn send(&self, event: ControlEvent) {
        let (lock, cvar) = &*self.inner;
        lock.lock()
            .expect("signal queue mutex poisoned")
            .push_back(event);
        cvar.notify_all();
    }
}

impl ControlSignals for ScriptedSignals {
    fn next_event(&self) -> Result<ControlEvent, ShutdownError> {
        let (lock, cvar) = &*self.inner;
        let mut events = cvar
            .wait_while(
                lock.lock().expect("signal queue mutex poisoned"),
                |events| events.is_empty(),
            )
            .expect("signal queue mutex poisoned during wait");
        events.pop_front().ok_or(ShutdownError::Closed)
    }
}

/// A latch that holds the worker inside a handler until opened, so the test
/// controls what accumulates in the queue meanwhile.
#[derive(Clone, Default)]
pub struct Gate {
    state: Arc<(Mutex<GateState>, Condvar)>,
}

#[derive(Default)]
struct GateState {
    open: bool,
    entered: usize,
    batch_sizes: Vec<usize>,
}

impl Gate {
    pub fn open(&self) {
        let (lock, cvar) = &*self.state;
        lock.lock().expect("gate mutex poisoned").open = true;
        cvar.notify_all();
    }

    /// Number of batches that have reached the handler so far.
    pub fn entered(&self) -> usize {
        self.state.0.lock().expect("gate mutex poisoned").entered
    }

    /// Batch sizes observed by the handler, in execution order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.state
            .0
            .lock()
            .expect("gate mutex poisoned")
            .batch_sizes
            .clone()
    }

    fn pass(&self, batch_size: usize) {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock().expect("gate mutex poisoned");
        state.entered += 1;
        state.batch_sizes.push(batch_size);
        let state = cvar
            .wait_while(state, |state| !state.open)
            .expect("gate mutex poisoned during wait");
        drop(state);
    }
}

/// Upper-cases each input once the gate is open.
struct GatedHandler {
    gate: Gate,
}

impl ComputeHandler for GatedHandler {
    fn process(&self, inputs: &[&[u8]], outputs: &mut OutputSlots<'_>) -> Result<(), HandlerError> {
        self.gate.pass(inputs.len());
        for (index, input) in inputs.iter().enumerate() {
            if let Some(slot) = outputs.allocate(index, input.len())? {
                slot.copy_from_slice(&input.to_ascii_uppercase());
            }
        }
        Ok(())
    }
}

/// Always fails with a fixed message.
struct BrokenHandler;

impl ComputeHandler for BrokenHandler {
    fn process(&self, _: &[&[u8]], _: &mut OutputSlots<'_>) -> Result<(), HandlerError> {
        Err(HandlerError::new("device lost"))
    }
}

/// Factory adding `gate` and `broken` to the built-in handlers.
#[derive(Clone, Default)]
pub struct TestHandlerFactory {
    pub gate: Gate,
}

impl HandlerFactory for TestHandlerFactory {
    fn create(&self, name: &str) -> Option<Box<dyn ComputeHandler>> {
        match name {
            "gate" => Some(Box::new(GatedHandler {
                gate: self.gate.clone(),
            })),
            "broken" => Some(Box::new(BrokenHandler)),
            other => BuiltinHandlerFactory.create(other),
        }
    }
}
