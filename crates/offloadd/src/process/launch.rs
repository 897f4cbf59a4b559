//! Supervises daemon launch sequencing and runtime orchestration.

use std::sync::Arc;

use tracing::{info, warn};

use crate::bootstrap::{ConfigLoader, Daemon, SystemConfigLoader, bootstrap_with};
use crate::compute::{BuiltinHandlerFactory, HandlerFactory};
use crate::dispatch::{BatchQueue, DispatchConnectionHandler, Dispatcher, WorkerHandle};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::sinks;
use crate::transport::{ListenerHandle, SocketListener};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::signals::{ControlEvent, ControlSignals, SystemControlSignals};

/// Collaborators required to launch the daemon runtime.
pub(crate) struct LaunchPlan<L, S> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) factory: Arc<dyn HandlerFactory>,
    pub(crate) signals: S,
}

/// Runs the daemon with the production collaborators until a shutdown
/// signal arrives.
///
/// # Errors
///
/// Returns a [`LaunchError`] when any startup step fails or the runtime
/// cannot be stopped cleanly.
pub fn run_daemon() -> Result<(), LaunchError> {
    let plan = LaunchPlan {
        loader: SystemConfigLoader,
        reporter: Arc::new(StructuredHealthReporter::new()),
        factory: Arc::new(BuiltinHandlerFactory),
        signals: SystemControlSignals::install()?,
    };
    run_daemon_with(plan)
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with<L, S>(plan: LaunchPlan<L, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ControlSignals,
{
    let LaunchPlan {
        loader,
        reporter,
        factory,
        signals,
    } = plan;

    let daemon = bootstrap_with(&loader, reporter, factory)?;
    let config = daemon.config();
    let perf = sinks::perf_sink(config)?;
    let data = sinks::data_sink(config)?;
    let listener = SocketListener::bind(config.daemon_socket())?;

    let queue = Arc::new(BatchQueue::new());
    let registry = Arc::clone(daemon.registry());
    let worker = WorkerHandle::spawn(Dispatcher::new(
        Arc::clone(&queue),
        Arc::clone(&registry),
        perf,
    ))?;
    daemon.reporter().worker_started();

    let handler = Arc::new(DispatchConnectionHandler::new(queue, registry, data));
    let listener = match listener.start(handler) {
        Ok(handle) => handle,
        Err(error) => {
            stop_worker(&daemon, worker);
            return Err(error.into());
        }
    };
    info!(
        target: PROCESS_TARGET,
        endpoint = %config.daemon_socket(),
        "daemon ready"
    );

    let served = serve_until_shutdown(&daemon, &signals);
    let stopped = shutdown(&daemon, listener, worker);
    served?;
    stopped?;
    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    Ok(())
}

fn serve_until_shutdown<S: ControlSignals>(daemon: &Daemon, signals: &S) -> Result<(), LaunchError> {
    loop {
        match signals.next_event()? {
            ControlEvent::Shutdown => return Ok(()),
            ControlEvent::Reload => {
                let loaded = daemon.reload_handlers();
                info!(
                    target: PROCESS_TARGET,
                    loaded,
                    configured = daemon.config().handlers().len(),
                    "handlers reloaded"
                );
            }
        }
    }
}

/// Stops accepting connections first, then interrupts the queue so queued
/// jobs are rejected and the worker exits after its current batch.
fn shutdown(daemon: &Daemon, listener: ListenerHandle, worker: WorkerHandle) -> Result<(), LaunchError> {
    listener.shutdown();
    let joined = listener.join();
    stop_worker(daemon, worker);
    joined?;
    Ok(())
}

fn stop_worker(daemon: &Daemon, worker: WorkerHandle) {
    match worker.stop() {
        Ok(()) => daemon.reporter().worker_stopped(),
        Err(error) => warn!(
            target: PROCESS_TARGET,
            %error,
            "dispatch worker did not stop cleanly"
        ),
    }
}
