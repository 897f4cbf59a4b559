//! Structured health reporting for daemon lifecycle events.

use std::sync::Arc;

use offload_config::Config;

use crate::bootstrap::BootstrapError;
use crate::dispatch::RegistryError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer for lifecycle events, injected so tests can record them.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked after a handler is installed in the registry.
    fn handler_loaded(&self, name: &str);

    /// Invoked when a handler cannot be loaded.
    fn handler_load_failed(&self, error: &RegistryError);

    /// Invoked once the worker thread is running.
    fn worker_started(&self);

    /// Invoked after the worker thread has exited.
    fn worker_stopped(&self);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn handler_loaded(&self, name: &str) {
        (**self).handler_loaded(name);
    }

    fn handler_load_failed(&self, error: &RegistryError) {
        (**self).handler_load_failed(error);
    }

    fn worker_started(&self) {
        (**self).worker_started();
    }

    fn worker_stopped(&self) {
        (**self).worker_stopped();
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            socket = %config.daemon_socket(),
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            handlers = ?config.handlers(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn handler_loaded(&self, name: &str) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "handler_loaded",
            handler = name,
            "handler loaded"
        );
    }

    fn handler_load_failed(&self, error: &RegistryError) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "handler_load_failed",
            error = %error,
            "handler could not be loaded"
        );
    }

    fn worker_started(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "worker_started",
            "dispatch worker started"
        );
    }

    fn worker_stopped(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "worker_stopped",
            "dispatch worker stopped"
        );
    }
}
