//! Daemon bootstrap orchestration.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use offload_config::{Config, SocketPreparationError};

use crate::compute::HandlerFactory;
use crate::dispatch::{HandlerRegistry, RegistryError};
use crate::health::HealthReporter;
use crate::telemetry::{self, TelemetryError};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns the layered loader's error when a source is malformed.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Socket preparation failed.
    #[error("failed to prepare daemon socket: {source}")]
    Socket {
        /// Filesystem error reported while preparing the socket directory.
        #[source]
        source: SocketPreparationError,
    },
}

/// Result of a successful bootstrap invocation.
pub struct Daemon {
    config: Config,
    registry: Arc<HandlerRegistry>,
    reporter: Arc<dyn HealthReporter>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registry shared with the dispatcher.
    #[must_use]
    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Reporter shared with the rest of the runtime.
    #[must_use]
    pub fn reporter(&self) -> &Arc<dyn HealthReporter> {
        &self.reporter
    }

    /// Loads (or reloads) `name`, reporting the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownHandler`] when the factory does not
    /// know `name`. The daemon keeps running either way.
    pub fn load_handler(&self, name: &str) -> Result<(), RegistryError> {
        match self.registry.load(name) {
            Ok(()) => {
                self.reporter.handler_loaded(name);
                Ok(())
            }
            Err(error) => {
                self.reporter.handler_load_failed(&error);
                Err(error)
            }
        }
    }

    /// Reloads every configured handler, returning how many succeeded.
    ///
    /// Failures are reported and skipped.
    pub fn reload_handlers(&self) -> usize {
        self.config
            .handlers()
            .iter()
            .filter(|name| self.load_handler(name).is_ok())
            .count()
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// Loads configuration, installs telemetry, prepares the socket directory,
/// then preloads every configured handler. A handler that fails to load is
/// reported and skipped; only configuration, telemetry and socket failures
/// abort bootstrap.
///
/// # Errors
///
/// Returns a [`BootstrapError`] describing the first fatal step.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    factory: Arc<dyn HandlerFactory>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    if let Err(source) = telemetry::initialise(&config) {
        let error = BootstrapError::Telemetry { source };
        reporter.bootstrap_failed(&error);
        return Err(error);
    }

    if let Err(source) = config.daemon_socket().prepare_filesystem() {
        let error = BootstrapError::Socket { source };
        reporter.bootstrap_failed(&error);
        return Err(error);
    }

    let daemon = Daemon {
        config,
        registry: Arc::new(HandlerRegistry::new(factory)),
        reporter,
    };
    daemon.reload_handlers();
    daemon.reporter.bootstrap_succeeded(&daemon.config);
    Ok(daemon)
}
