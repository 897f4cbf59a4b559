//! Hot-reloadable map from handler names to compute handlers.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use crate::compute::{ComputeHandler, HandlerFactory};

use super::DISPATCH_TARGET;
use super::errors::RegistryError;

/// Handler registry shared by connection threads and the worker.
///
/// Lookups hand out an [`Arc`] so a reload never pulls a handler out from
/// under a running batch: the replaced handler is dropped when its last
/// in-flight invocation finishes. The lock is only held to read or swap a
/// map entry.
pub struct HandlerRegistry {
    factory: Arc<dyn HandlerFactory>,
    handlers: RwLock<BTreeMap<String, Arc<dyn ComputeHandler>>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.names())
            .finish_non_exhaustive()
    }
}

impl HandlerRegistry {
    /// Creates an empty registry backed by `factory`.
    pub fn new(factory: Arc<dyn HandlerFactory>) -> Self {
        Self {
            factory,
            handlers: RwLock::new(BTreeMap::new()),
        }
    }

    /// Creates `name` through the factory and installs it, replacing any
    /// handler already registered under that name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownHandler`] when the factory does not
    /// know `name`; the registry is left untouched.
    pub fn load(&self, name: &str) -> Result<(), RegistryError> {
        let handler: Arc<dyn ComputeHandler> = self
            .factory
            .create(name)
            .map(Arc::from)
            .ok_or_else(|| RegistryError::UnknownHandler {
                name: name.to_owned(),
            })?;
        let replaced = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_owned(), handler);
        info!(
            target: DISPATCH_TARGET,
            handler = name,
            reloaded = replaced.is_some(),
            "loaded handler"
        );
        drop(replaced);
        Ok(())
    }

    /// Removes `name`, returning whether it was registered.
    pub fn unload(&self, name: &str) -> bool {
        let removed = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        removed.is_some()
    }

    /// Returns the handler currently installed under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ComputeHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Returns `true` when `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Client-facing message for a request naming an unregistered handler.
    #[must_use]
    pub fn unknown_handler_message(&self, name: &str) -> String {
        format!(
            "invalid handler name: {name}; valid handlers: {}.",
            self.names().join(", ")
        )
    }
}
