//! Backend registry
//!
//! Maps backend names to constructors. Backends are only built when a
//! session resolves them, so unused emulators cost nothing.

use crate::backend::Backend;
use crate::error::{LaunchError, Result};

/// Constructor for a registered backend.
pub type BackendFactory = Box<dyn Fn() -> Box<dyn Backend> + Send + Sync>;

/// A registered backend name and its constructor.
pub struct BackendEntry {
    pub name: &'static str,
    pub factory: BackendFactory,
}

/// Table of available backends.
#[derive(Default)]
pub struct BackendRegistry {
    entries: Vec<BackendEntry>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a backend constructor under `name`.
    ///
    /// A later registration with the same name replaces the earlier one.
    pub fn register<F>(&mut self, name: &'static str, factory: F)
    where
        F: Fn() -> Box<dyn Backend> + Send + Sync + 'static,
    {
        self.entries.retain(|entry| entry.name != name);
        self.entries.push(BackendEntry {
            name,
            factory: Box::new(factory),
        });
    }

    /// Construct the backend registered as `name`.
    pub fn resolve(&self, name: &str) -> Result<Box<dyn Backend>> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| (entry.factory)())
            .ok_or_else(|| LaunchError::UnknownBackend {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    /// Check if a backend name is registered.
    pub fn supports(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.name).collect()
    }
}
