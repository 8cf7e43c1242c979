//! ComponentStore trait for abstracting component loading.
//!
//! The renderer resolves component references through this trait, so it
//! never needs to know whether components come from disk, from a single
//! project file, or from memory.

use canopy_model::Component;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Error type for component loading operations.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("Component not found: {0}")]
    NotFound(String),

    #[error("Failed to load component '{name}': {message}")]
    LoadFailed { name: String, message: String },

    #[error("Invalid component name: {0}")]
    InvalidName(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

/// Resolves `(package?, name)` to a component definition.
///
/// A `None` package means the project's own components. Implementations
/// must stamp `Component::package` on components that come from a package.
pub trait ComponentStore: Send + Sync + Debug {
    fn load(&self, package: Option<&str>, name: &str) -> Result<Arc<Component>, StoreError>;

    fn exists(&self, package: Option<&str>, name: &str) -> bool {
        self.load(package, name).is_ok()
    }

    /// Returns a human-readable name for this store (for logging/debugging).
    fn name(&self) -> &'static str;
}

type StoreKey = (Option<String>, String);

fn display_name(package: Option<&str>, name: &str) -> String {
    match package {
        Some(package) => format!("{}/{}", package, name),
        None => name.to_string(),
    }
}

/// A component store backed by memory. Components must be added before use.
#[derive(Debug, Default)]
pub struct InMemoryComponentStore {
    components: RwLock<HashMap<StoreKey, Arc<Component>>>,
}

impl InMemoryComponentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a project component, keyed by its name.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LoadFailed` if the internal lock is poisoned.
    pub fn add(&self, component: Component) -> Result<(), StoreError> {
        let key = (component.package.clone(), component.name.clone());
        self.insert(key, component)
    }

    /// Adds a component that belongs to `package`.
    pub fn add_package_component(
        &self,
        package: impl Into<String>,
        mut component: Component,
    ) -> Result<(), StoreError> {
        let package = package.into();
        component.package = Some(package.clone());
        self.insert((Some(package), component.name.clone()), component)
    }

    fn insert(&self, key: StoreKey, component: Component) -> Result<(), StoreError> {
        let mut components = self
            .components
            .write()
            .map_err(|_| StoreError::LoadFailed {
                name: key.1.clone(),
                message: "component store lock poisoned".to_string(),
            })?;
        components.insert(key, Arc::new(component));
        Ok(())
    }

    /// Returns 0 if the lock is poisoned.
    pub fn len(&self) -> usize {
        self.components.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Returns `true` if the lock is poisoned.
    pub fn is_empty(&self) -> bool {
        self.components.read().map(|c| c.is_empty()).unwrap_or(true)
    }
}

impl ComponentStore for InMemoryComponentStore {
    fn load(&self, package: Option<&str>, name: &str) -> Result<Arc<Component>, StoreError> {
        let components = self
            .components
            .read()
            .map_err(|_| StoreError::LoadFailed {
                name: display_name(package, name),
                message: "component store lock poisoned".to_string(),
            })?;
        components
            .get(&(package.map(str::to_string), name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(display_name(package, name)))
    }

    fn name(&self) -> &'static str {
        "InMemoryComponentStore"
    }
}
