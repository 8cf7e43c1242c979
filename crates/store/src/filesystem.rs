//! Filesystem-based component store.
//!
//! Layout of a project directory:
//!
//! ```text
//! <root>/components/<name>.json
//! <root>/packages/<package>/components/<name>.json
//! ```
//!
//! # Security
//!
//! Component and package names come from project data. The store validates
//! them and checks that every resolved path stays inside the project root.

use canopy_model::Component;
use canopy_traits::{ComponentStore, StoreError};
use std::collections::HashMap;
use std::path::{Component as PathComponent, Path, PathBuf};
use std::sync::{Arc, RwLock};

type CacheKey = (Option<String>, String);

/// Loads components from a project directory, caching each parsed
/// component for the lifetime of the store.
#[derive(Debug)]
pub struct FilesystemComponentStore {
    base_path: PathBuf,
    /// Canonicalized base path for security checks
    canonical_base: Option<PathBuf>,
    cache: RwLock<HashMap<CacheKey, Arc<Component>>>,
}

impl FilesystemComponentStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        let base = base_path.as_ref().to_path_buf();
        // May fail if the directory does not exist yet
        let canonical = base.canonicalize().ok();
        Self {
            base_path: base,
            canonical_base: canonical,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base_path
    }

    fn relative_path(package: Option<&str>, name: &str) -> Result<PathBuf, StoreError> {
        validate_name(name)?;
        let file = format!("{}.json", name);
        match package {
            Some(package) => {
                validate_name(package)?;
                Ok(Path::new("packages").join(package).join("components").join(file))
            }
            None => Ok(Path::new("components").join(file)),
        }
    }

    /// Returns `None` if the path would escape the base directory.
    fn resolve_path_safe(&self, relative: &Path) -> Option<PathBuf> {
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, PathComponent::ParentDir))
        {
            return None;
        }

        let full_path = self.base_path.join(relative);
        if let Ok(canonical) = full_path.canonicalize()
            && let Some(ref base) = self.canonical_base
        {
            return canonical.starts_with(base).then_some(canonical);
        }
        Some(full_path)
    }

    fn cached(&self, key: &CacheKey) -> Option<Arc<Component>> {
        self.cache.read().ok()?.get(key).cloned()
    }

    fn read_component(&self, package: Option<&str>, name: &str) -> Result<Component, StoreError> {
        let relative = Self::relative_path(package, name)?;
        let full_path = self
            .resolve_path_safe(&relative)
            .ok_or_else(|| StoreError::InvalidName(format!("{} (path traversal blocked)", name)))?;

        let source = std::fs::read_to_string(&full_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(relative.display().to_string())
            } else {
                StoreError::LoadFailed {
                    name: name.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let mut component = Component::from_json(&source).map_err(|e| StoreError::LoadFailed {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        if !component.name.is_empty() && component.name != name {
            log::warn!(
                "Component file '{}' declares name '{}'; using the file name",
                relative.display(),
                component.name
            );
        }
        component.name = name.to_string();
        component.package = package.map(str::to_string);
        Ok(component)
    }
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
        || Path::new(name).is_absolute();
    if invalid {
        Err(StoreError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}

impl ComponentStore for FilesystemComponentStore {
    fn load(&self, package: Option<&str>, name: &str) -> Result<Arc<Component>, StoreError> {
        let key = (package.map(str::to_string), name.to_string());
        if let Some(component) = self.cached(&key) {
            return Ok(component);
        }

        let component = Arc::new(self.read_component(package, name)?);
        log::debug!("Loaded component '{}' from {}", component.qualified_name(), self.base_path.display());
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key, Arc::clone(&component));
        }
        Ok(component)
    }

    fn exists(&self, package: Option<&str>, name: &str) -> bool {
        Self::relative_path(package, name)
            .ok()
            .and_then(|relative| self.resolve_path_safe(&relative))
            .map(|p| p.exists())
            .unwrap_or(false)
    }

    fn name(&self) -> &'static str {
        "FilesystemComponentStore"
    }
}
