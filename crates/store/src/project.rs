//! Single-file projects.
use canopy_model::Component;
use canopy_traits::{InMemoryComponentStore, StoreError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// A whole project in one JSON document.
///
/// Components are kept as raw JSON until [`ProjectFile::into_store`], so a
/// component that fails to load is skipped without rejecting the others.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProjectFile {
    pub components: BTreeMap<String, Value>,
    pub packages: BTreeMap<String, PackageFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PackageFile {
    pub components: BTreeMap<String, Value>,
}

fn decode(package: Option<&str>, name: &str, definition: Value) -> Option<Component> {
    match serde_json::from_value::<Component>(definition) {
        Ok(mut component) => {
            component.name = name.to_string();
            component.package = package.map(str::to_string);
            Some(component)
        }
        Err(err) => {
            log::warn!("Skipping component '{}': {}", name, err);
            None
        }
    }
}

impl ProjectFile {
    pub fn from_json(source: &str) -> Result<Self, StoreError> {
        serde_json::from_str(source).map_err(|e| StoreError::LoadFailed {
            name: "project".to_string(),
            message: e.to_string(),
        })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&source)
    }

    /// Moves every component into a fresh in-memory store. Map keys win
    /// over any `name` declared inside the component.
    pub fn into_store(self) -> Result<InMemoryComponentStore, StoreError> {
        let store = InMemoryComponentStore::new();
        for (name, definition) in self.components {
            if let Some(component) = decode(None, &name, definition) {
                store.add(component)?;
            }
        }
        for (package, file) in self.packages {
            for (name, definition) in file.components {
                if let Some(component) = decode(Some(&package), &name, definition) {
                    store.add_package_component(package.clone(), component)?;
                }
            }
        }
        log::debug!("Loaded project with {} components", store.len());
        Ok(store)
    }
}
