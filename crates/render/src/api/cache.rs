use super::status::ApiStatus;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::sync::{Mutex, PoisonError};

/// Page-scoped store of resolved API statuses, keyed by the resolved
/// request. Written at most once per key; shipped to the client as-is.
#[derive(Debug, Default)]
pub struct ApiCache {
    entries: Mutex<IndexMap<String, ApiStatus>>,
}

impl ApiCache {
    pub fn get(&self, key: &str) -> Option<ApiStatus> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    /// Stores `status` unless the key is already present; returns the
    /// status that ends up cached.
    pub fn insert(&self, key: String, status: ApiStatus) -> ApiStatus {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.entry(key).or_insert(status).clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_value(&self) -> Value {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Value::Object(
            entries
                .iter()
                .map(|(key, status)| (key.clone(), status.to_value()))
                .collect::<Map<_, _>>(),
        )
    }
}
