use crate::area::StorageArea;
use crate::backend::StorageBackend;
use crate::change::Items;
use crate::error::BackendResult;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Single-area view over a [`StorageBackend`].
///
/// Errors are returned to the caller untouched.
#[derive(Clone)]
pub struct AreaStorage {
    backend: Arc<dyn StorageBackend>,
    area: StorageArea,
}

impl AreaStorage {
    pub fn new(backend: Arc<dyn StorageBackend>, area: StorageArea) -> Self {
        Self { backend, area }
    }

    pub fn area(&self) -> StorageArea {
        self.area
    }

    /// Returns the stored value for `key`, or `None` if the key is absent.
    pub async fn get_item(&self, key: &str) -> BackendResult<Option<Value>> {
        let mut values = self.backend.get(self.area, key).await?;
        Ok(values.remove(key))
    }

    /// Stores `value` under `key`.
    pub async fn set_item(&self, key: &str, value: Value) -> BackendResult<()> {
        let mut items = Items::new();
        items.insert(key.to_string(), value);
        self.backend.set(self.area, items).await
    }

    /// Deletes the entry for `key`.
    pub async fn remove_item(&self, key: &str) -> BackendResult<()> {
        self.backend.remove(self.area, key).await
    }
}

impl fmt::Debug for AreaStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AreaStorage")
            .field("area", &self.area)
            .finish_non_exhaustive()
    }
}
