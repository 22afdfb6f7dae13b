use crate::area::StorageArea;
use crate::change::{ChangeEvents, Items};
use crate::error::BackendResult;
use async_trait::async_trait;

/// Async key-value store partitioned by [`StorageArea`].
///
/// Mirrors `browser.storage`: every call may fail, and every successful
/// mutation is expected to be reported through [`StorageBackend::on_changed`]
/// to all registered listeners, including the one owned by the writer.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Fetches the entry for `key`. Absent keys are missing from the returned map.
    async fn get(&self, area: StorageArea, key: &str) -> BackendResult<Items>;

    /// Writes every entry in `items`, overwriting existing values.
    async fn set(&self, area: StorageArea, items: Items) -> BackendResult<()>;

    /// Deletes the entry for `key`. Removing an absent key succeeds.
    async fn remove(&self, area: StorageArea, key: &str) -> BackendResult<()>;

    /// Change notifications for all keys in all areas.
    fn on_changed(&self) -> &ChangeEvents;
}
