//! Caller-facing views over a [`SyncCore`].

use crate::core::{StorageValue, SyncCore};
use crate::error::{ErrorSlot, StorageError};
use futures::future::BoxFuture;
use std::fmt;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use webext_storage_backend::StorageArea;
use webext_storage_reactive::Cell;

/// Synced value with its error slot and ready signal.
///
/// Syncing stops when the last clone is dropped, unless the bundle was
/// turned into a narrow view. Usable immediately (the data cell holds the initial value until the first
/// load lands) or awaited: `storage.await` resolves once the first load has
/// completed, successfully or not.
pub struct WebextStorage<T> {
    core: Arc<SyncCore<T>>,
}

impl<T> Clone for WebextStorage<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T: StorageValue> WebextStorage<T> {
    pub(crate) fn new(core: Arc<SyncCore<T>>) -> Self {
        Self { core }
    }

    pub fn key(&self) -> &str {
        self.core.key()
    }

    pub fn area(&self) -> StorageArea {
        self.core.area()
    }

    /// The synced value.
    pub fn data(&self) -> &Cell<T> {
        self.core.data()
    }

    /// Last error seen while loading or persisting.
    pub fn error(&self) -> &ErrorSlot {
        self.core.error()
    }

    /// Becomes true when the first load completes and stays true.
    pub fn is_ready(&self) -> &Cell<bool> {
        self.core.ready()
    }

    /// True while this instance is registered for change notifications.
    pub fn is_listening(&self) -> bool {
        self.core.is_listening()
    }

    pub fn is_stopped(&self) -> bool {
        self.core.is_stopped()
    }

    /// Stops change tracking. Safe to call more than once.
    pub fn stop(&self) {
        self.core.stop();
    }

    /// The underlying core.
    pub fn core(&self) -> &Arc<SyncCore<T>> {
        &self.core
    }

    /// `{data, error}` view without readiness.
    ///
    /// The sync outlives the bundle and runs until stopped through
    /// [`StorageOptions::scope`](crate::StorageOptions::scope).
    pub fn into_state(self) -> StorageState<T> {
        self.core.pin();
        StorageState {
            data: self.data().clone(),
            error: self.error().cell().clone(),
        }
    }

    /// Bare data cell. The sync outlives the bundle, as with
    /// [`WebextStorage::into_state`].
    pub fn into_data(self) -> Cell<T> {
        self.core.pin();
        self.data().clone()
    }

    /// Waits for the first load, giving up after `timeout`.
    /// `Err` carries the same bundle, still usable.
    pub async fn ready_within(self, timeout: Duration) -> Result<Self, Self> {
        let ready = self.is_ready().clone();
        match tokio::time::timeout(timeout, ready.until(|ready| *ready)).await {
            Ok(_) => Ok(self),
            Err(_) => Err(self),
        }
    }
}

impl<T: StorageValue> IntoFuture for WebextStorage<T> {
    type Output = Self;
    type IntoFuture = BoxFuture<'static, Self>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            let ready = self.is_ready().clone();
            ready.until(|ready| *ready).await;
            self
        })
    }
}

impl<T: StorageValue + fmt::Debug> fmt::Debug for WebextStorage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebextStorage")
            .field("key", &self.key())
            .field("area", &self.area())
            .field("data", &self.data().get())
            .field("error", &self.error().get())
            .field("is_ready", &self.is_ready().get())
            .finish()
    }
}

/// Synced value and its error slot.
#[derive(Debug, Clone)]
pub struct StorageState<T> {
    pub data: Cell<T>,
    pub error: Cell<Option<StorageError>>,
}
