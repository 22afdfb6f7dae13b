//! Keeps an observable value in sync with one key of extension storage.
//!
//! # Architecture
//!
//! - [`SyncCore`] owns the data cell, the error slot, the ready signal, the
//!   write watcher, and the change listener for one (key, area) pair
//! - [`WebextStorage`] is the caller-facing bundle; [`StorageState`] and the
//!   bare data cell are narrower views of the same core
//! - The backend is passed in as `Arc<dyn StorageBackend>`; see
//!   [`MemoryBackend`] for an in-process implementation
//!
//! Without `listen_to_storage_changes` the value is loaded once and local
//! changes are not persisted.
//!
//! ```no_run
//! use std::sync::Arc;
//! use webext_storage::{MemoryBackend, StorageOptions, use_browser_local_storage};
//!
//! # async fn demo() {
//! let backend = Arc::new(MemoryBackend::new());
//! let theme = use_browser_local_storage::<String>(
//!     backend,
//!     "theme",
//!     "light".to_string(),
//!     StorageOptions::new().listen_to_storage_changes(true),
//! )
//! .await;
//! theme.data().set("dark".to_string());
//! # }
//! ```

mod core;
mod error;
mod handle;
mod initial;
mod listener;
mod options;

pub use crate::core::{ChangeEvent, StorageValue, SyncCore};
pub use error::{ErrorHook, ErrorKind, ErrorSlot, StorageError};
pub use handle::{StorageState, WebextStorage};
pub use initial::MaybeCell;
pub use listener::ListenerSlot;
pub use options::StorageOptions;

pub use webext_storage_backend::{
    AreaStorage, BackendError, ChangeEvents, MemoryBackend, StorageArea, StorageBackend,
    StorageChange,
};
pub use webext_storage_reactive::{Cell, EventFilter, PausableFilter, Scope};

use std::sync::Arc;

/// Syncs `key` in `area` with a new data cell.
///
/// The first load starts immediately in the background; the returned bundle
/// can be used right away or awaited.
///
/// # Panics
///
/// Must be called from within a tokio runtime.
pub fn use_webext_storage<T: StorageValue>(
    backend: Arc<dyn StorageBackend>,
    key: impl Into<String>,
    area: StorageArea,
    initial: impl Into<MaybeCell<T>>,
    options: StorageOptions,
) -> WebextStorage<T> {
    WebextStorage::new(SyncCore::start(backend, key, area, initial, options))
}

/// [`use_webext_storage`] for the `local` area.
pub fn use_browser_local_storage<T: StorageValue>(
    backend: Arc<dyn StorageBackend>,
    key: impl Into<String>,
    initial: impl Into<MaybeCell<T>>,
    options: StorageOptions,
) -> WebextStorage<T> {
    use_webext_storage(backend, key, StorageArea::Local, initial, options)
}

/// [`use_webext_storage`] for the `sync` area.
pub fn use_browser_sync_storage<T: StorageValue>(
    backend: Arc<dyn StorageBackend>,
    key: impl Into<String>,
    initial: impl Into<MaybeCell<T>>,
    options: StorageOptions,
) -> WebextStorage<T> {
    use_webext_storage(backend, key, StorageArea::Sync, initial, options)
}
