//! Synchronization core for one key in one storage area.
//!
//! Three paths touch the data cell and the backend:
//! - Load (`read`): once at construction, then once per change notification
//! - Write watcher: persists local changes after the reactive flush
//! - Change listener: defers notifications to the scheduler, then loads
//!
//! The write watcher removes the change listener before each backend write
//! and registers it again afterwards, so an instance never processes the
//! notification caused by its own write. Values the core already knows to
//! be in the backend (just loaded, seeded, or persisted) are not written
//! back. A load whose read overlapped a local write does not count as
//! known: the value it applies is written back, so the last value applied
//! to the cell is the one that ends up stored.

use crate::error::{ErrorSlot, StorageError};
use crate::initial::MaybeCell;
use crate::listener::ListenerSlot;
use crate::options::StorageOptions;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tracing::debug;
use webext_storage_backend::{
    AreaStorage, BackendError, ChangeListener, Changes, StorageArea, StorageBackend,
};
use webext_storage_reactive::{Cell, WatchHandle, try_on_scope_dispose};

/// Bound for values kept in sync with storage.
pub trait StorageValue: Serialize + DeserializeOwned + Clone + PartialEq + Send + Sync + 'static {}

impl<T> StorageValue for T where T: Serialize + DeserializeOwned + Clone + PartialEq + Send + Sync + 'static {}

/// A change notification as delivered to the change listener.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub area: StorageArea,
    pub changes: Changes,
}

/// What the core knows about the backend's copy of the key.
#[derive(Debug, Default)]
struct Baseline {
    /// Encoded value last known to match the backend. `Null` means absent.
    value: Option<Value>,
    /// Backend writes started by persistence.
    writes: u64,
}

/// Keeps one observable cell consistent with one storage key.
///
/// Dropping the last reference stops the core. [`WebextStorage::into_data`]
/// and [`WebextStorage::into_state`] pin it instead, so it runs until
/// stopped.
///
/// [`WebextStorage::into_data`]: crate::WebextStorage::into_data
/// [`WebextStorage::into_state`]: crate::WebextStorage::into_state
pub struct SyncCore<T> {
    key: String,
    storage: AreaStorage,
    initial: T,
    write_defaults: bool,
    data: Cell<T>,
    error: ErrorSlot,
    ready: Cell<bool>,
    listener: ListenerSlot,
    watcher: Mutex<Option<WatchHandle>>,
    stopped: AtomicBool,
    baseline: Mutex<Baseline>,
    /// Self-reference held while a narrow view owns the sync.
    pinned: Mutex<Option<Arc<SyncCore<T>>>>,
    runtime: Handle,
}

impl<T: StorageValue> SyncCore<T> {
    /// Creates the core and starts the initial load.
    ///
    /// With `listen_to_storage_changes`, the write watcher starts once the
    /// initial load has settled, and disposing `options.scope` stops it.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        backend: Arc<dyn StorageBackend>,
        key: impl Into<String>,
        area: StorageArea,
        initial: impl Into<MaybeCell<T>>,
        options: StorageOptions,
    ) -> Arc<Self> {
        let key = key.into();
        let initial = initial.into().snapshot();
        let data = if options.shallow {
            Cell::shallow(initial.clone())
        } else {
            Cell::new(initial.clone())
        };
        let baseline = Baseline {
            value: serde_json::to_value(&initial).ok(),
            writes: 0,
        };

        let core = Arc::new(Self {
            storage: AreaStorage::new(Arc::clone(&backend), area),
            listener: ListenerSlot::new(backend),
            key,
            initial,
            write_defaults: options.write_defaults,
            data,
            error: ErrorSlot::new(options.on_error.clone()),
            ready: Cell::new(false),
            watcher: Mutex::new(None),
            stopped: AtomicBool::new(false),
            baseline: Mutex::new(baseline),
            pinned: Mutex::new(None),
            runtime: Handle::current(),
        });

        let listen = options.listen_to_storage_changes;
        let scope = options.scope.clone();
        let bootstrap = Arc::clone(&core);
        core.runtime.spawn(async move {
            bootstrap.read(None).await;
            if listen {
                bootstrap.start_write_watcher(&options);
            }
        });

        if listen {
            let stop = Arc::clone(&core);
            try_on_scope_dispose(scope.as_ref(), move || stop.stop());
        }

        core
    }
}

impl<T> SyncCore<T> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn area(&self) -> StorageArea {
        self.storage.area()
    }

    pub fn data(&self) -> &Cell<T> {
        &self.data
    }

    pub fn error(&self) -> &ErrorSlot {
        &self.error
    }

    pub fn ready(&self) -> &Cell<bool> {
        &self.ready
    }

    /// True while a change listener is registered with the backend.
    pub fn is_listening(&self) -> bool {
        self.listener.is_attached()
    }

    /// True once the write watcher is running and the core is not stopped.
    pub fn is_watching(&self) -> bool {
        self.lock_watcher().as_ref().is_some_and(|watcher| !watcher.is_stopped())
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Stops the write watcher and removes the change listener.
    /// Backend calls already in flight still complete. Idempotent.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(watcher) = self.lock_watcher().take() {
            watcher.stop();
        }
        self.listener.close();
        debug!("stopped syncing `{}` in {} storage", self.key, self.storage.area());

        let pinned = self.lock_pinned().take();
        drop(pinned);
    }

    /// True while a narrow view keeps the core alive.
    pub fn is_pinned(&self) -> bool {
        self.lock_pinned().is_some()
    }

    fn lock_watcher(&self) -> MutexGuard<'_, Option<WatchHandle>> {
        self.watcher.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_pinned(&self) -> MutexGuard<'_, Option<Arc<SyncCore<T>>>> {
        self.pinned.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_baseline(&self) -> MutexGuard<'_, Baseline> {
        self.baseline.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_generation(&self) -> u64 {
        self.lock_baseline().writes
    }

    /// Records a loaded value unless a write started since `since`.
    fn mark_loaded(&self, value: Value, since: u64) -> bool {
        let mut baseline = self.lock_baseline();
        if baseline.writes != since {
            return false;
        }
        baseline.value = Some(value);
        true
    }

    /// Claims a write of `value`. False if the backend already holds it.
    fn begin_write(&self, value: &Value) -> bool {
        let mut baseline = self.lock_baseline();
        if baseline.value.as_ref() == Some(value) {
            return false;
        }
        baseline.writes += 1;
        true
    }

    fn mark_written(&self, value: Value) {
        self.lock_baseline().value = Some(value);
    }

    fn read_error(&self, source: BackendError) -> StorageError {
        StorageError::Read {
            key: self.key.clone(),
            area: self.storage.area(),
            source,
        }
    }

    fn write_error(&self, source: BackendError) -> StorageError {
        StorageError::Write {
            key: self.key.clone(),
            area: self.storage.area(),
            source,
        }
    }
}

impl<T: StorageValue> SyncCore<T> {
    /// Load protocol. Without an event, loads unconditionally. With an event,
    /// does nothing unless it is for this instance's area and key.
    ///
    /// Failures go to the error slot; the ready signal is set either way.
    pub async fn read(&self, event: Option<&ChangeEvent>) {
        if let Some(event) = event {
            if event.area != self.storage.area() || !event.changes.contains_key(&self.key) {
                debug!("ignoring {} storage change not touching `{}`", event.area, self.key);
                return;
            }
        }

        if let Err(error) = self.load(event).await {
            self.error.record(error);
        }
        self.ready.set(true);
    }

    async fn load(&self, event: Option<&ChangeEvent>) -> Result<(), StorageError> {
        let since = self.write_generation();
        let stored = self
            .storage
            .get_item(&self.key)
            .await
            .map_err(|source| self.read_error(source))?;

        // The notification's value covers a read that raced the change.
        let raw = stored.filter(|value| !value.is_null()).or_else(|| {
            event
                .and_then(|event| event.changes.get(&self.key))
                .and_then(|change| change.new_value.clone())
                .filter(|value| !value.is_null())
        });

        match raw {
            None => {
                let encoded = self.encode(&self.initial)?;
                if !self.mark_loaded(encoded.clone(), since) {
                    debug!("read of `{}` overlapped a local write; default will be written back", self.key);
                }
                self.data.set(self.initial.clone());

                if self.write_defaults && !encoded.is_null() {
                    self.storage
                        .set_item(&self.key, encoded)
                        .await
                        .map_err(|source| self.write_error(source))?;
                    debug!("seeded `{}` in {} storage with its default", self.key, self.storage.area());
                }
            }
            Some(raw) => {
                let value: T = serde_json::from_value(raw.clone()).map_err(|e| StorageError::Decode {
                    key: self.key.clone(),
                    message: e.to_string(),
                })?;
                let encoded = serde_json::to_value(&value).unwrap_or(raw);
                if !self.mark_loaded(encoded, since) {
                    debug!("read of `{}` overlapped a local write; loaded value will be written back", self.key);
                }
                self.data.set(value);
                debug!("loaded `{}` from {} storage", self.key, self.storage.area());
            }
        }

        Ok(())
    }

    fn encode(&self, value: &T) -> Result<Value, StorageError> {
        serde_json::to_value(value).map_err(|e| StorageError::Encode {
            key: self.key.clone(),
            message: e.to_string(),
        })
    }

    /// Writes `value` to the backend, or removes the key if it encodes to
    /// `null`. Skips the call if the backend is known to hold it already.
    pub async fn persist(&self, value: &T) {
        if let Err(error) = self.try_persist(value).await {
            self.error.record(error);
        }
    }

    async fn try_persist(&self, value: &T) -> Result<(), StorageError> {
        let encoded = self.encode(value)?;
        if !self.begin_write(&encoded) {
            return Ok(());
        }

        if encoded.is_null() {
            self.storage
                .remove_item(&self.key)
                .await
                .map_err(|source| StorageError::Remove {
                    key: self.key.clone(),
                    area: self.storage.area(),
                    source,
                })?;
            debug!("removed `{}` from {} storage", self.key, self.storage.area());
        } else {
            self.storage
                .set_item(&self.key, encoded.clone())
                .await
                .map_err(|source| self.write_error(source))?;
            debug!("persisted `{}` to {} storage", self.key, self.storage.area());
        }

        self.mark_written(encoded);
        Ok(())
    }
}

impl<T: StorageValue> SyncCore<T> {
    fn start_write_watcher(self: &Arc<Self>, options: &StorageOptions) {
        let mut watcher = self.lock_watcher();
        if self.is_stopped() {
            return;
        }

        let core = Arc::downgrade(self);
        *watcher = Some(self.data.watch(options.write_watch_options(), move |value: &T| {
            if let Some(core) = core.upgrade() {
                core.on_local_change(value);
            }
        }));
    }

    /// Write-watcher firing: detach, persist, re-attach.
    fn on_local_change(self: &Arc<Self>, value: &T) {
        self.listener.detach();

        let core = Arc::clone(self);
        let value = value.clone();
        self.runtime.spawn(async move {
            core.persist(&value).await;
            core.attach_listener();
        });
    }

    /// Registers the change listener unless one is registered or the core
    /// was stopped.
    pub fn attach_listener(self: &Arc<Self>) {
        let core = Arc::downgrade(self);
        let runtime = self.runtime.clone();
        let listener: ChangeListener = Arc::new(move |changes: &Changes, area: StorageArea| {
            let Some(core) = core.upgrade() else {
                return;
            };
            let event = ChangeEvent {
                area,
                changes: changes.clone(),
            };
            runtime.spawn(async move {
                tokio::task::yield_now().await;
                core.read(Some(&event)).await;
            });
        });

        if self.listener.attach(listener) {
            debug!("listening for changes to `{}` in {} storage", self.key, self.storage.area());
        }
    }

    /// Keeps the core alive until [`SyncCore::stop`], even with no other
    /// references left. No-op once stopped.
    pub(crate) fn pin(self: &Arc<Self>) {
        if self.is_stopped() {
            return;
        }
        *self.lock_pinned() = Some(Arc::clone(self));
    }
}

impl<T> Drop for SyncCore<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<T: fmt::Debug> fmt::Debug for SyncCore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncCore")
            .field("key", &self.key)
            .field("area", &self.storage.area())
            .field("data", &self.data)
            .field("error", &self.error)
            .field("ready", &self.ready)
            .field("listener", &self.listener)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
