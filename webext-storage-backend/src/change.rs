//! Change notifications (`storage.onChanged`).

use crate::area::StorageArea;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Stored entries keyed by storage key.
pub type Items = HashMap<String, Value>;

/// Per-key transitions delivered with one notification.
pub type Changes = HashMap<String, StorageChange>;

/// Callback invoked with `(changes, area)` for every mutation in any area.
pub type ChangeListener = Arc<dyn Fn(&Changes, StorageArea) + Send + Sync>;

/// Transition of a single key. A missing `new_value` means the key was removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
}

impl StorageChange {
    pub fn new(old_value: Option<Value>, new_value: Option<Value>) -> Self {
        Self { old_value, new_value }
    }

    pub fn is_removal(&self) -> bool {
        self.new_value.is_none()
    }
}

/// Handle identifying a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Listener registry shared by every key and area of a backend.
///
/// Listeners run synchronously on the emitting thread, in registration order.
/// A listener removed while an emit is in progress still receives that emit.
pub struct ChangeEvents {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, ChangeListener)>>,
}

impl ChangeEvents {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            listeners: Mutex::new(Vec::new()),
        }
    }

    fn lock_listeners(&self) -> MutexGuard<'_, Vec<(ListenerId, ChangeListener)>> {
        self.listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers `listener` and returns the id needed to remove it.
    pub fn add_listener(&self, listener: ChangeListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock_listeners().push((id, listener));
        id
    }

    /// Unregisters a listener. Returns false if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock_listeners();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn has_listener(&self, id: ListenerId) -> bool {
        self.lock_listeners().iter().any(|(existing, _)| *existing == id)
    }

    pub fn has_listeners(&self) -> bool {
        !self.lock_listeners().is_empty()
    }

    pub fn listener_count(&self) -> usize {
        self.lock_listeners().len()
    }

    /// Delivers `changes` to every registered listener. Empty change sets are dropped.
    pub fn emit(&self, changes: &Changes, area: StorageArea) {
        if changes.is_empty() {
            return;
        }

        // Call outside the lock so listeners may add or remove listeners.
        let listeners: Vec<ChangeListener> = self
            .lock_listeners()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        debug!(
            "emitting {} change(s) in {area} storage to {} listener(s)",
            changes.len(),
            listeners.len()
        );

        for listener in listeners {
            listener(changes, area);
        }
    }
}

impl Default for ChangeEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChangeEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeEvents")
            .field("listener_count", &self.listener_count())
            .finish()
    }
}
