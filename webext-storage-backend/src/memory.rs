//! In-process storage backend.
//!
//! Behaves like extension storage as seen from one extension context:
//! - Values live per area; `managed` rejects writes
//! - Successful mutations emit change notifications synchronously,
//!   before the call returns, and only for keys whose value changed
//! - Every call through [`StorageBackend`] is recorded for inspection
//! - Failures can be queued per [`Operation`] to exercise error paths
//!
//! Writes made by "another context" (`set_external`, `remove_external`)
//! emit notifications but are not recorded as calls.

use crate::area::StorageArea;
use crate::backend::StorageBackend;
use crate::change::{ChangeEvents, Changes, Items, StorageChange};
use crate::error::{BackendError, BackendResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Backend operation kinds, used for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Set,
    Remove,
}

/// A call received through the [`StorageBackend`] trait.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Get { area: StorageArea, key: String },
    Set { area: StorageArea, items: Items },
    Remove { area: StorageArea, key: String },
}

impl BackendCall {
    pub fn operation(&self) -> Operation {
        match self {
            BackendCall::Get { .. } => Operation::Get,
            BackendCall::Set { .. } => Operation::Set,
            BackendCall::Remove { .. } => Operation::Remove,
        }
    }
}

#[derive(Default)]
struct MemoryState {
    areas: HashMap<StorageArea, Items>,
    calls: Vec<BackendCall>,
    failures: HashMap<Operation, VecDeque<BackendError>>,
}

/// Thread-safe in-memory [`StorageBackend`].
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    events: ChangeEvents,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stores a value without recording a call or emitting a notification.
    /// Works for every area, including `managed`.
    pub fn seed(&self, area: StorageArea, key: &str, value: Value) {
        self.lock_state()
            .areas
            .entry(area)
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Reads a value without recording a call.
    pub fn value(&self, area: StorageArea, key: &str) -> Option<Value> {
        self.lock_state()
            .areas
            .get(&area)
            .and_then(|items| items.get(key))
            .cloned()
    }

    /// Snapshot of every entry stored in `area`.
    pub fn items(&self, area: StorageArea) -> Items {
        self.lock_state().areas.get(&area).cloned().unwrap_or_default()
    }

    /// Every call received so far, in arrival order.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock_state().calls.clone()
    }

    /// Number of recorded calls of the given kind.
    pub fn count(&self, operation: Operation) -> usize {
        self.lock_state()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    /// Number of recorded `set` calls that wrote `value` under `key`.
    pub fn set_count(&self, key: &str, value: &Value) -> usize {
        self.lock_state()
            .calls
            .iter()
            .filter(|call| match call {
                BackendCall::Set { items, .. } => items.get(key) == Some(value),
                _ => false,
            })
            .count()
    }

    pub fn clear_calls(&self) {
        self.lock_state().calls.clear();
    }

    /// Makes the next call of kind `operation` fail with `error`.
    /// Multiple queued failures are consumed in order.
    pub fn fail_next(&self, operation: Operation, error: BackendError) {
        self.lock_state()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Simulates a write from another extension context.
    pub fn set_external(&self, area: StorageArea, key: &str, value: Value) {
        let mut items = Items::new();
        items.insert(key.to_string(), value);
        let changes = self.apply_set(area, items);
        self.events.emit(&changes, area);
    }

    /// Simulates a removal from another extension context.
    pub fn remove_external(&self, area: StorageArea, key: &str) {
        let changes = self.apply_remove(area, key);
        self.events.emit(&changes, area);
    }

    /// Removes every entry in `area`, notifying listeners of each removal.
    pub fn clear(&self, area: StorageArea) {
        let removed = self.lock_state().areas.remove(&area).unwrap_or_default();
        let changes: Changes = removed
            .into_iter()
            .map(|(key, old)| (key, StorageChange::new(Some(old), None)))
            .collect();
        self.events.emit(&changes, area);
    }

    fn record(&self, call: BackendCall) -> BackendResult<()> {
        let mut state = self.lock_state();
        let operation = call.operation();
        state.calls.push(call);
        match state.failures.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(error) => {
                debug!("injected {operation:?} failure: {error}");
                Err(error)
            }
            None => Ok(()),
        }
    }

    fn apply_set(&self, area: StorageArea, items: Items) -> Changes {
        let mut state = self.lock_state();
        let stored = state.areas.entry(area).or_default();
        let mut changes = Changes::new();
        for (key, value) in items {
            let old = stored.insert(key.clone(), value.clone());
            if old.as_ref() != Some(&value) {
                changes.insert(key, StorageChange::new(old, Some(value)));
            }
        }
        changes
    }

    fn apply_remove(&self, area: StorageArea, key: &str) -> Changes {
        let mut state = self.lock_state();
        let mut changes = Changes::new();
        if let Some(old) = state.areas.get_mut(&area).and_then(|items| items.remove(key)) {
            changes.insert(key.to_string(), StorageChange::new(Some(old), None));
        }
        changes
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, area: StorageArea, key: &str) -> BackendResult<Items> {
        self.record(BackendCall::Get {
            area,
            key: key.to_string(),
        })?;

        let mut found = Items::new();
        if let Some(value) = self.value(area, key) {
            found.insert(key.to_string(), value);
        }
        Ok(found)
    }

    async fn set(&self, area: StorageArea, items: Items) -> BackendResult<()> {
        self.record(BackendCall::Set {
            area,
            items: items.clone(),
        })?;
        if area.is_read_only() {
            return Err(BackendError::ReadOnly(area));
        }

        let changes = self.apply_set(area, items);
        self.events.emit(&changes, area);
        Ok(())
    }

    async fn remove(&self, area: StorageArea, key: &str) -> BackendResult<()> {
        self.record(BackendCall::Remove {
            area,
            key: key.to_string(),
        })?;
        if area.is_read_only() {
            return Err(BackendError::ReadOnly(area));
        }

        let changes = self.apply_remove(area, key);
        self.events.emit(&changes, area);
        Ok(())
    }

    fn on_changed(&self) -> &ChangeEvents {
        &self.events
    }
}
