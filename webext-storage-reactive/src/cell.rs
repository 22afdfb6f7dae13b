//! Observable value cell.
//!
//! # Invariants
//!
//! 1. `set(v)` where `v == current` is a no-op: no version bump, no callbacks.
//! 2. `version` increments by exactly 1 on each tracked change.
//! 3. On a shallow cell, `update` mutates the value without notifying;
//!    `trigger` forces a notification.
//! 4. Watchers never hold the cell's lock while their callback runs, so a
//!    callback may read or write the cell.

use crate::watch::{Flush, WatchHandle, WatchOptions};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Assigned,
    Mutated,
}

struct Snapshot<T> {
    value: T,
    /// Whole-value replacements and forced triggers.
    assigned: u64,
    /// Tracked in-place mutations.
    mutated: u64,
}

struct SyncWatcher<T> {
    id: u64,
    deep: bool,
    callback: Callback<T>,
}

struct CellInner<T> {
    state: watch::Sender<Snapshot<T>>,
    sync_watchers: Mutex<Vec<SyncWatcher<T>>>,
    next_watcher_id: AtomicU64,
    shallow: bool,
}

impl<T> CellInner<T> {
    fn lock_sync_watchers(&self) -> MutexGuard<'_, Vec<SyncWatcher<T>>> {
        self.sync_watchers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn remove_sync_watcher(&self, id: u64) {
        self.lock_sync_watchers().retain(|watcher| watcher.id != id);
    }
}

/// Shared observable value. Clones are handles to the same value.
pub struct Cell<T> {
    inner: Arc<CellInner<T>>,
}

impl<T> Clone for Cell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Cell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.inner.state.borrow();
        f.debug_struct("Cell")
            .field("value", &snapshot.value)
            .field("version", &(snapshot.assigned + snapshot.mutated))
            .field("shallow", &self.inner.shallow)
            .finish()
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Cell<T> {
    /// Creates a deep cell: in-place mutations through [`Cell::update`] are tracked.
    pub fn new(value: T) -> Self {
        Self::with_mode(value, false)
    }

    /// Creates a shallow cell: only whole-value replacement is tracked.
    pub fn shallow(value: T) -> Self {
        Self::with_mode(value, true)
    }

    fn with_mode(value: T, shallow: bool) -> Self {
        let (state, _) = watch::channel(Snapshot {
            value,
            assigned: 0,
            mutated: 0,
        });
        Self {
            inner: Arc::new(CellInner {
                state,
                sync_watchers: Mutex::new(Vec::new()),
                next_watcher_id: AtomicU64::new(1),
                shallow,
            }),
        }
    }

    pub fn is_shallow(&self) -> bool {
        self.inner.shallow
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.state.borrow().value.clone()
    }

    /// Reads the current value by reference. `f` must not write to this cell.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.state.borrow().value)
    }

    /// Number of tracked changes since creation.
    pub fn version(&self) -> u64 {
        let snapshot = self.inner.state.borrow();
        snapshot.assigned + snapshot.mutated
    }

    /// Replaces the value. Equal values are ignored.
    pub fn set(&self, value: T) {
        let changed = self.inner.state.send_if_modified(|snapshot| {
            if snapshot.value == value {
                return false;
            }
            snapshot.value = value;
            snapshot.assigned += 1;
            true
        });
        if changed {
            self.notify_sync(Change::Assigned);
        }
    }

    /// Mutates the value in place. Tracked only on deep cells, and only if
    /// the value actually changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let shallow = self.inner.shallow;
        let changed = self.inner.state.send_if_modified(|snapshot| {
            let before = snapshot.value.clone();
            f(&mut snapshot.value);
            if shallow || snapshot.value == before {
                return false;
            }
            snapshot.mutated += 1;
            true
        });
        if changed {
            self.notify_sync(Change::Mutated);
        }
    }

    /// Notifies watchers as if the value had been replaced.
    pub fn trigger(&self) {
        self.inner.state.send_modify(|snapshot| snapshot.assigned += 1);
        self.notify_sync(Change::Assigned);
    }

    /// Number of live watchers and pending waits on this cell.
    pub fn watcher_count(&self) -> usize {
        self.inner.lock_sync_watchers().len() + self.inner.state.receiver_count()
    }

    /// Calls `callback` with the new value whenever the cell changes.
    ///
    /// With `immediate`, the first call happens before `watch` returns.
    ///
    /// # Panics
    ///
    /// `Flush::Post` watchers spawn a task and must be created inside a
    /// tokio runtime.
    pub fn watch(
        &self,
        options: WatchOptions,
        callback: impl Fn(&T) + Send + Sync + 'static,
    ) -> WatchHandle {
        let gated: Callback<T> = {
            let options = options.clone();
            Arc::new(move |value: &T| {
                if options.allows() {
                    callback(value);
                }
            })
        };

        match options.flush {
            Flush::Sync => self.watch_sync(options, gated),
            Flush::Post => self.watch_post(options, gated),
        }
    }

    fn watch_sync(&self, options: WatchOptions, callback: Callback<T>) -> WatchHandle {
        let id = self.inner.next_watcher_id.fetch_add(1, Ordering::Relaxed);
        self.inner.lock_sync_watchers().push(SyncWatcher {
            id,
            deep: options.deep,
            callback: Arc::clone(&callback),
        });

        if options.immediate {
            callback(&self.get());
        }

        let inner = Arc::downgrade(&self.inner);
        WatchHandle::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.remove_sync_watcher(id);
            }
        })
    }

    fn watch_post(&self, options: WatchOptions, callback: Callback<T>) -> WatchHandle {
        let mut rx = self.inner.state.subscribe();
        let (mut assigned, mut mutated) = {
            let snapshot = rx.borrow_and_update();
            (snapshot.assigned, snapshot.mutated)
        };

        if options.immediate {
            callback(&self.get());
        }

        let deep = options.deep;
        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let fired = {
                    let snapshot = rx.borrow_and_update();
                    let fire = snapshot.assigned != assigned || (deep && snapshot.mutated != mutated);
                    assigned = snapshot.assigned;
                    mutated = snapshot.mutated;
                    fire.then(|| snapshot.value.clone())
                };
                if let Some(value) = fired {
                    callback(&value);
                }
            }
        });

        WatchHandle::new(move || task.abort())
    }

    /// Waits until `predicate` holds for the current value and returns that value.
    /// Returns immediately if it already holds.
    pub async fn until(&self, mut predicate: impl FnMut(&T) -> bool) -> T {
        let mut rx = self.inner.state.subscribe();
        let matched = rx
            .wait_for(|snapshot| predicate(&snapshot.value))
            .await
            .map(|snapshot| snapshot.value.clone());
        // `self` keeps the sender alive, so the wait cannot observe a closed channel.
        matched.unwrap_or_else(|_| self.get())
    }

    fn notify_sync(&self, change: Change) {
        let callbacks: Vec<Callback<T>> = self
            .inner
            .lock_sync_watchers()
            .iter()
            .filter(|watcher| change == Change::Assigned || watcher.deep)
            .map(|watcher| Arc::clone(&watcher.callback))
            .collect();
        if callbacks.is_empty() {
            return;
        }

        let value = self.get();
        for callback in callbacks {
            callback(&value);
        }
    }
}

impl<T: Clone + PartialEq + Send + Sync + Default + 'static> Default for Cell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
