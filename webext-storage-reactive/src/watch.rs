//! Watcher configuration and handles.

use crate::filter::EventFilter;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// When a watcher callback runs relative to the change that triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flush {
    /// Inline, once per change.
    Sync,
    /// On a spawned task after the current synchronous work yields;
    /// changes made in between coalesce into one call with the latest value.
    #[default]
    Post,
}

/// Options for [`Cell::watch`](crate::Cell::watch).
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    /// Invoke the callback once with the current value when the watch starts.
    pub immediate: bool,
    pub flush: Flush,
    /// Also fire for in-place mutations made through `Cell::update`.
    /// Replacing the value always fires.
    pub deep: bool,
    /// Gate consulted before every callback, including the immediate one.
    pub filter: Option<EventFilter>,
}

impl WatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    pub fn flush(mut self, flush: Flush) -> Self {
        self.flush = flush;
        self
    }

    pub fn deep(mut self, deep: bool) -> Self {
        self.deep = deep;
        self
    }

    pub fn filter(mut self, filter: Option<EventFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub(crate) fn allows(&self) -> bool {
        self.filter.as_ref().is_none_or(EventFilter::allows)
    }
}

type StopFn = Box<dyn FnOnce() + Send>;

/// Handle to an active watcher. Dropping the handle leaves the watcher
/// running; call [`WatchHandle::stop`].
pub struct WatchHandle {
    stop: Mutex<Option<StopFn>>,
}

impl WatchHandle {
    pub(crate) fn new(stop: impl FnOnce() + Send + 'static) -> Self {
        Self {
            stop: Mutex::new(Some(Box::new(stop))),
        }
    }

    fn lock_stop(&self) -> MutexGuard<'_, Option<StopFn>> {
        self.stop.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stops the watcher. Safe to call more than once.
    pub fn stop(&self) {
        let stop = self.lock_stop().take();
        if let Some(stop) = stop {
            stop();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.lock_stop().is_none()
    }
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
