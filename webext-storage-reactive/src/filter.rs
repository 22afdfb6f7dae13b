//! Gates deciding whether a watcher firing proceeds.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Predicate consulted before each watcher callback.
#[derive(Clone)]
pub struct EventFilter {
    allow: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl EventFilter {
    pub fn new(allow: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self {
            allow: Arc::new(allow),
        }
    }

    /// Returns true if the pending callback should run.
    pub fn allows(&self) -> bool {
        (self.allow)()
    }
}

impl fmt::Debug for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventFilter").finish_non_exhaustive()
    }
}

/// Filter that drops firings while paused. Firings skipped during a pause
/// are not replayed on resume.
#[derive(Debug, Clone)]
pub struct PausableFilter {
    active: Arc<AtomicBool>,
}

impl PausableFilter {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn pause(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn filter(&self) -> EventFilter {
        let active = Arc::clone(&self.active);
        EventFilter::new(move || active.load(Ordering::SeqCst))
    }
}

impl Default for PausableFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&PausableFilter> for EventFilter {
    fn from(pausable: &PausableFilter) -> Self {
        pausable.filter()
    }
}
