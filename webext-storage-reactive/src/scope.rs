//! Disposal scopes.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

type Cleanup = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct ScopeState {
    disposed: bool,
    cleanups: Vec<Cleanup>,
}

/// Owner of cleanup actions that run once, in registration order, when the
/// scope is disposed. Clones share the same scope.
#[derive(Clone, Default)]
pub struct Scope {
    state: Arc<Mutex<ScopeState>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_state(&self) -> MutexGuard<'_, ScopeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers `cleanup`. On an already-disposed scope it runs immediately.
    pub fn on_dispose(&self, cleanup: impl FnOnce() + Send + 'static) {
        {
            let mut state = self.lock_state();
            if !state.disposed {
                state.cleanups.push(Box::new(cleanup));
                return;
            }
        }
        cleanup();
    }

    /// Runs every registered cleanup. Later calls are no-ops.
    pub fn dispose(&self) {
        let cleanups = {
            let mut state = self.lock_state();
            if state.disposed {
                return;
            }
            state.disposed = true;
            std::mem::take(&mut state.cleanups)
        };

        debug!("disposing scope with {} cleanup(s)", cleanups.len());
        for cleanup in cleanups {
            cleanup();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.lock_state().disposed
    }

    /// Number of cleanups waiting for disposal.
    pub fn pending_cleanups(&self) -> usize {
        self.lock_state().cleanups.len()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock_state();
        f.debug_struct("Scope")
            .field("disposed", &state.disposed)
            .field("pending_cleanups", &state.cleanups.len())
            .finish()
    }
}

/// Registers `cleanup` on `scope` if there is one. Returns false when no
/// scope was given, in which case `cleanup` is dropped without running.
pub fn try_on_scope_dispose(scope: Option<&Scope>, cleanup: impl FnOnce() + Send + 'static) -> bool {
    match scope {
        Some(scope) => {
            scope.on_dispose(cleanup);
            true
        }
        None => false,
    }
}
