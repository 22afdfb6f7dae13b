use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use webext_storage_backend::{ChangeListener, ListenerId, StorageBackend};

#[derive(Default)]
struct SlotState {
    registered: Option<ListenerId>,
    closed: bool,
}

/// Holds at most one change-listener registration on a backend.
///
/// Once closed, the slot refuses new registrations, so writes still in
/// flight at disposal cannot re-register.
pub struct ListenerSlot {
    backend: Arc<dyn StorageBackend>,
    state: Mutex<SlotState>,
}

impl ListenerSlot {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            state: Mutex::new(SlotState::default()),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers `listener` unless one is already registered or the slot is
    /// closed. Returns true if a registration was made.
    pub fn attach(&self, listener: ChangeListener) -> bool {
        let mut state = self.lock_state();
        if state.closed || state.registered.is_some() {
            return false;
        }
        state.registered = Some(self.backend.on_changed().add_listener(listener));
        true
    }

    /// Removes the current registration. Returns true if one existed.
    pub fn detach(&self) -> bool {
        let registered = self.lock_state().registered.take();
        match registered {
            Some(id) => self.backend.on_changed().remove_listener(id),
            None => false,
        }
    }

    /// Detaches and refuses all future registrations.
    pub fn close(&self) {
        self.lock_state().closed = true;
        if self.detach() {
            debug!("change listener removed on close");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.lock_state().registered.is_some()
    }
}

impl fmt::Debug for ListenerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock_state();
        f.debug_struct("ListenerSlot")
            .field("registered", &state.registered)
            .field("closed", &state.closed)
            .finish()
    }
}
