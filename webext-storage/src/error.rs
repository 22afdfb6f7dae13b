//! Sync error types and the error slot.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;
use webext_storage_backend::{BackendError, StorageArea};
use webext_storage_reactive::Cell;

/// Errors recorded while loading or persisting a key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("failed to read `{key}` from {area} storage: {source}")]
    Read {
        key: String,
        area: StorageArea,
        #[source]
        source: BackendError,
    },

    #[error("failed to write `{key}` to {area} storage: {source}")]
    Write {
        key: String,
        area: StorageArea,
        #[source]
        source: BackendError,
    },

    #[error("failed to remove `{key}` from {area} storage: {source}")]
    Remove {
        key: String,
        area: StorageArea,
        #[source]
        source: BackendError,
    },

    #[error("stored value for `{key}` could not be decoded: {message}")]
    Decode { key: String, message: String },

    #[error("value for `{key}` could not be encoded: {message}")]
    Encode { key: String, message: String },
}

/// Which half of the protocol an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Loading: backend reads and decoding stored values.
    Read,
    /// Persisting: writes, removals, default seeding, and encoding.
    Write,
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::Read { .. } | StorageError::Decode { .. } => ErrorKind::Read,
            StorageError::Write { .. } | StorageError::Remove { .. } | StorageError::Encode { .. } => {
                ErrorKind::Write
            }
        }
    }

    /// The backend failure behind this error, if any.
    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            StorageError::Read { source, .. }
            | StorageError::Write { source, .. }
            | StorageError::Remove { source, .. } => Some(source),
            StorageError::Decode { .. } | StorageError::Encode { .. } => None,
        }
    }
}

/// Callback notified of every recorded error, after the slot is updated.
pub type ErrorHook = Arc<dyn Fn(&StorageError) + Send + Sync>;

/// Last error seen by a sync core. Each new error replaces the previous
/// one; the slot is never cleared.
#[derive(Clone)]
pub struct ErrorSlot {
    cell: Cell<Option<StorageError>>,
    hook: Option<ErrorHook>,
}

impl ErrorSlot {
    pub(crate) fn new(hook: Option<ErrorHook>) -> Self {
        Self {
            cell: Cell::new(None),
            hook,
        }
    }

    /// The most recent error, if any.
    pub fn get(&self) -> Option<StorageError> {
        self.cell.get()
    }

    pub fn is_set(&self) -> bool {
        self.cell.with(Option::is_some)
    }

    /// Observable view of the slot.
    pub fn cell(&self) -> &Cell<Option<StorageError>> {
        &self.cell
    }

    pub(crate) fn record(&self, error: StorageError) {
        warn!("{error}");
        self.cell.set(Some(error.clone()));
        if let Some(hook) = &self.hook {
            hook(&error);
        }
    }
}

impl fmt::Debug for ErrorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorSlot")
            .field("error", &self.get())
            .field("has_hook", &self.hook.is_some())
            .finish()
    }
}
