//! Backend error types.

use crate::area::StorageArea;
use thiserror::Error;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors reported by a storage backend.
///
/// Payloads are plain strings so errors can be cloned into observable state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("storage quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("storage area `{0}` is read-only")]
    ReadOnly(StorageArea),

    #[error("unknown storage area: {0}")]
    UnknownArea(String),

    #[error("storage backend error: {0}")]
    Other(String),
}
