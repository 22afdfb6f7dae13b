//! Backend contract for webext-storage.
//!
//! Models the extension storage API as an explicit dependency:
//! - [`StorageBackend`]: async `get`/`set`/`remove` per [`StorageArea`], plus
//!   the global [`ChangeEvents`] notification hub (`storage.onChanged`)
//! - [`AreaStorage`]: single-area adapter exposing `get_item`/`set_item`/`remove_item`
//! - [`MemoryBackend`]: in-process backend that records calls, injects
//!   failures, and fires change notifications synchronously like a browser

mod adapter;
mod area;
mod backend;
mod change;
mod error;
mod memory;

pub use adapter::AreaStorage;
pub use area::StorageArea;
pub use backend::StorageBackend;
pub use change::{ChangeEvents, ChangeListener, Changes, Items, ListenerId, StorageChange};
pub use error::{BackendError, BackendResult};
pub use memory::{BackendCall, MemoryBackend, Operation};
