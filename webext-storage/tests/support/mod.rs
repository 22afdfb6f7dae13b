//! Shared helpers for sync integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use webext_storage::{MemoryBackend, StorageArea, StorageOptions, StorageValue, WebextStorage};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("webext_storage=debug,webext_storage_backend=debug"))
        .with_test_writer()
        .try_init();
}

/// Lets spawned tasks and post-flush watchers run to completion.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

pub fn listening() -> StorageOptions {
    StorageOptions::new().listen_to_storage_changes(true)
}

/// Syncs `key` in the local area of `backend`.
pub fn local<T: StorageValue>(
    backend: &Arc<MemoryBackend>,
    key: &str,
    initial: T,
    options: StorageOptions,
) -> WebextStorage<T> {
    webext_storage::use_webext_storage(
        backend.clone(),
        key,
        StorageArea::Local,
        initial,
        options,
    )
}
