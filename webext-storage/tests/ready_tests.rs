mod support;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use support::{local, settle};
use webext_storage::{
    ChangeEvents, MemoryBackend, StorageArea, StorageBackend, StorageOptions, use_webext_storage,
};
use webext_storage_backend::{BackendResult, Items};

/// Backend whose reads never complete.
#[derive(Default)]
struct StalledBackend {
    events: ChangeEvents,
}

#[async_trait]
impl StorageBackend for StalledBackend {
    async fn get(&self, _area: StorageArea, _key: &str) -> BackendResult<Items> {
        std::future::pending().await
    }

    async fn set(&self, _area: StorageArea, _items: Items) -> BackendResult<()> {
        Ok(())
    }

    async fn remove(&self, _area: StorageArea, _key: &str) -> BackendResult<()> {
        Ok(())
    }

    fn on_changed(&self) -> &ChangeEvents {
        &self.events
    }
}

#[tokio::test]
async fn bundle_is_usable_before_first_load() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed(StorageArea::Local, "theme", serde_json::json!("dark"));

    let storage = local(&backend, "theme", "light".to_string(), StorageOptions::new());

    assert!(!storage.is_ready().get());
    assert_eq!(storage.data().get(), "light");

    settle().await;
    assert!(storage.is_ready().get());
    assert_eq!(storage.data().get(), "dark");
}

#[tokio::test]
async fn awaiting_resolves_after_first_load() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed(StorageArea::Local, "theme", serde_json::json!("dark"));

    let storage = local(&backend, "theme", "light".to_string(), StorageOptions::new()).await;

    assert!(storage.is_ready().get());
    assert_eq!(storage.data().get(), "dark");
}

#[tokio::test]
async fn awaiting_twice_resolves_immediately() {
    let backend = Arc::new(MemoryBackend::new());
    let storage = local(&backend, "theme", "light".to_string(), StorageOptions::new()).await;

    let again = storage.clone().await;
    assert_eq!(again.data().get(), storage.data().get());
}

#[tokio::test]
async fn ready_within_succeeds_for_fast_backend() {
    let backend = Arc::new(MemoryBackend::new());
    let storage = local(&backend, "theme", "light".to_string(), StorageOptions::new());

    let storage = storage
        .ready_within(Duration::from_secs(1))
        .await
        .expect("memory backend loads immediately");
    assert!(storage.is_ready().get());
}

#[tokio::test(start_paused = true)]
async fn ready_within_rejects_stalled_load() {
    let backend = Arc::new(StalledBackend::default());
    let storage = use_webext_storage::<String>(
        backend,
        "theme",
        StorageArea::Local,
        "light".to_string(),
        StorageOptions::new(),
    );

    let storage = storage
        .ready_within(Duration::from_millis(500))
        .await
        .expect_err("load never completes");

    assert!(!storage.is_ready().get());
    assert_eq!(storage.data().get(), "light");
}

#[tokio::test]
async fn state_view_shares_cells_with_bundle() {
    let backend = Arc::new(MemoryBackend::new());
    let storage = local(&backend, "theme", "light".to_string(), StorageOptions::new()).await;
    let handle = storage.clone();

    let state = storage.into_state();
    state.data.set("dark".to_string());

    assert_eq!(handle.data().get(), "dark");
    assert_eq!(state.error.get(), handle.error().get());
    assert!(handle.core().is_pinned());
}

#[tokio::test]
async fn data_view_shares_cell_with_bundle() {
    let backend = Arc::new(MemoryBackend::new());
    let storage = local(&backend, "theme", "light".to_string(), StorageOptions::new()).await;
    let handle = storage.clone();

    let data = storage.into_data();
    data.set("dark".to_string());

    assert_eq!(handle.data().get(), "dark");
    assert_eq!(handle.key(), "theme");
    assert_eq!(handle.area(), StorageArea::Local);
}

#[tokio::test]
async fn debug_output_names_key_and_area() {
    let backend = Arc::new(MemoryBackend::new());
    let storage = local(&backend, "theme", "light".to_string(), StorageOptions::new()).await;

    let debug = format!("{storage:?}");
    assert!(debug.contains("theme"));
    assert!(debug.contains("Local"));
}
