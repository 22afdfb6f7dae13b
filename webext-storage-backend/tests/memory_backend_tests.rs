use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::{Arc, Mutex};
use webext_storage_backend::{
    AreaStorage, BackendCall, BackendError, Changes, Items, MemoryBackend, Operation,
    StorageArea, StorageBackend, StorageChange,
};

type Seen = Arc<Mutex<Vec<(Changes, StorageArea)>>>;

fn record_changes(backend: &MemoryBackend) -> Seen {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    backend.on_changed().add_listener(Arc::new(move |changes: &Changes, area: StorageArea| {
        sink.lock().unwrap().push((changes.clone(), area));
    }));
    seen
}

#[tokio::test]
async fn get_absent_key_returns_empty_map() {
    let backend = MemoryBackend::new();
    let items = backend.get(StorageArea::Local, "missing").await.unwrap();
    assert!(items.is_empty());
    assert_eq!(backend.count(Operation::Get), 1);
}

#[tokio::test]
async fn set_then_get_returns_value() {
    let backend = Arc::new(MemoryBackend::new());
    let storage = AreaStorage::new(backend.clone(), StorageArea::Local);
    assert_eq!(storage.get_item("k").await.unwrap(), None);

    storage.set_item("k", json!({"theme": "dark"})).await.unwrap();

    assert_eq!(storage.get_item("k").await.unwrap(), Some(json!({"theme": "dark"})));
    assert_eq!(backend.value(StorageArea::Local, "k"), Some(json!({"theme": "dark"})));
}

#[tokio::test]
async fn areas_are_isolated() {
    let backend = MemoryBackend::new();
    backend.seed(StorageArea::Sync, "k", json!(1));

    assert_eq!(backend.value(StorageArea::Sync, "k"), Some(json!(1)));
    assert_eq!(backend.value(StorageArea::Local, "k"), None);
    assert!(backend.items(StorageArea::Local).is_empty());
}

#[tokio::test]
async fn set_emits_change_with_old_and_new_value() {
    let backend = MemoryBackend::new();
    backend.seed(StorageArea::Local, "k", json!("old"));
    let seen = record_changes(&backend);

    let mut items = Items::new();
    items.insert("k".into(), json!("new"));
    backend.set(StorageArea::Local, items).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1, "notification must fire before set returns");
    let (changes, area) = &seen[0];
    assert_eq!(*area, StorageArea::Local);
    assert_eq!(
        changes.get("k"),
        Some(&StorageChange::new(Some(json!("old")), Some(json!("new"))))
    );
}

#[tokio::test]
async fn set_with_unchanged_value_does_not_notify() {
    let backend = MemoryBackend::new();
    backend.seed(StorageArea::Local, "k", json!(5));
    let seen = record_changes(&backend);

    let mut items = Items::new();
    items.insert("k".into(), json!(5));
    backend.set(StorageArea::Local, items).await.unwrap();

    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(backend.count(Operation::Set), 1);
}

#[tokio::test]
async fn remove_emits_removal_only_when_present() {
    let backend = MemoryBackend::new();
    backend.seed(StorageArea::Local, "k", json!(true));
    let seen = record_changes(&backend);

    backend.remove(StorageArea::Local, "k").await.unwrap();
    backend.remove(StorageArea::Local, "k").await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].0["k"].is_removal());
    assert_eq!(backend.value(StorageArea::Local, "k"), None);
    assert_eq!(backend.count(Operation::Remove), 2);
}

#[tokio::test]
async fn managed_area_rejects_writes() {
    let backend = Arc::new(MemoryBackend::new());
    let storage = AreaStorage::new(backend.clone(), StorageArea::Managed);
    let err = storage.set_item("policy", json!("x")).await.unwrap_err();
    assert_eq!(err, BackendError::ReadOnly(StorageArea::Managed));
    assert_eq!(backend.value(StorageArea::Managed, "policy"), None);

    let err = storage.remove_item("policy").await.unwrap_err();
    assert_eq!(err, BackendError::ReadOnly(StorageArea::Managed));
}

#[tokio::test]
async fn managed_area_is_readable_after_seed() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed(StorageArea::Managed, "policy", json!({"enabled": true}));
    let storage = AreaStorage::new(backend, StorageArea::Managed);
    assert_eq!(
        storage.get_item("policy").await.unwrap(),
        Some(json!({"enabled": true}))
    );
}

#[tokio::test]
async fn injected_failures_are_consumed_in_order() {
    let backend = MemoryBackend::new();
    backend.fail_next(Operation::Get, BackendError::Unavailable("first".into()));
    backend.fail_next(Operation::Get, BackendError::PermissionDenied("second".into()));

    let first = backend.get(StorageArea::Local, "k").await.unwrap_err();
    let second = backend.get(StorageArea::Local, "k").await.unwrap_err();
    let third = backend.get(StorageArea::Local, "k").await;

    assert_eq!(first, BackendError::Unavailable("first".into()));
    assert_eq!(second, BackendError::PermissionDenied("second".into()));
    assert!(third.is_ok());
    assert_eq!(backend.count(Operation::Get), 3, "failed calls are still recorded");
}

#[tokio::test]
async fn failed_set_leaves_store_untouched() {
    let backend = MemoryBackend::new();
    let seen = record_changes(&backend);
    backend.fail_next(Operation::Set, BackendError::QuotaExceeded("QUOTA_BYTES".into()));

    let mut items = Items::new();
    items.insert("k".into(), json!("big"));
    let err = backend.set(StorageArea::Sync, items).await.unwrap_err();

    assert!(matches!(err, BackendError::QuotaExceeded(_)));
    assert_eq!(backend.value(StorageArea::Sync, "k"), None);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn external_writes_notify_but_are_not_recorded() {
    let backend = MemoryBackend::new();
    let seen = record_changes(&backend);

    backend.set_external(StorageArea::Local, "k", json!(1));
    backend.remove_external(StorageArea::Local, "k");

    assert!(backend.calls().is_empty());
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn clear_reports_every_removed_key() {
    let backend = MemoryBackend::new();
    backend.seed(StorageArea::Local, "a", json!(1));
    backend.seed(StorageArea::Local, "b", json!(2));
    let seen = record_changes(&backend);

    backend.clear(StorageArea::Local);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0.len(), 2);
    assert!(backend.items(StorageArea::Local).is_empty());
}

#[tokio::test]
async fn calls_are_recorded_in_order() {
    let backend = Arc::new(MemoryBackend::new());
    let storage = AreaStorage::new(backend.clone(), StorageArea::Sync);

    storage.get_item("k").await.unwrap();
    storage.set_item("k", json!([1, 2])).await.unwrap();
    storage.remove_item("k").await.unwrap();

    let mut expected_items = Items::new();
    expected_items.insert("k".into(), json!([1, 2]));
    assert_eq!(
        backend.calls(),
        vec![
            BackendCall::Get {
                area: StorageArea::Sync,
                key: "k".into()
            },
            BackendCall::Set {
                area: StorageArea::Sync,
                items: expected_items
            },
            BackendCall::Remove {
                area: StorageArea::Sync,
                key: "k".into()
            },
        ]
    );
    assert_eq!(backend.set_count("k", &json!([1, 2])), 1);

    backend.clear_calls();
    assert!(backend.calls().is_empty());
}
