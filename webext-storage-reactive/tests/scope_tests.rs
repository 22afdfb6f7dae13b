use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use webext_storage_reactive::{Scope, try_on_scope_dispose};

#[test]
fn dispose_runs_cleanups_in_registration_order() {
    let scope = Scope::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    for i in 0..3 {
        let order = Arc::clone(&order);
        scope.on_dispose(move || order.lock().unwrap().push(i));
    }
    assert_eq!(scope.pending_cleanups(), 3);

    scope.dispose();
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    assert!(scope.is_disposed());
    assert_eq!(scope.pending_cleanups(), 0);
}

#[test]
fn dispose_twice_runs_cleanups_once() {
    let scope = Scope::new();
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    scope.on_dispose(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    scope.dispose();
    scope.dispose();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn registering_on_disposed_scope_runs_immediately() {
    let scope = Scope::new();
    scope.dispose();

    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    scope.on_dispose(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn clones_share_disposal() {
    let scope = Scope::new();
    let clone = scope.clone();
    clone.dispose();
    assert!(scope.is_disposed());
}

#[test]
fn try_on_scope_dispose_without_scope_returns_false() {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let registered = try_on_scope_dispose(None, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert!(!registered);
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn try_on_scope_dispose_with_scope_registers() {
    let scope = Scope::new();
    assert!(try_on_scope_dispose(Some(&scope), || {}));
    assert_eq!(scope.pending_cleanups(), 1);
}
