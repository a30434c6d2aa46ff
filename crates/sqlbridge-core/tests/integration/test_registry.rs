//! Integration tests for ConnectionRegistry
//!
//! Covers the slot lifecycle, key uniqueness, ordering of the enumerated
//! connections and the best-effort semantics of `close_all`.

use std::sync::Arc;

use sqlbridge_core::config::ConnectionDefaults;
use sqlbridge_core::domain::{BridgeError, ConnectionOptions};
use sqlbridge_core::ConnectionRegistry;

use crate::common::StubSqliteBackend;

fn setup() -> (Arc<StubSqliteBackend>, ConnectionRegistry<StubSqliteBackend>) {
    let backend = Arc::new(StubSqliteBackend::new());
    let registry = ConnectionRegistry::new(Arc::clone(&backend), ConnectionDefaults::default());
    (backend, registry)
}

fn read_only() -> ConnectionOptions {
    ConnectionOptions::new().with_read_only(true)
}

#[tokio::test]
async fn test_create_duplicate_close_retrieve() {
    let (backend, registry) = setup();

    let conn = registry
        .create("testDB", &ConnectionOptions::new())
        .await
        .expect("create failed");
    assert_eq!(conn.name(), "testDB");
    assert!(!conn.read_only());
    assert_eq!(conn.options().version, 1);

    let err = registry
        .create("testDB", &ConnectionOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err, BridgeError::AlreadyExists("testDB".to_string()));
    assert_eq!(backend.count("open"), 1);

    registry.close("testDB", false).await.expect("close failed");
    assert_eq!(backend.count("close"), 1);

    let err = registry.retrieve("testDB", false).await.unwrap_err();
    assert_eq!(err, BridgeError::NotFound("testDB".to_string()));
}

#[tokio::test]
async fn test_retrieve_all_then_close_all() {
    let (backend, registry) = setup();

    registry.create("first", &ConnectionOptions::new()).await.unwrap();
    registry.create("second", &ConnectionOptions::new()).await.unwrap();

    let all = registry.retrieve_all().await;
    assert_eq!(all.keys(), vec!["first", "second"]);

    let report = registry.close_all().await;
    assert!(report.is_clean());
    assert_eq!(report.closed, vec!["first".to_string(), "second".to_string()]);
    assert_eq!(backend.count("close"), 2);

    assert!(registry.retrieve_all().await.is_empty());
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_retrieve_returns_stored_connection() {
    let (backend, registry) = setup();

    let created = registry.create("testDB", &ConnectionOptions::new()).await.unwrap();
    let calls_before = backend.call_count();

    let first = registry.retrieve("testDB", false).await.unwrap();
    let second = registry.retrieve("testDB", false).await.unwrap();

    assert!(Arc::ptr_eq(&created, &first));
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(backend.call_count(), calls_before);
}

#[tokio::test]
async fn test_read_only_and_read_write_coexist() {
    let (_backend, registry) = setup();

    let rw = registry.create("testDB", &ConnectionOptions::new()).await.unwrap();
    let ro = registry.create("testDB", &read_only()).await.unwrap();

    assert_ne!(rw.id(), ro.id());
    assert!(ro.handle().read_only);
    assert!(registry.contains("testDB", false).await);
    assert!(registry.contains("testDB", true).await);

    let all = registry.retrieve_all().await;
    assert_eq!(all.keys(), vec!["testDB", "RO_testDB"]);
    assert!(Arc::ptr_eq(all.get("RO_testDB").unwrap(), &ro));

    registry.close("testDB", true).await.unwrap();
    assert!(registry.contains("testDB", false).await);
    assert!(!registry.contains("testDB", true).await);
}

#[tokio::test]
async fn test_create_rejects_empty_name_without_backend_call() {
    let (backend, registry) = setup();

    let err = registry.create("", &ConnectionOptions::new()).await.unwrap_err();

    assert!(matches!(err, BridgeError::InvalidArgument(msg) if msg == "Must provide a database name"));
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_failed_open_leaves_registry_untouched() {
    let (backend, registry) = setup();
    registry.create("first", &ConnectionOptions::new()).await.unwrap();
    backend.fail_open_for("broken");

    let err = registry.create("broken", &ConnectionOptions::new()).await.unwrap_err();

    match err {
        BridgeError::Backing(e) => assert_eq!(e.message, "Open: cannot open broken"),
        other => panic!("expected Backing, got {other:?}"),
    }
    assert_eq!(registry.retrieve_all().await.keys(), vec!["first"]);

    // A later successful open takes the slot normally
    backend.clear_failures();
    registry.create("broken", &ConnectionOptions::new()).await.unwrap();
    assert_eq!(registry.len().await, 2);
}

#[tokio::test]
async fn test_failed_close_keeps_entry() {
    let (backend, registry) = setup();
    let conn = registry.create("testDB", &ConnectionOptions::new()).await.unwrap();
    backend.fail_close_for("testDB");

    let err = registry.close("testDB", false).await.unwrap_err();

    match err {
        BridgeError::Backing(e) => {
            assert_eq!(e.message, "Close: cannot close testDB");
            assert_eq!(e.payload, Some(serde_json::json!({"serial": conn.handle().serial})));
        }
        other => panic!("expected Backing, got {other:?}"),
    }
    let still = registry.retrieve("testDB", false).await.unwrap();
    assert!(Arc::ptr_eq(&still, &conn));
}

#[tokio::test]
async fn test_close_unknown_key_is_not_found() {
    let (backend, registry) = setup();
    registry.create("testDB", &ConnectionOptions::new()).await.unwrap();

    let err = registry.close("testDB", true).await.unwrap_err();

    assert_eq!(err, BridgeError::NotFound("RO_testDB".to_string()));
    assert_eq!(backend.count("close"), 0);
}

#[tokio::test]
async fn test_close_all_is_best_effort() {
    let (backend, registry) = setup();
    registry.create("first", &ConnectionOptions::new()).await.unwrap();
    registry.create("second", &ConnectionOptions::new()).await.unwrap();
    registry.create("third", &read_only()).await.unwrap();
    backend.fail_close_for("second");

    let report = registry.close_all().await;

    assert!(!report.is_clean());
    assert_eq!(report.closed, vec!["first".to_string(), "RO_third".to_string()]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, "second");
    assert_eq!(backend.count("close"), 3);
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_close_all_on_empty_registry() {
    let (backend, registry) = setup();

    let report = registry.close_all().await;

    assert!(report.is_clean());
    assert!(report.closed.is_empty());
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_name_can_be_reused_after_close() {
    let (backend, registry) = setup();

    let first = registry.create("testDB", &ConnectionOptions::new()).await.unwrap();
    registry.close("testDB", false).await.unwrap();
    let second = registry.create("testDB", &ConnectionOptions::new()).await.unwrap();

    assert_ne!(first.id(), second.id());
    assert_eq!(backend.closed_serials(), vec![first.handle().serial]);
}

#[tokio::test]
async fn test_concurrent_create_admits_one() {
    let (backend, registry) = setup();
    let registry = Arc::new(registry);

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                registry.create("shared", &ConnectionOptions::new()).await
            })
        })
        .collect();

    let mut created = 0;
    let mut duplicates = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => created += 1,
            Err(BridgeError::AlreadyExists(_)) => duplicates += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(duplicates, 7);
    assert_eq!(backend.count("open"), 1);
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn test_shutdown_releases_everything() {
    let (backend, registry) = setup();
    registry.create("first", &ConnectionOptions::new()).await.unwrap();
    registry.create("second", &read_only()).await.unwrap();

    let report = registry.shutdown().await;

    assert_eq!(report.closed.len(), 2);
    assert_eq!(backend.closed_serials().len(), 2);
}
