//! Integration tests for StorageHook
//!
//! Exercises default filling, the `set_table` reply mapping, the empty-list
//! fallbacks and the gate, against the in-memory storage stub.

use std::sync::Arc;

use sqlbridge_core::config::StorageDefaults;
use sqlbridge_core::domain::{
    BridgeError, EncryptionMode, KeyValue, Platform, SetTableResult, StoreOptions,
};
use sqlbridge_core::ports::StaticHost;
use sqlbridge_core::{StorageHook, UnavailableReason};

use crate::common::{native_only_descriptor, storage_hook, web_host, StubStorageBackend};

async fn opened(backend: &Arc<StubStorageBackend>) -> StorageHook<StubStorageBackend> {
    let hook = storage_hook(backend);
    assert!(hook.open_store(&StoreOptions::new()).await.unwrap());
    hook
}

#[tokio::test]
async fn test_open_store_fills_defaults() {
    let backend = Arc::new(StubStorageBackend::new());
    let hook = storage_hook(&backend);

    assert!(hook.open_store(&StoreOptions::new()).await.unwrap());
    assert!(hook
        .open_store(&StoreOptions::new().with_database("myStore").with_table(""))
        .await
        .unwrap());

    let requests = backend.opened();
    assert_eq!(requests[0].database, "storage");
    assert_eq!(requests[0].table, "storage_table");
    assert!(!requests[0].encrypted);
    assert_eq!(requests[0].mode, EncryptionMode::NoEncryption);
    assert_eq!(requests[1].database, "myStore");
    assert_eq!(requests[1].table, "storage_table");
}

#[tokio::test]
async fn test_set_get_remove_round() {
    let backend = Arc::new(StubStorageBackend::new());
    let hook = opened(&backend).await;

    hook.set_item("session", "abc").await.unwrap();
    hook.set_item("theme", "dark").await.unwrap();
    hook.set_item("session", "xyz").await.unwrap();

    assert_eq!(hook.get_item("session").await.unwrap().as_deref(), Some("xyz"));
    assert_eq!(hook.get_item("missing").await.unwrap(), None);
    assert!(hook.is_key("theme").await.unwrap());
    assert!(!hook.is_key("missing").await.unwrap());

    assert_eq!(hook.get_all_keys().await.unwrap(), vec!["session", "theme"]);
    assert_eq!(hook.get_all_values().await.unwrap(), vec!["xyz", "dark"]);
    assert_eq!(
        hook.get_all_keys_values().await.unwrap(),
        vec![KeyValue::new("session", "xyz"), KeyValue::new("theme", "dark")]
    );

    assert!(hook.remove_item("session").await.unwrap());
    assert!(!hook.remove_item("session").await.unwrap());
    assert!(hook.clear().await.unwrap());
    assert!(hook.get_all_keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_value_reads_as_none() {
    let backend = Arc::new(StubStorageBackend::new());
    let hook = opened(&backend).await;

    hook.set_item("blank", "").await.unwrap();

    assert_eq!(hook.get_item("blank").await.unwrap(), None);
    assert!(hook.is_key("blank").await.unwrap());
}

#[tokio::test]
async fn test_set_table_maps_replies() {
    let backend = Arc::new(StubStorageBackend::new());
    let hook = storage_hook(&backend);

    // No store opened yet: the backend reports a message
    let result = hook.set_table("saved").await.unwrap();
    assert_eq!(
        result,
        SetTableResult {
            result: false,
            message: "SetTable: Must open a store first".to_string(),
        }
    );

    hook.open_store(&StoreOptions::new()).await.unwrap();
    let result = hook.set_table("saved").await.unwrap();
    assert!(result.result);
    assert!(result.message.is_empty());
    assert_eq!(backend.current_table().as_deref(), Some("saved"));

    hook.set_table("").await.unwrap();
    assert_eq!(backend.current_table().as_deref(), Some("storage_table"));
}

#[tokio::test]
async fn test_tables_are_independent() {
    let backend = Arc::new(StubStorageBackend::new());
    let hook = opened(&backend).await;

    hook.set_item("key", "default").await.unwrap();
    hook.set_table("other").await.unwrap();
    assert_eq!(hook.get_item("key").await.unwrap(), None);

    hook.set_item("key", "other").await.unwrap();
    hook.set_table("").await.unwrap();
    assert_eq!(hook.get_item("key").await.unwrap().as_deref(), Some("default"));
}

#[tokio::test]
async fn test_missing_reply_fields_fall_back() {
    let backend = Arc::new(StubStorageBackend::sparse());
    let hook = storage_hook(&backend);

    assert!(!hook.open_store(&StoreOptions::new()).await.unwrap());
    assert_eq!(
        hook.set_table("saved").await.unwrap(),
        SetTableResult {
            result: false,
            message: "Error in setTable".to_string(),
        }
    );
    hook.set_item("key", "value").await.unwrap();
    assert_eq!(hook.get_item("key").await.unwrap(), None);
    assert!(!hook.remove_item("key").await.unwrap());
    assert!(!hook.is_key("key").await.unwrap());
    assert!(!hook.clear().await.unwrap());
    assert!(hook.get_all_keys().await.unwrap().is_empty());
    assert!(hook.get_all_values().await.unwrap().is_empty());
    assert!(hook.get_all_keys_values().await.unwrap().is_empty());
    assert!(!hook.delete_store(&StoreOptions::new()).await.unwrap());
}

#[tokio::test]
async fn test_set_item_surfaces_rejection() {
    let backend = Arc::new(StubStorageBackend::rejecting_set());
    let hook = opened(&backend).await;

    let err = hook.set_item("key", "value").await.unwrap_err();

    match err {
        BridgeError::Backing(e) => assert_eq!(e.message, "Set: store is read-only"),
        other => panic!("expected Backing, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_key_is_rejected_before_backend() {
    let backend = Arc::new(StubStorageBackend::new());
    let hook = opened(&backend).await;
    let baseline = backend.call_count();

    for err in [
        hook.get_item("").await.unwrap_err(),
        hook.set_item("", "value").await.unwrap_err(),
        hook.remove_item("").await.unwrap_err(),
        hook.is_key("").await.unwrap_err(),
    ] {
        assert!(matches!(err, BridgeError::InvalidArgument(msg) if msg == "Must provide a key"));
    }
    assert_eq!(backend.call_count(), baseline);
}

#[tokio::test]
async fn test_delete_store_defaults_database() {
    let backend = Arc::new(StubStorageBackend::new());
    let hook = opened(&backend).await;
    hook.set_item("key", "value").await.unwrap();

    assert!(hook.delete_store(&StoreOptions::new()).await.unwrap());

    assert_eq!(backend.current_table(), None);
    assert_eq!(backend.calls().last().map(String::as_str), Some("delete_store"));
}

#[tokio::test]
async fn test_unavailable_hook_never_reaches_backend() {
    let backend = Arc::new(StubStorageBackend::new());
    let hook = StorageHook::new(
        Arc::clone(&backend),
        &web_host(),
        &native_only_descriptor(),
        StorageDefaults::default(),
    );

    assert!(!hook.is_available());
    let opts = StoreOptions::new();
    assert!(hook.open_store(&opts).await.unwrap_err().is_not_available());
    assert!(hook.set_table("t").await.unwrap_err().is_not_available());
    assert!(hook.get_item("k").await.unwrap_err().is_not_available());
    assert!(hook.get_item("").await.unwrap_err().is_not_available());
    assert!(hook.set_item("k", "v").await.unwrap_err().is_not_available());
    assert!(hook.remove_item("k").await.unwrap_err().is_not_available());
    assert!(hook.clear().await.unwrap_err().is_not_available());
    assert!(hook.is_key("k").await.unwrap_err().is_not_available());
    assert!(hook.get_all_keys().await.unwrap_err().is_not_available());
    assert!(hook.get_all_values().await.unwrap_err().is_not_available());
    assert!(hook.get_all_keys_values().await.unwrap_err().is_not_available());
    assert!(hook.delete_store(&opts).await.unwrap_err().is_not_available());

    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_storage_plugin_must_be_registered() {
    let backend = Arc::new(StubStorageBackend::new());
    let host = StaticHost::new(Platform::android());
    let hook = StorageHook::new(
        backend,
        &host,
        &sqlbridge_core::domain::CapabilityDescriptor::builtin(),
        StorageDefaults::default(),
    );

    let unavailable = hook.unavailable().expect("should be unavailable");
    assert_eq!(unavailable.reason, UnavailableReason::PluginNotRegistered);
    assert_eq!(unavailable.capability, "use-storage");
}
