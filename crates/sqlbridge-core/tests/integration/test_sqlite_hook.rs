//! Integration tests for SqliteHook
//!
//! Verifies gating, argument validation before any backend call, and the
//! fallback values substituted when the backend omits a reply field.

use std::sync::Arc;

use serde_json::json;

use sqlbridge_core::config::ConnectionDefaults;
use sqlbridge_core::domain::{
    BridgeError, CapabilityDescriptor, Changes, ConnectionOptions, Platform, PluginId,
};
use sqlbridge_core::ports::{SqlStatement, StaticHost};
use sqlbridge_core::{SqliteHook, UnavailableReason};

use crate::common::{native_only_descriptor, sqlite_hook, web_host, StubSqliteBackend};

fn invalid(err: BridgeError) -> String {
    match err {
        BridgeError::InvalidArgument(msg) => msg,
        other => panic!("expected InvalidArgument, got {other:?}"),
    }
}

// ============================================================================
// Gating
// ============================================================================

#[tokio::test]
async fn test_unavailable_hook_never_reaches_backend() {
    let backend = Arc::new(StubSqliteBackend::new());
    let hook = SqliteHook::new(
        Arc::clone(&backend),
        &web_host(),
        &native_only_descriptor(),
        ConnectionDefaults::default(),
    );

    assert!(!hook.is_available());
    let reason = hook.unavailable().expect("should be unavailable");
    assert_eq!(reason.reason, UnavailableReason::PlatformNotSupported);
    assert_eq!(reason.platform, Platform::web());

    let opts = ConnectionOptions::new();
    assert!(hook.echo("hello").await.unwrap_err().is_not_available());
    assert!(hook.create_connection("testDB", &opts).await.unwrap_err().is_not_available());
    assert!(hook.create_connection("", &opts).await.unwrap_err().is_not_available());
    assert!(hook.retrieve_connection("testDB", false).await.unwrap_err().is_not_available());
    assert!(hook.retrieve_all_connections().await.unwrap_err().is_not_available());
    assert!(hook.is_connection("testDB", false).await.unwrap_err().is_not_available());
    assert!(hook.close_connection("testDB", false).await.unwrap_err().is_not_available());
    assert!(hook.close_all_connections().await.unwrap_err().is_not_available());
    assert!(hook.is_db_exists("testDB").await.unwrap_err().is_not_available());
    assert!(hook.delete_db("testDB").await.unwrap_err().is_not_available());
    assert!(hook.is_json_valid("{}").await.unwrap_err().is_not_available());
    assert!(hook.import_from_json("{}").await.unwrap_err().is_not_available());
    assert!(hook.is_secret_stored().await.unwrap_err().is_not_available());
    assert!(hook.set_encryption_secret("abc").await.unwrap_err().is_not_available());
    assert!(hook
        .change_encryption_secret("abc", "def")
        .await
        .unwrap_err()
        .is_not_available());
    assert!(matches!(
        hook.registry(),
        Err(BridgeError::FeatureNotAvailable(_))
    ));

    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_unregistered_plugin_is_unavailable() {
    let backend = Arc::new(StubSqliteBackend::new());
    let host = StaticHost::new(Platform::ios()).with_plugin(PluginId::DATA_STORAGE);
    let hook = SqliteHook::new(
        Arc::clone(&backend),
        &host,
        &CapabilityDescriptor::builtin(),
        ConnectionDefaults::default(),
    );

    let err = hook.echo("hello").await.unwrap_err();
    match err {
        BridgeError::FeatureNotAvailable(u) => {
            assert_eq!(u.reason, UnavailableReason::PluginNotRegistered);
            assert_eq!(u.plugin, PluginId::SQLITE);
        }
        other => panic!("expected FeatureNotAvailable, got {other:?}"),
    }
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_available_on_every_builtin_platform() {
    for platform in [
        Platform::web(),
        Platform::ios(),
        Platform::android(),
        Platform::electron(),
    ] {
        let host = web_host().with_platform(platform.clone());
        let hook = SqliteHook::new(
            Arc::new(StubSqliteBackend::new()),
            &host,
            &CapabilityDescriptor::builtin(),
            ConnectionDefaults::default(),
        );
        assert!(hook.is_available(), "unavailable on {platform}");
    }
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_empty_arguments_are_rejected_before_backend() {
    let backend = Arc::new(StubSqliteBackend::new());
    let hook = sqlite_hook(&backend);
    let conn = hook
        .create_connection("testDB", &ConnectionOptions::new())
        .await
        .unwrap();
    let baseline = backend.call_count();

    assert_eq!(invalid(hook.execute(&conn, "").await.unwrap_err()), "Statements is empty");
    assert_eq!(invalid(hook.execute_set(&conn, &[]).await.unwrap_err()), "Set is empty");
    assert_eq!(invalid(hook.run(&conn, "", None).await.unwrap_err()), "Statement is empty");
    assert_eq!(invalid(hook.query(&conn, "", None).await.unwrap_err()), "Statement is empty");
    assert_eq!(
        invalid(hook.set_sync_date(&conn, "").await.unwrap_err()),
        "Must provide a synchronization date"
    );
    assert_eq!(
        invalid(hook.export_to_json(&conn, "").await.unwrap_err()),
        "Must provide an export mode"
    );
    assert!(matches!(
        hook.export_to_json(&conn, "delta").await,
        Err(BridgeError::InvalidArgument(_))
    ));
    assert_eq!(
        invalid(hook.is_db_exists("").await.unwrap_err()),
        "Must provide a database name"
    );
    assert_eq!(invalid(hook.delete_db("").await.unwrap_err()), "Must provide a database name");
    assert_eq!(invalid(hook.is_json_valid("").await.unwrap_err()), "Must provide a Json string");
    assert_eq!(
        invalid(hook.import_from_json("").await.unwrap_err()),
        "Must provide a Json string"
    );
    assert_eq!(
        invalid(hook.set_encryption_secret("").await.unwrap_err()),
        "Must provide a passphrase"
    );
    assert_eq!(
        invalid(hook.change_encryption_secret("new", "").await.unwrap_err()),
        "Must provide the old passphrase"
    );

    assert_eq!(backend.call_count(), baseline);
}

#[tokio::test]
async fn test_execute_set_rejects_empty_statement() {
    let backend = Arc::new(StubSqliteBackend::new());
    let hook = sqlite_hook(&backend);
    let conn = hook
        .create_connection("testDB", &ConnectionOptions::new())
        .await
        .unwrap();

    let set = vec![
        SqlStatement::new("INSERT INTO users (name) VALUES (?)").with_values(vec![json!("Alice")]),
        SqlStatement::new(""),
    ];
    let msg = invalid(hook.execute_set(&conn, &set).await.unwrap_err());

    assert_eq!(msg, "Statement 1 of the set is empty");
    assert_eq!(backend.count("execute_set"), 0);
}

// ============================================================================
// Dispatch
// ============================================================================

#[tokio::test]
async fn test_statements_dispatch_to_backend() {
    let backend = Arc::new(StubSqliteBackend::new());
    let hook = sqlite_hook(&backend);
    let conn = hook
        .create_connection("testDB", &ConnectionOptions::new())
        .await
        .unwrap();

    let executed = hook
        .execute(&conn, "CREATE TABLE a (id INTEGER); CREATE TABLE b (id INTEGER);")
        .await
        .unwrap();
    assert_eq!(executed.changes, Changes::new(2, 0));
    assert!(executed.message.is_none());

    let ran = hook
        .run(&conn, "INSERT INTO a (id) VALUES (?)", Some(&[json!(1)][..]))
        .await
        .unwrap();
    assert_eq!(ran.changes, Changes::new(1, 1));

    let rows = hook.query(&conn, "SELECT * FROM a", None).await.unwrap();
    assert_eq!(rows.values, vec![json!({"name": "Alice", "bound": 0})]);

    let exported = hook.export_to_json(&conn, "partial").await.unwrap();
    assert_eq!(exported.export["mode"], "partial");
    assert_eq!(exported.export["database"], "testDB");

    assert_eq!(hook.echo("hello").await.unwrap().value, "hello");
    assert!(hook.is_db_exists("testDB").await.unwrap().result);
    assert!(!hook.is_db_exists("other").await.unwrap().result);
}

#[tokio::test]
async fn test_statement_on_closed_connection_is_not_found() {
    let backend = Arc::new(StubSqliteBackend::new());
    let hook = sqlite_hook(&backend);
    let conn = hook
        .create_connection("testDB", &ConnectionOptions::new())
        .await
        .unwrap();
    hook.close_connection("testDB", false).await.unwrap();

    let err = hook.execute(&conn, "SELECT 1;").await.unwrap_err();

    assert_eq!(err, BridgeError::NotFound("testDB".to_string()));
    assert_eq!(backend.count("execute"), 0);
}

#[tokio::test]
async fn test_stale_connection_after_reopen_is_not_found() {
    let backend = Arc::new(StubSqliteBackend::new());
    let hook = sqlite_hook(&backend);
    let stale = hook
        .create_connection("testDB", &ConnectionOptions::new())
        .await
        .unwrap();
    hook.close_connection("testDB", false).await.unwrap();
    let fresh = hook
        .create_connection("testDB", &ConnectionOptions::new())
        .await
        .unwrap();

    assert!(matches!(
        hook.query(&stale, "SELECT 1", None).await,
        Err(BridgeError::NotFound(_))
    ));
    assert!(hook.query(&fresh, "SELECT 1", None).await.is_ok());
}

#[tokio::test]
async fn test_import_failure_propagates_backend_error() {
    let backend = Arc::new(StubSqliteBackend::new());
    let hook = sqlite_hook(&backend);

    let err = hook.import_from_json("not json").await.unwrap_err();

    match err {
        BridgeError::Backing(e) => {
            assert_eq!(e.message, "ImportFromJson: Stringify Json Object not Valid")
        }
        other => panic!("expected Backing, got {other:?}"),
    }
}

#[tokio::test]
async fn test_registry_operations_through_hook() {
    let backend = Arc::new(StubSqliteBackend::new());
    let hook = sqlite_hook(&backend);

    hook.create_connection("first", &ConnectionOptions::new()).await.unwrap();
    hook.create_connection("second", &ConnectionOptions::new().with_read_only(true))
        .await
        .unwrap();

    assert!(hook.is_connection("first", false).await.unwrap());
    assert!(!hook.is_connection("second", false).await.unwrap());
    assert_eq!(
        hook.retrieve_all_connections().await.unwrap().keys(),
        vec!["first", "RO_second"]
    );

    let report = hook.close_all_connections().await.unwrap();
    assert!(report.is_clean());
    assert!(hook.retrieve_all_connections().await.unwrap().is_empty());
}

// ============================================================================
// Normalization
// ============================================================================

#[tokio::test]
async fn test_missing_reply_fields_fall_back() {
    let backend = Arc::new(StubSqliteBackend::sparse());
    let hook = sqlite_hook(&backend);
    let conn = hook
        .create_connection("testDB", &ConnectionOptions::new())
        .await
        .unwrap();

    let executed = hook.execute(&conn, "SELECT 1;").await.unwrap();
    assert_eq!(executed.changes, Changes::zero());
    assert_eq!(executed.message.as_deref(), Some("Error in execute"));

    let set = [SqlStatement::new("SELECT 1")];
    let batch = hook.execute_set(&conn, &set).await.unwrap();
    assert_eq!(batch.changes, Changes::failed());
    assert_eq!(batch.message.as_deref(), Some("Error in executeSet"));

    let ran = hook.run(&conn, "SELECT 1", None).await.unwrap();
    assert_eq!(ran.changes, Changes::zero());
    assert_eq!(ran.message.as_deref(), Some("Error in run"));

    let rows = hook.query(&conn, "SELECT 1", None).await.unwrap();
    assert!(rows.values.is_empty());
    assert_eq!(rows.message.as_deref(), Some("Error in query"));

    let sync = hook.create_sync_table(&conn).await.unwrap();
    assert_eq!(sync.changes, Changes::zero());
    assert_eq!(sync.message.as_deref(), Some("Error in createSyncTable"));

    let date = hook.set_sync_date(&conn, "2021-08-01T08:42:25.000Z").await.unwrap();
    assert!(!date.result);
    assert_eq!(date.message.as_deref(), Some("Error in setSyncDate"));

    let exported = hook.export_to_json(&conn, "full").await.unwrap();
    assert_eq!(exported.export, json!({}));
    assert_eq!(exported.message.as_deref(), Some("Error in exportToJson"));

    let imported = hook.import_from_json("{}").await.unwrap();
    assert_eq!(imported.changes, Changes::failed());
    assert_eq!(imported.message.as_deref(), Some("Error in importFromJson"));

    let valid = hook.is_json_valid("{}").await.unwrap();
    assert_eq!(valid.message.as_deref(), Some("Error in isJsonValid"));
    let exists = hook.is_db_exists("testDB").await.unwrap();
    assert_eq!(exists.message.as_deref(), Some("Error in isDBExists"));
    let deleted = hook.delete_db("testDB").await.unwrap();
    assert_eq!(deleted.message.as_deref(), Some("Error in deleteDB"));
    let stored = hook.is_secret_stored().await.unwrap();
    assert_eq!(stored.message.as_deref(), Some("Error in isSecretStored"));
    let set_secret = hook.set_encryption_secret("abc").await.unwrap();
    assert_eq!(set_secret.message.as_deref(), Some("Error in setEncryptionSecret"));
    let changed = hook.change_encryption_secret("abc", "def").await.unwrap();
    assert!(!changed.result);
    assert_eq!(changed.message.as_deref(), Some("Error in changeEncryptionSecret"));

    assert_eq!(hook.echo("ping").await.unwrap().value, "ping");
}
