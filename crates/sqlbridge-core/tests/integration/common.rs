//! Shared test helpers for hook and registry integration tests
//!
//! Provides in-memory stand-ins for the two backing plugins. Both record
//! every call so tests can assert that gated or rejected operations never
//! reach the backend, and both can be told to fail or to reply with every
//! optional field left out.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use sqlbridge_core::config::{ConnectionDefaults, StorageDefaults};
use sqlbridge_core::domain::{
    BackendError, CapabilityDescriptor, Changes, ExportMode, KeyValue, OpenRequest, Platform,
    PluginId, StoreRequest,
};
use sqlbridge_core::ports::{
    ChangesReply, EchoReply, ExportReply, ISqliteBackend, IStorageBackend, KeysReply,
    KeysValuesReply, SqlStatement, StaticHost, StatusReply, StoredValuesReply, ValueReply,
    ValuesReply,
};
use sqlbridge_core::{SqliteHook, StorageHook};

// ============================================================================
// Hosts
// ============================================================================

/// A web host with both plugins registered
pub fn web_host() -> StaticHost {
    StaticHost::new(Platform::web())
        .with_plugin(PluginId::SQLITE)
        .with_plugin(PluginId::DATA_STORAGE)
}

/// A descriptor where nothing is supported on web
pub fn native_only_descriptor() -> CapabilityDescriptor {
    CapabilityDescriptor::builder()
        .support(PluginId::SQLITE, "use-sqlite", "ios", true)
        .support(PluginId::SQLITE, "use-sqlite", "web", false)
        .support(PluginId::DATA_STORAGE, "use-storage", "ios", true)
        .support(PluginId::DATA_STORAGE, "use-storage", "web", false)
        .build()
}

// ============================================================================
// StubSqliteBackend
// ============================================================================

/// Opaque handle handed out by [`StubSqliteBackend::open`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubHandle {
    pub serial: u64,
    pub database: String,
    pub read_only: bool,
}

#[derive(Default)]
pub struct StubSqliteBackend {
    calls: Mutex<Vec<String>>,
    fail_open: Mutex<HashSet<String>>,
    fail_close: Mutex<HashSet<String>>,
    closed: Mutex<Vec<u64>>,
    sparse: bool,
    serial: AtomicU64,
}

impl StubSqliteBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with every optional field left out
    pub fn sparse() -> Self {
        Self {
            sparse: true,
            ..Self::default()
        }
    }

    pub fn fail_open_for(&self, database: &str) {
        self.fail_open.lock().unwrap().insert(database.to_string());
    }

    pub fn fail_close_for(&self, database: &str) {
        self.fail_close.lock().unwrap().insert(database.to_string());
    }

    pub fn clear_failures(&self) {
        self.fail_open.lock().unwrap().clear();
        self.fail_close.lock().unwrap().clear();
    }

    /// Names of every call, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == operation)
            .count()
    }

    /// Serials of the handles released so far
    pub fn closed_serials(&self) -> Vec<u64> {
        self.closed.lock().unwrap().clone()
    }

    fn record(&self, operation: &str) {
        self.calls.lock().unwrap().push(operation.to_string());
    }

    fn status(&self, result: bool) -> StatusReply {
        if self.sparse {
            StatusReply::default()
        } else {
            StatusReply {
                result: Some(result),
                message: None,
            }
        }
    }

    fn changes(&self, changes: Changes) -> ChangesReply {
        if self.sparse {
            ChangesReply::default()
        } else {
            ChangesReply::with_changes(changes)
        }
    }
}

#[async_trait]
impl ISqliteBackend for StubSqliteBackend {
    type Handle = StubHandle;

    async fn echo(&self, value: &str) -> Result<EchoReply, BackendError> {
        self.record("echo");
        Ok(EchoReply {
            value: (!self.sparse).then(|| value.to_string()),
        })
    }

    async fn open(&self, request: &OpenRequest) -> Result<StubHandle, BackendError> {
        self.record("open");
        if self.fail_open.lock().unwrap().contains(&request.database) {
            return Err(BackendError::new(format!(
                "Open: cannot open {}",
                request.database
            )));
        }
        Ok(StubHandle {
            serial: self.serial.fetch_add(1, Ordering::SeqCst),
            database: request.database.clone(),
            read_only: request.read_only,
        })
    }

    async fn close(&self, handle: &StubHandle) -> Result<(), BackendError> {
        self.record("close");
        if self.fail_close.lock().unwrap().contains(&handle.database) {
            return Err(BackendError::new(format!(
                "Close: cannot close {}",
                handle.database
            ))
            .with_payload(json!({"serial": handle.serial})));
        }
        self.closed.lock().unwrap().push(handle.serial);
        Ok(())
    }

    async fn execute(
        &self,
        _handle: &StubHandle,
        statements: &str,
    ) -> Result<ChangesReply, BackendError> {
        self.record("execute");
        let count = statements
            .split(';')
            .filter(|s| !s.trim().is_empty())
            .count();
        Ok(self.changes(Changes::new(count as i64, 0)))
    }

    async fn execute_set(
        &self,
        _handle: &StubHandle,
        set: &[SqlStatement],
    ) -> Result<ChangesReply, BackendError> {
        self.record("execute_set");
        Ok(self.changes(Changes::new(set.len() as i64, set.len() as i64)))
    }

    async fn run(
        &self,
        _handle: &StubHandle,
        _statement: &str,
        values: &[Value],
    ) -> Result<ChangesReply, BackendError> {
        self.record("run");
        Ok(self.changes(Changes::new(1, values.len() as i64)))
    }

    async fn query(
        &self,
        _handle: &StubHandle,
        _statement: &str,
        values: &[Value],
    ) -> Result<ValuesReply, BackendError> {
        self.record("query");
        if self.sparse {
            return Ok(ValuesReply::default());
        }
        Ok(ValuesReply::with_values(vec![
            json!({"name": "Alice", "bound": values.len()}),
        ]))
    }

    async fn create_sync_table(&self, _handle: &StubHandle) -> Result<ChangesReply, BackendError> {
        self.record("create_sync_table");
        Ok(self.changes(Changes::new(1, 1)))
    }

    async fn set_sync_date(
        &self,
        _handle: &StubHandle,
        _sync_date: &str,
    ) -> Result<StatusReply, BackendError> {
        self.record("set_sync_date");
        Ok(self.status(true))
    }

    async fn export_to_json(
        &self,
        handle: &StubHandle,
        mode: ExportMode,
    ) -> Result<ExportReply, BackendError> {
        self.record("export_to_json");
        if self.sparse {
            return Ok(ExportReply::default());
        }
        Ok(ExportReply::with_export(json!({
            "database": handle.database,
            "mode": mode.as_str(),
            "tables": [],
        })))
    }

    async fn is_json_valid(&self, json: &str) -> Result<StatusReply, BackendError> {
        self.record("is_json_valid");
        Ok(self.status(serde_json::from_str::<Value>(json).is_ok()))
    }

    async fn import_from_json(&self, json: &str) -> Result<ChangesReply, BackendError> {
        self.record("import_from_json");
        if serde_json::from_str::<Value>(json).is_err() {
            return Err(BackendError::new("ImportFromJson: Stringify Json Object not Valid"));
        }
        Ok(self.changes(Changes::new(3, 0)))
    }

    async fn is_db_exists(&self, database: &str) -> Result<StatusReply, BackendError> {
        self.record("is_db_exists");
        Ok(self.status(database == "testDB"))
    }

    async fn delete_database(&self, _database: &str) -> Result<StatusReply, BackendError> {
        self.record("delete_database");
        Ok(self.status(true))
    }

    async fn is_secret_stored(&self) -> Result<StatusReply, BackendError> {
        self.record("is_secret_stored");
        Ok(self.status(false))
    }

    async fn set_encryption_secret(&self, _passphrase: &str) -> Result<StatusReply, BackendError> {
        self.record("set_encryption_secret");
        Ok(self.status(true))
    }

    async fn change_encryption_secret(
        &self,
        _passphrase: &str,
        _old_passphrase: &str,
    ) -> Result<StatusReply, BackendError> {
        self.record("change_encryption_secret");
        Ok(self.status(true))
    }
}

// ============================================================================
// StubStorageBackend
// ============================================================================

#[derive(Default)]
struct StoreState {
    database: Option<String>,
    table: Option<String>,
    tables: HashMap<String, Vec<KeyValue>>,
}

impl StoreState {
    fn current(&mut self) -> Result<&mut Vec<KeyValue>, BackendError> {
        let table = self
            .table
            .clone()
            .ok_or_else(|| BackendError::new("No store opened"))?;
        Ok(self.tables.entry(table).or_default())
    }
}

#[derive(Default)]
pub struct StubStorageBackend {
    calls: Mutex<Vec<String>>,
    state: Mutex<StoreState>,
    opened: Mutex<Vec<StoreRequest>>,
    reject_set: bool,
    sparse: bool,
}

impl StubStorageBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sparse() -> Self {
        Self {
            sparse: true,
            ..Self::default()
        }
    }

    /// Report `result: false` from every `set`
    pub fn rejecting_set() -> Self {
        Self {
            reject_set: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Every request `open_store` received
    pub fn opened(&self) -> Vec<StoreRequest> {
        self.opened.lock().unwrap().clone()
    }

    pub fn current_table(&self) -> Option<String> {
        self.state.lock().unwrap().table.clone()
    }

    fn record(&self, operation: &str) {
        self.calls.lock().unwrap().push(operation.to_string());
    }

    fn status(&self, result: bool) -> StatusReply {
        if self.sparse {
            StatusReply::default()
        } else {
            StatusReply {
                result: Some(result),
                message: None,
            }
        }
    }
}

#[async_trait]
impl IStorageBackend for StubStorageBackend {
    async fn open_store(&self, request: &StoreRequest) -> Result<StatusReply, BackendError> {
        self.record("open_store");
        self.opened.lock().unwrap().push(request.clone());
        let mut state = self.state.lock().unwrap();
        state.database = Some(request.database.clone());
        state.table = Some(request.table.clone());
        Ok(self.status(true))
    }

    async fn set_table(&self, table: &str) -> Result<StatusReply, BackendError> {
        self.record("set_table");
        if self.sparse {
            return Ok(StatusReply::default());
        }
        let mut state = self.state.lock().unwrap();
        if state.database.is_none() {
            return Ok(StatusReply::failure("SetTable: Must open a store first"));
        }
        state.table = Some(table.to_string());
        Ok(StatusReply::success())
    }

    async fn get(&self, key: &str) -> Result<ValueReply, BackendError> {
        self.record("get");
        let mut state = self.state.lock().unwrap();
        let value = state
            .current()?
            .iter()
            .find(|kv| kv.key == key)
            .map(|kv| kv.value.clone());
        Ok(ValueReply {
            value: if self.sparse { None } else { value },
        })
    }

    async fn set(&self, key: &str, value: &str) -> Result<StatusReply, BackendError> {
        self.record("set");
        if self.reject_set {
            return Ok(StatusReply::failure("Set: store is read-only"));
        }
        let mut state = self.state.lock().unwrap();
        let entries = state.current()?;
        match entries.iter_mut().find(|kv| kv.key == key) {
            Some(kv) => kv.value = value.to_string(),
            None => entries.push(KeyValue::new(key, value)),
        }
        Ok(self.status(true))
    }

    async fn remove(&self, key: &str) -> Result<StatusReply, BackendError> {
        self.record("remove");
        let mut state = self.state.lock().unwrap();
        let entries = state.current()?;
        let before = entries.len();
        entries.retain(|kv| kv.key != key);
        let removed = entries.len() != before;
        Ok(self.status(removed))
    }

    async fn clear(&self) -> Result<StatusReply, BackendError> {
        self.record("clear");
        self.state.lock().unwrap().current()?.clear();
        Ok(self.status(true))
    }

    async fn is_key(&self, key: &str) -> Result<StatusReply, BackendError> {
        self.record("is_key");
        let mut state = self.state.lock().unwrap();
        let found = state.current()?.iter().any(|kv| kv.key == key);
        Ok(self.status(found))
    }

    async fn keys(&self) -> Result<KeysReply, BackendError> {
        self.record("keys");
        let mut state = self.state.lock().unwrap();
        let keys: Vec<String> = state.current()?.iter().map(|kv| kv.key.clone()).collect();
        Ok(KeysReply {
            keys: (!self.sparse).then_some(keys),
        })
    }

    async fn values(&self) -> Result<StoredValuesReply, BackendError> {
        self.record("values");
        let mut state = self.state.lock().unwrap();
        let values: Vec<String> = state.current()?.iter().map(|kv| kv.value.clone()).collect();
        Ok(StoredValuesReply {
            values: (!self.sparse).then_some(values),
        })
    }

    async fn keys_values(&self) -> Result<KeysValuesReply, BackendError> {
        self.record("keys_values");
        let mut state = self.state.lock().unwrap();
        let pairs = state.current()?.clone();
        Ok(KeysValuesReply {
            keysvalues: (!self.sparse).then_some(pairs),
        })
    }

    async fn delete_store(&self, database: &str) -> Result<StatusReply, BackendError> {
        self.record("delete_store");
        let mut state = self.state.lock().unwrap();
        if state.database.as_deref() == Some(database) {
            *state = StoreState::default();
        }
        Ok(self.status(true))
    }
}

// ============================================================================
// Hook builders
// ============================================================================

/// An available SQLite hook over `backend`
pub fn sqlite_hook(backend: &std::sync::Arc<StubSqliteBackend>) -> SqliteHook<StubSqliteBackend> {
    SqliteHook::new(
        std::sync::Arc::clone(backend),
        &web_host(),
        &CapabilityDescriptor::builtin(),
        ConnectionDefaults::default(),
    )
}

/// An available storage hook over `backend`
pub fn storage_hook(backend: &std::sync::Arc<StubStorageBackend>) -> StorageHook<StubStorageBackend> {
    StorageHook::new(
        std::sync::Arc::clone(backend),
        &web_host(),
        &CapabilityDescriptor::builtin(),
        StorageDefaults::default(),
    )
}
