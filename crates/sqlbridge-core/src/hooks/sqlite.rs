//! SQLite hook
//!
//! Exposes the SQLite plugin: connection registry operations plus every
//! statement-level and database-level call. Arguments are validated before
//! the backend is reached, and replies are normalized so that callers always
//! receive fully-populated results.

use std::sync::Arc;

use tracing::debug;

use super::require;
use crate::config::{Config, ConnectionDefaults};
use crate::domain::{
    BridgeError, BridgeResult, CapabilityDescriptor, CapabilityId, Changes, ChangesResult,
    Connection, ConnectionOptions, EchoResult, ExportMode, ExportResult, PluginId, QueryResult,
    StatusResult,
};
use crate::gate::{Gated, Unavailable};
use crate::ports::{IHostEnvironment, ISqliteBackend, SqlStatement};
use crate::registry::{CloseAllReport, ConnectionMap, ConnectionRegistry};

/// Operations reachable once the gate has passed
struct SqliteOps<B: ISqliteBackend> {
    backend: Arc<B>,
    registry: ConnectionRegistry<B>,
}

/// Public surface of the SQLite plugin
pub struct SqliteHook<B: ISqliteBackend> {
    gate: Gated<SqliteOps<B>>,
}

impl<B: ISqliteBackend> SqliteHook<B> {
    /// Build the hook, evaluating availability once
    ///
    /// When the gate fails no registry is created and `backend` is never
    /// called by this hook.
    pub fn new(
        backend: Arc<B>,
        host: &dyn IHostEnvironment,
        descriptor: &CapabilityDescriptor,
        defaults: ConnectionDefaults,
    ) -> Self {
        let gate = Gated::evaluate(
            host,
            descriptor,
            PluginId::SQLITE,
            CapabilityId::USE_SQLITE,
            || SqliteOps {
                registry: ConnectionRegistry::new(Arc::clone(&backend), defaults),
                backend,
            },
        );
        Self { gate }
    }

    /// Build the hook from the capability and default sections of `config`
    pub fn from_config(backend: Arc<B>, host: &dyn IHostEnvironment, config: &Config) -> Self {
        Self::new(backend, host, &config.capabilities, config.sqlite.clone())
    }

    pub fn is_available(&self) -> bool {
        self.gate.is_available()
    }

    /// Why the hook is unavailable, if it is
    pub fn unavailable(&self) -> Option<&Unavailable> {
        self.gate.unavailable()
    }

    /// The connection registry owned by this hook
    pub fn registry(&self) -> BridgeResult<&ConnectionRegistry<B>> {
        Ok(&self.gate.get()?.registry)
    }

    fn ops(&self) -> BridgeResult<&SqliteOps<B>> {
        self.gate.get()
    }

    /// Fail with `NotFound` unless `conn` is still registered
    async fn live<'a>(&'a self, conn: &Connection<B::Handle>) -> BridgeResult<&'a SqliteOps<B>> {
        let ops = self.ops()?;
        let current = ops.registry.retrieve(conn.name(), conn.read_only()).await?;
        if current.id() != conn.id() {
            return Err(BridgeError::NotFound(conn.key().to_string()));
        }
        Ok(ops)
    }

    // ------------------------------------------------------------------------
    // Plugin
    // ------------------------------------------------------------------------

    /// Round-trip a value through the plugin
    pub async fn echo(&self, value: &str) -> BridgeResult<EchoResult> {
        let ops = self.ops()?;
        let reply = ops.backend.echo(value).await?;
        Ok(reply.normalize(value))
    }

    // ------------------------------------------------------------------------
    // Connections
    // ------------------------------------------------------------------------

    pub async fn create_connection(
        &self,
        name: &str,
        options: &ConnectionOptions,
    ) -> BridgeResult<Arc<Connection<B::Handle>>> {
        self.ops()?.registry.create(name, options).await
    }

    pub async fn retrieve_connection(
        &self,
        name: &str,
        read_only: bool,
    ) -> BridgeResult<Arc<Connection<B::Handle>>> {
        self.ops()?.registry.retrieve(name, read_only).await
    }

    /// Every live connection in creation order; empty when none is open
    pub async fn retrieve_all_connections(&self) -> BridgeResult<ConnectionMap<B::Handle>> {
        Ok(self.ops()?.registry.retrieve_all().await)
    }

    pub async fn is_connection(&self, name: &str, read_only: bool) -> BridgeResult<bool> {
        Ok(self.ops()?.registry.contains(name, read_only).await)
    }

    pub async fn close_connection(&self, name: &str, read_only: bool) -> BridgeResult<()> {
        self.ops()?.registry.close(name, read_only).await
    }

    /// Release every connection, best effort; the registry ends empty
    pub async fn close_all_connections(&self) -> BridgeResult<CloseAllReport> {
        Ok(self.ops()?.registry.close_all().await)
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    /// Execute raw statements separated by `;`
    pub async fn execute(
        &self,
        conn: &Connection<B::Handle>,
        statements: &str,
    ) -> BridgeResult<ChangesResult> {
        let ops = self.live(conn).await?;
        require(statements, "Statements is empty")?;

        let reply = ops.backend.execute(conn.handle(), statements).await?;
        let result = reply.normalize("execute", Changes::zero());
        debug!(connection = %conn.key(), changes = result.changes.changes, "result execute");
        Ok(result)
    }

    /// Execute a batch of statements with bound values
    pub async fn execute_set(
        &self,
        conn: &Connection<B::Handle>,
        set: &[SqlStatement],
    ) -> BridgeResult<ChangesResult> {
        let ops = self.live(conn).await?;
        if set.is_empty() {
            return Err(BridgeError::invalid_argument("Set is empty"));
        }
        if let Some(index) = set.iter().position(|s| s.statement.is_empty()) {
            return Err(BridgeError::invalid_argument(format!(
                "Statement {index} of the set is empty"
            )));
        }

        let reply = ops.backend.execute_set(conn.handle(), set).await?;
        let result = reply.normalize("executeSet", Changes::failed());
        debug!(
            connection = %conn.key(),
            statements = set.len(),
            changes = result.changes.changes,
            "result executeSet"
        );
        Ok(result)
    }

    /// Execute a single statement; `values` defaults to no bindings
    pub async fn run(
        &self,
        conn: &Connection<B::Handle>,
        statement: &str,
        values: Option<&[serde_json::Value]>,
    ) -> BridgeResult<ChangesResult> {
        let ops = self.live(conn).await?;
        require(statement, "Statement is empty")?;

        let reply = ops
            .backend
            .run(conn.handle(), statement, values.unwrap_or_default())
            .await?;
        let result = reply.normalize("run", Changes::zero());
        debug!(
            connection = %conn.key(),
            changes = result.changes.changes,
            last_id = result.changes.last_id,
            "result run"
        );
        Ok(result)
    }

    /// Run a query; `values` defaults to no bindings
    pub async fn query(
        &self,
        conn: &Connection<B::Handle>,
        statement: &str,
        values: Option<&[serde_json::Value]>,
    ) -> BridgeResult<QueryResult> {
        let ops = self.live(conn).await?;
        require(statement, "Statement is empty")?;

        let reply = ops
            .backend
            .query(conn.handle(), statement, values.unwrap_or_default())
            .await?;
        let result = reply.normalize("query");
        debug!(connection = %conn.key(), rows = result.values.len(), "result query");
        Ok(result)
    }

    // ------------------------------------------------------------------------
    // Synchronization
    // ------------------------------------------------------------------------

    pub async fn create_sync_table(
        &self,
        conn: &Connection<B::Handle>,
    ) -> BridgeResult<ChangesResult> {
        let ops = self.live(conn).await?;
        let reply = ops.backend.create_sync_table(conn.handle()).await?;
        let result = reply.normalize("createSyncTable", Changes::zero());
        debug!(connection = %conn.key(), changes = result.changes.changes, "result createSyncTable");
        Ok(result)
    }

    pub async fn set_sync_date(
        &self,
        conn: &Connection<B::Handle>,
        sync_date: &str,
    ) -> BridgeResult<StatusResult> {
        let ops = self.live(conn).await?;
        require(sync_date, "Must provide a synchronization date")?;

        let reply = ops.backend.set_sync_date(conn.handle(), sync_date).await?;
        let result = reply.normalize("setSyncDate");
        debug!(connection = %conn.key(), result = result.result, "result setSyncDate");
        Ok(result)
    }

    // ------------------------------------------------------------------------
    // JSON import/export
    // ------------------------------------------------------------------------

    /// Export the connection's database; `mode` is `full` or `partial`
    pub async fn export_to_json(
        &self,
        conn: &Connection<B::Handle>,
        mode: &str,
    ) -> BridgeResult<ExportResult> {
        let ops = self.live(conn).await?;
        let mode: ExportMode = mode.parse()?;

        let reply = ops.backend.export_to_json(conn.handle(), mode).await?;
        let result = reply.normalize("exportToJson");
        debug!(connection = %conn.key(), %mode, "result exportToJson");
        Ok(result)
    }

    pub async fn is_json_valid(&self, json: &str) -> BridgeResult<StatusResult> {
        let ops = self.ops()?;
        require(json, "Must provide a Json string")?;

        let result = ops.backend.is_json_valid(json).await?.normalize("isJsonValid");
        debug!(result = result.result, "result isJsonValid");
        Ok(result)
    }

    pub async fn import_from_json(&self, json: &str) -> BridgeResult<ChangesResult> {
        let ops = self.ops()?;
        require(json, "Must provide a Json string")?;

        let reply = ops.backend.import_from_json(json).await?;
        let result = reply.normalize("importFromJson", Changes::failed());
        debug!(changes = result.changes.changes, "result importFromJson");
        Ok(result)
    }

    // ------------------------------------------------------------------------
    // Database files
    // ------------------------------------------------------------------------

    pub async fn is_db_exists(&self, name: &str) -> BridgeResult<StatusResult> {
        let ops = self.ops()?;
        require(name, "Must provide a database name")?;

        let result = ops.backend.is_db_exists(name).await?.normalize("isDBExists");
        debug!(database = name, result = result.result, "result isDBExists");
        Ok(result)
    }

    pub async fn delete_db(&self, name: &str) -> BridgeResult<StatusResult> {
        let ops = self.ops()?;
        require(name, "Must provide a database name")?;

        let result = ops.backend.delete_database(name).await?.normalize("deleteDB");
        debug!(database = name, result = result.result, "result deleteDB");
        Ok(result)
    }

    // ------------------------------------------------------------------------
    // Encryption secrets
    // ------------------------------------------------------------------------

    pub async fn is_secret_stored(&self) -> BridgeResult<StatusResult> {
        let ops = self.ops()?;
        Ok(ops.backend.is_secret_stored().await?.normalize("isSecretStored"))
    }

    pub async fn set_encryption_secret(&self, passphrase: &str) -> BridgeResult<StatusResult> {
        let ops = self.ops()?;
        require(passphrase, "Must provide a passphrase")?;

        let reply = ops.backend.set_encryption_secret(passphrase).await?;
        Ok(reply.normalize("setEncryptionSecret"))
    }

    pub async fn change_encryption_secret(
        &self,
        passphrase: &str,
        old_passphrase: &str,
    ) -> BridgeResult<StatusResult> {
        let ops = self.ops()?;
        require(passphrase, "Must provide a passphrase")?;
        require(old_passphrase, "Must provide the old passphrase")?;

        let reply = ops
            .backend
            .change_encryption_secret(passphrase, old_passphrase)
            .await?;
        Ok(reply.normalize("changeEncryptionSecret"))
    }
}
