//! SQLx implementation of ISqliteBackend
//!
//! Each logical connection owns a single-connection [`DatabasePool`] over
//! `<database_dir>/<name>SQLite.db`. Encryption is not available: opening an
//! encrypted connection and every secret operation fail with a
//! `BackendError` tagged `unsupported`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::DateTime;
use serde_json::Value;
use uuid::Uuid;

use sqlbridge_core::domain::{BackendError, Changes, EncryptionMode, ExportMode, OpenRequest};
use sqlbridge_core::ports::{
    ChangesReply, EchoReply, ExportReply, ISqliteBackend, SqlStatement, StatusReply, ValuesReply,
};

use crate::json::{self, JsonSqlite, SYNC_TABLE};
use crate::pool::{database_path, remove_database_files, DatabasePool};
use crate::values::{bind_values, row_to_object};
use crate::AdapterError;

/// Handle of one open logical connection
#[derive(Debug)]
pub struct SqliteHandle {
    id: Uuid,
    database: String,
    read_only: bool,
    pool: DatabasePool,
}

impl SqliteHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    fn writable(&self) -> Result<&DatabasePool, AdapterError> {
        if self.read_only {
            return Err(AdapterError::ReadOnly(self.database.clone()));
        }
        Ok(&self.pool)
    }
}

/// SQLite plugin backed by database files in one directory
pub struct SqlxSqliteBackend {
    database_dir: PathBuf,
}

impl SqlxSqliteBackend {
    pub fn new(database_dir: &Path) -> Self {
        Self {
            database_dir: database_dir.to_path_buf(),
        }
    }

    pub fn database_dir(&self) -> &Path {
        &self.database_dir
    }

    fn path_of(&self, database: &str) -> Result<PathBuf, AdapterError> {
        database_path(&self.database_dir, database)
    }

    async fn open_pool(&self, request: &OpenRequest) -> Result<SqliteHandle, AdapterError> {
        if request.encrypted || request.mode != EncryptionMode::NoEncryption {
            return Err(AdapterError::Unsupported(format!(
                "encryption mode {} for {}",
                request.mode, request.database
            )));
        }

        let path = self.path_of(&request.database)?;
        let pool = if request.read_only {
            DatabasePool::open_read_only(&path).await?
        } else {
            let pool = DatabasePool::open(&path).await?;
            let version = i64::from(request.version);
            if pool.user_version().await? < version {
                pool.set_user_version(version).await?;
            }
            pool
        };

        Ok(SqliteHandle {
            id: Uuid::new_v4(),
            database: request.database.clone(),
            read_only: request.read_only,
            pool,
        })
    }

    async fn execute_statements(
        &self,
        handle: &SqliteHandle,
        statements: &str,
    ) -> Result<Changes, AdapterError> {
        let pool = handle.writable()?;
        let mut tx = pool.pool().begin().await?;
        let result = sqlx::Executor::execute(&mut *tx, sqlx::raw_sql(statements)).await?;
        tx.commit().await?;
        Ok(Changes::new(
            result.rows_affected() as i64,
            result.last_insert_rowid(),
        ))
    }

    async fn execute_batch(
        &self,
        handle: &SqliteHandle,
        set: &[SqlStatement],
    ) -> Result<Changes, AdapterError> {
        let pool = handle.writable()?;
        let mut tx = pool.pool().begin().await?;
        let mut changes = Changes::zero();
        for statement in set {
            let result = bind_values(sqlx::query(&statement.statement), &statement.values)
                .execute(&mut *tx)
                .await?;
            changes.changes += result.rows_affected() as i64;
            changes.last_id = result.last_insert_rowid();
        }
        tx.commit().await?;
        Ok(changes)
    }

    async fn run_statement(
        &self,
        handle: &SqliteHandle,
        statement: &str,
        values: &[Value],
    ) -> Result<Changes, AdapterError> {
        let pool = handle.writable()?;
        let result = bind_values(sqlx::query(statement), values)
            .execute(pool.pool())
            .await?;
        Ok(Changes::new(
            result.rows_affected() as i64,
            result.last_insert_rowid(),
        ))
    }

    async fn query_rows(
        &self,
        handle: &SqliteHandle,
        statement: &str,
        values: &[Value],
    ) -> Result<Vec<Value>, AdapterError> {
        let rows = bind_values(sqlx::query(statement), values)
            .fetch_all(handle.pool.pool())
            .await?;
        rows.iter().map(row_to_object).collect()
    }

    async fn sync_table(&self, handle: &SqliteHandle) -> Result<Changes, AdapterError> {
        let pool = handle.writable()?;
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS sync_table (\
             id INTEGER PRIMARY KEY NOT NULL, \
             sync_date INTEGER DEFAULT (strftime('%s', 'now')));",
        )
        .execute(pool.pool())
        .await?;

        let result = sqlx::query("INSERT OR IGNORE INTO sync_table (id, sync_date) VALUES (1, ?)")
            .bind(chrono::Utc::now().timestamp())
            .execute(pool.pool())
            .await?;
        Ok(Changes::new(
            result.rows_affected() as i64,
            result.last_insert_rowid(),
        ))
    }

    async fn import_document(&self, json: &str) -> Result<Changes, AdapterError> {
        let doc = JsonSqlite::parse(json)?;
        if doc.encrypted {
            return Err(AdapterError::Unsupported(format!(
                "encrypted import into {}",
                doc.database
            )));
        }

        let pool = DatabasePool::open(&self.path_of(&doc.database)?).await?;
        let outcome = json::import(pool.pool(), &doc).await;
        if outcome.is_ok() && pool.user_version().await? < doc.version {
            pool.set_user_version(doc.version).await?;
        }
        pool.close().await;
        outcome
    }
}

fn unsupported(operation: &str) -> BackendError {
    AdapterError::Unsupported(format!("{operation}: encryption is not available")).into()
}

#[async_trait]
impl ISqliteBackend for SqlxSqliteBackend {
    type Handle = SqliteHandle;

    async fn echo(&self, value: &str) -> Result<EchoReply, BackendError> {
        Ok(EchoReply {
            value: Some(value.to_string()),
        })
    }

    async fn open(&self, request: &OpenRequest) -> Result<SqliteHandle, BackendError> {
        let handle = self.open_pool(request).await?;
        tracing::debug!(
            database = %request.database,
            read_only = request.read_only,
            handle = %handle.id,
            "Opened database"
        );
        Ok(handle)
    }

    async fn close(&self, handle: &SqliteHandle) -> Result<(), BackendError> {
        if handle.pool.is_closed() {
            return Err(AdapterError::ConnectionFailed(format!(
                "{} is already closed",
                handle.database
            ))
            .into());
        }
        handle.pool.close().await;
        Ok(())
    }

    async fn execute(
        &self,
        handle: &SqliteHandle,
        statements: &str,
    ) -> Result<ChangesReply, BackendError> {
        let changes = self.execute_statements(handle, statements).await?;
        Ok(ChangesReply::with_changes(changes))
    }

    async fn execute_set(
        &self,
        handle: &SqliteHandle,
        set: &[SqlStatement],
    ) -> Result<ChangesReply, BackendError> {
        let changes = self.execute_batch(handle, set).await?;
        Ok(ChangesReply::with_changes(changes))
    }

    async fn run(
        &self,
        handle: &SqliteHandle,
        statement: &str,
        values: &[Value],
    ) -> Result<ChangesReply, BackendError> {
        let changes = self.run_statement(handle, statement, values).await?;
        Ok(ChangesReply::with_changes(changes))
    }

    async fn query(
        &self,
        handle: &SqliteHandle,
        statement: &str,
        values: &[Value],
    ) -> Result<ValuesReply, BackendError> {
        let rows = self.query_rows(handle, statement, values).await?;
        Ok(ValuesReply::with_values(rows))
    }

    async fn create_sync_table(&self, handle: &SqliteHandle) -> Result<ChangesReply, BackendError> {
        let changes = self.sync_table(handle).await?;
        Ok(ChangesReply::with_changes(changes))
    }

    async fn set_sync_date(
        &self,
        handle: &SqliteHandle,
        sync_date: &str,
    ) -> Result<StatusReply, BackendError> {
        let timestamp = match DateTime::parse_from_rfc3339(sync_date) {
            Ok(date) => date.timestamp(),
            Err(e) => {
                return Ok(StatusReply::failure(format!(
                    "SetSyncDate: invalid date {sync_date}: {e}"
                )))
            }
        };

        let pool = handle.writable()?;
        let result = sqlx::query("UPDATE sync_table SET sync_date = ? WHERE id = 1")
            .bind(timestamp)
            .execute(pool.pool())
            .await
            .map_err(AdapterError::from)?;
        if result.rows_affected() == 0 {
            return Ok(StatusReply::failure(format!(
                "SetSyncDate: no {SYNC_TABLE} in {}",
                handle.database
            )));
        }
        Ok(StatusReply::success())
    }

    async fn export_to_json(
        &self,
        handle: &SqliteHandle,
        mode: ExportMode,
    ) -> Result<ExportReply, BackendError> {
        let doc = json::export(handle.pool.pool(), &handle.database, mode).await?;
        let export = serde_json::to_value(&doc)
            .map_err(|e| AdapterError::InvalidJson(e.to_string()))?;
        Ok(ExportReply::with_export(export))
    }

    async fn is_json_valid(&self, json: &str) -> Result<StatusReply, BackendError> {
        match JsonSqlite::parse(json) {
            Ok(_) => Ok(StatusReply::success()),
            Err(e) => Ok(StatusReply::failure(e.to_string())),
        }
    }

    async fn import_from_json(&self, json: &str) -> Result<ChangesReply, BackendError> {
        let changes = self.import_document(json).await?;
        tracing::info!(changes = changes.changes, "Imported JSON document");
        Ok(ChangesReply::with_changes(changes))
    }

    async fn is_db_exists(&self, database: &str) -> Result<StatusReply, BackendError> {
        Ok(StatusReply {
            result: Some(self.path_of(database)?.exists()),
            message: None,
        })
    }

    async fn delete_database(&self, database: &str) -> Result<StatusReply, BackendError> {
        let path = self.path_of(database)?;
        if !path.exists() {
            return Ok(StatusReply::failure(format!(
                "DeleteDB: {database} does not exist"
            )));
        }

        remove_database_files(&path).map_err(AdapterError::from)?;
        tracing::info!(path = %path.display(), "Deleted database");
        Ok(StatusReply::success())
    }

    async fn is_secret_stored(&self) -> Result<StatusReply, BackendError> {
        Ok(StatusReply {
            result: Some(false),
            message: None,
        })
    }

    async fn set_encryption_secret(&self, _passphrase: &str) -> Result<StatusReply, BackendError> {
        Err(unsupported("SetEncryptionSecret"))
    }

    async fn change_encryption_secret(
        &self,
        _passphrase: &str,
        _old_passphrase: &str,
    ) -> Result<StatusReply, BackendError> {
        Err(unsupported("ChangeEncryptionSecret"))
    }
}
