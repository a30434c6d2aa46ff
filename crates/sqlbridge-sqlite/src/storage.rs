//! SQLx implementation of IStorageBackend
//!
//! A store is a database file `<database_dir>/<name>SQLite.db`; each
//! logical table is a SQLite table with a unique `key` column. Listing
//! follows insertion order, and overwriting a key keeps its position.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::Row;
use tokio::sync::Mutex;

use sqlbridge_core::domain::{BackendError, EncryptionMode, KeyValue, StoreRequest};
use sqlbridge_core::ports::{
    IStorageBackend, KeysReply, KeysValuesReply, StatusReply, StoredValuesReply, ValueReply,
};

use crate::pool::{database_path, quote_identifier, remove_database_files, DatabasePool};
use crate::AdapterError;

/// The store and table selected by the last `open_store` / `set_table`
struct OpenStore {
    database: String,
    table: String,
    pool: DatabasePool,
}

impl OpenStore {
    fn table(&self) -> Result<String, AdapterError> {
        quote_identifier(&self.table)
    }
}

async fn ensure_table(pool: &DatabasePool, table: &str) -> Result<(), AdapterError> {
    let quoted = quote_identifier(table)?;
    let ddl = format!(
        "CREATE TABLE IF NOT EXISTS {quoted} (\
         id INTEGER PRIMARY KEY AUTOINCREMENT, \
         key TEXT NOT NULL UNIQUE, \
         value TEXT);"
    );
    sqlx::raw_sql(&ddl).execute(pool.pool()).await?;
    Ok(())
}

/// Key-value plugin backed by database files in one directory
pub struct SqlxStorageBackend {
    database_dir: PathBuf,
    current: Mutex<Option<OpenStore>>,
}

impl SqlxStorageBackend {
    pub fn new(database_dir: &Path) -> Self {
        Self {
            database_dir: database_dir.to_path_buf(),
            current: Mutex::new(None),
        }
    }

    /// Name of the open store and table, if any
    pub async fn current(&self) -> Option<(String, String)> {
        self.current
            .lock()
            .await
            .as_ref()
            .map(|store| (store.database.clone(), store.table.clone()))
    }

    async fn open(&self, request: &StoreRequest) -> Result<(), AdapterError> {
        if request.encrypted || request.mode != EncryptionMode::NoEncryption {
            return Err(AdapterError::Unsupported(format!(
                "encrypted store {}",
                request.database
            )));
        }

        let mut current = self.current.lock().await;
        let reused = current
            .as_ref()
            .filter(|store| store.database == request.database)
            .map(|store| store.pool.clone());
        let fresh = reused.is_none();
        let pool = match reused {
            Some(pool) => pool,
            None => {
                DatabasePool::open(&database_path(&self.database_dir, &request.database)?).await?
            }
        };

        // The open store stays in place until the new table is ready
        if let Err(e) = ensure_table(&pool, &request.table).await {
            if fresh {
                pool.close().await;
            }
            return Err(e);
        }

        let previous = current.replace(OpenStore {
            database: request.database.clone(),
            table: request.table.clone(),
            pool,
        });
        if let Some(previous) = previous {
            if fresh {
                previous.pool.close().await;
            }
        }
        tracing::debug!(database = %request.database, table = %request.table, "Store opened");
        Ok(())
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>, AdapterError> {
        let current = self.current.lock().await;
        let store = current.as_ref().ok_or(AdapterError::StoreNotOpen)?;
        let value: Option<Option<String>> =
            sqlx::query_scalar(&format!("SELECT value FROM {} WHERE key = ?", store.table()?))
                .bind(key)
                .fetch_optional(store.pool.pool())
                .await?;
        Ok(value.flatten())
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<(), AdapterError> {
        let current = self.current.lock().await;
        let store = current.as_ref().ok_or(AdapterError::StoreNotOpen)?;
        sqlx::query(&format!(
            "INSERT INTO {} (key, value) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            store.table()?
        ))
        .bind(key)
        .bind(value)
        .execute(store.pool.pool())
        .await?;
        Ok(())
    }

    async fn remove_key(&self, key: &str) -> Result<bool, AdapterError> {
        let current = self.current.lock().await;
        let store = current.as_ref().ok_or(AdapterError::StoreNotOpen)?;
        let result = sqlx::query(&format!("DELETE FROM {} WHERE key = ?", store.table()?))
            .bind(key)
            .execute(store.pool.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_table(&self) -> Result<(), AdapterError> {
        let current = self.current.lock().await;
        let store = current.as_ref().ok_or(AdapterError::StoreNotOpen)?;
        sqlx::query(&format!("DELETE FROM {}", store.table()?))
            .execute(store.pool.pool())
            .await?;
        Ok(())
    }

    async fn has_key(&self, key: &str) -> Result<bool, AdapterError> {
        let current = self.current.lock().await;
        let store = current.as_ref().ok_or(AdapterError::StoreNotOpen)?;
        let found: Option<i64> =
            sqlx::query_scalar(&format!("SELECT 1 FROM {} WHERE key = ?", store.table()?))
                .bind(key)
                .fetch_optional(store.pool.pool())
                .await?;
        Ok(found.is_some())
    }

    async fn pairs(&self) -> Result<Vec<KeyValue>, AdapterError> {
        let current = self.current.lock().await;
        let store = current.as_ref().ok_or(AdapterError::StoreNotOpen)?;
        let rows = sqlx::query(&format!(
            "SELECT key, value FROM {} ORDER BY id",
            store.table()?
        ))
        .fetch_all(store.pool.pool())
        .await?;

        rows.iter()
            .map(|row| -> Result<KeyValue, sqlx::Error> {
                let key: String = row.try_get("key")?;
                let value: Option<String> = row.try_get("value")?;
                Ok(KeyValue::new(key, value.unwrap_or_default()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(AdapterError::from)
    }

    async fn delete(&self, database: &str) -> Result<bool, AdapterError> {
        let path = database_path(&self.database_dir, database)?;
        let mut current = self.current.lock().await;
        if current.as_ref().is_some_and(|store| store.database == database) {
            if let Some(store) = current.take() {
                store.pool.close().await;
            }
        }

        if !path.exists() {
            return Ok(false);
        }
        remove_database_files(&path)?;
        tracing::info!(path = %path.display(), "Deleted store");
        Ok(true)
    }
}

fn status(result: bool) -> StatusReply {
    StatusReply {
        result: Some(result),
        message: None,
    }
}

#[async_trait]
impl IStorageBackend for SqlxStorageBackend {
    async fn open_store(&self, request: &StoreRequest) -> Result<StatusReply, BackendError> {
        self.open(request).await?;
        Ok(StatusReply::success())
    }

    async fn set_table(&self, table: &str) -> Result<StatusReply, BackendError> {
        let mut current = self.current.lock().await;
        let Some(store) = current.as_mut() else {
            return Ok(StatusReply::failure("SetTable: Must open a store first"));
        };
        if let Err(e) = ensure_table(&store.pool, table).await {
            return Ok(StatusReply::failure(format!("SetTable: {e}")));
        }
        store.table = table.to_string();
        tracing::debug!(database = %store.database, table, "Table selected");
        Ok(StatusReply::success())
    }

    async fn get(&self, key: &str) -> Result<ValueReply, BackendError> {
        Ok(ValueReply {
            value: self.get_value(key).await?,
        })
    }

    async fn set(&self, key: &str, value: &str) -> Result<StatusReply, BackendError> {
        self.set_value(key, value).await?;
        Ok(StatusReply::success())
    }

    async fn remove(&self, key: &str) -> Result<StatusReply, BackendError> {
        Ok(status(self.remove_key(key).await?))
    }

    async fn clear(&self) -> Result<StatusReply, BackendError> {
        self.clear_table().await?;
        Ok(StatusReply::success())
    }

    async fn is_key(&self, key: &str) -> Result<StatusReply, BackendError> {
        Ok(status(self.has_key(key).await?))
    }

    async fn keys(&self) -> Result<KeysReply, BackendError> {
        let keys = self.pairs().await?.into_iter().map(|kv| kv.key).collect();
        Ok(KeysReply { keys: Some(keys) })
    }

    async fn values(&self) -> Result<StoredValuesReply, BackendError> {
        let values = self.pairs().await?.into_iter().map(|kv| kv.value).collect();
        Ok(StoredValuesReply {
            values: Some(values),
        })
    }

    async fn keys_values(&self) -> Result<KeysValuesReply, BackendError> {
        Ok(KeysValuesReply {
            keysvalues: Some(self.pairs().await?),
        })
    }

    async fn delete_store(&self, database: &str) -> Result<StatusReply, BackendError> {
        if self.delete(database).await? {
            Ok(StatusReply::success())
        } else {
            Ok(StatusReply::failure(format!(
                "DeleteStore: {database} does not exist"
            )))
        }
    }
}
