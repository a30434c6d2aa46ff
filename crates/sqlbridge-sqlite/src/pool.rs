//! Database pool management
//!
//! Provides a wrapper around SQLx's SqlitePool with:
//! - Automatic directory creation for database files
//! - WAL journal mode for writable databases
//! - Read-only opening that never creates a file
//! - In-memory mode for testing

use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::AdapterError;

/// File name suffix appended to every logical database name
pub const DATABASE_SUFFIX: &str = "SQLite.db";

/// Location of the database file for `name` inside `dir`
///
/// # Errors
///
/// Returns `AdapterError::InvalidName` when `name` is empty or could
/// resolve outside `dir`.
pub fn database_path(dir: &Path, name: &str) -> Result<PathBuf, AdapterError> {
    if matches!(name, "" | "." | "..") || name.contains(['/', '\\', '\0']) {
        return Err(AdapterError::InvalidName(name.to_string()));
    }
    Ok(dir.join(format!("{name}{DATABASE_SUFFIX}")))
}

/// Remove a database file with its WAL side files
pub fn remove_database_files(path: &Path) -> std::io::Result<()> {
    std::fs::remove_file(path)?;
    for suffix in ["-wal", "-shm"] {
        let mut side = path.as_os_str().to_owned();
        side.push(suffix);
        // Side files only exist while a WAL database is open
        let _ = std::fs::remove_file(side);
    }
    Ok(())
}

/// Quote a table or column name for interpolation into SQL
pub(crate) fn quote_identifier(name: &str) -> Result<String, AdapterError> {
    if name.is_empty() || name.contains('"') || name.contains('\0') {
        return Err(AdapterError::InvalidJson(format!("invalid identifier {name:?}")));
    }
    Ok(format!("\"{name}\""))
}

/// A pool over one SQLite database
///
/// Every pool holds a single connection: a logical connection of the
/// plugin maps to exactly one SQLite connection, so transactions and
/// pragmas behave as they would on the native plugin.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: SqlitePool,
    path: Option<PathBuf>,
    read_only: bool,
}

impl DatabasePool {
    /// Opens (creating if missing) a writable database file
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::ConnectionFailed` if the directory cannot be
    /// created or the connection cannot be established.
    pub async fn open(db_path: &Path) -> Result<Self, AdapterError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AdapterError::ConnectionFailed(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = Self::connect(options, db_path).await?;
        tracing::debug!(path = %db_path.display(), "Database pool opened");

        Ok(Self {
            pool,
            path: Some(db_path.to_path_buf()),
            read_only: false,
        })
    }

    /// Opens an existing database file without write access
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::ConnectionFailed` if the file does not exist.
    pub async fn open_read_only(db_path: &Path) -> Result<Self, AdapterError> {
        if !db_path.exists() {
            return Err(AdapterError::ConnectionFailed(format!(
                "Database {} does not exist",
                db_path.display()
            )));
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .read_only(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = Self::connect(options, db_path).await?;
        tracing::debug!(path = %db_path.display(), "Database pool opened read-only");

        Ok(Self {
            pool,
            path: Some(db_path.to_path_buf()),
            read_only: true,
        })
    }

    /// Creates an in-memory database pool for testing
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::ConnectionFailed` if the connection cannot be established.
    pub async fn in_memory() -> Result<Self, AdapterError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                AdapterError::ConnectionFailed(format!("Failed to create in-memory database: {}", e))
            })?;

        tracing::debug!("In-memory database pool opened");

        Ok(Self {
            pool,
            path: None,
            read_only: false,
        })
    }

    async fn connect(
        options: SqliteConnectOptions,
        db_path: &Path,
    ) -> Result<SqlitePool, AdapterError> {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| {
                AdapterError::ConnectionFailed(format!(
                    "Failed to connect to database at {}: {}",
                    db_path.display(),
                    e
                ))
            })
    }

    /// Returns a reference to the underlying SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// File backing this pool; `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Value of `PRAGMA user_version`
    pub async fn user_version(&self) -> Result<i64, AdapterError> {
        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await?;
        Ok(version)
    }

    pub async fn set_user_version(&self, version: i64) -> Result<(), AdapterError> {
        let sql = format!("PRAGMA user_version = {version}");
        sqlx::raw_sql(&sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Close the pool, waiting for the connection to be released
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!(path = ?self.path, "Database pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}
