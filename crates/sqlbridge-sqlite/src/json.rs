//! JSON import and export of whole databases
//!
//! The document shape:
//!
//! ```json
//! {
//!   "database": "testDB",
//!   "version": 1,
//!   "encrypted": false,
//!   "mode": "full",
//!   "tables": [
//!     {
//!       "name": "users",
//!       "schema": [
//!         {"column": "id", "value": "INTEGER PRIMARY KEY NOT NULL"},
//!         {"column": "name", "value": "TEXT"},
//!         {"foreignkey": "team_id", "value": "REFERENCES teams(id)"}
//!       ],
//!       "values": [[1, "Alice"], [2, "Bob"]]
//!     }
//!   ]
//! }
//! ```
//!
//! A `full` import drops and recreates every listed table. A `partial`
//! import creates missing tables and upserts rows. A `partial` export only
//! includes tables carrying a `last_modified` column, restricted to rows
//! modified after the date stored in `sync_table`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Row, SqliteConnection, SqlitePool};

use sqlbridge_core::domain::{Changes, ExportMode};

use crate::pool::quote_identifier;
use crate::values::{bind_values, row_to_array};
use crate::AdapterError;

/// Name of the table holding the last synchronization date
pub const SYNC_TABLE: &str = "sync_table";

/// Column compared against the sync date in partial exports
pub const LAST_MODIFIED: &str = "last_modified";

/// A database serialized as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSqlite {
    pub database: String,
    pub version: i64,
    #[serde(default)]
    pub encrypted: bool,
    pub mode: String,
    pub tables: Vec<JsonTable>,
}

/// One table of a [`JsonSqlite`] document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonTable {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schema: Vec<JsonColumn>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Vec<Value>>,
}

/// One schema entry: a column, a foreign key or a named constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonColumn {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreignkey: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
    pub value: String,
}

impl JsonColumn {
    pub fn column(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: Some(name.into()),
            foreignkey: None,
            constraint: None,
            value: value.into(),
        }
    }

    /// SQL fragment of this entry inside `CREATE TABLE (...)`
    fn definition(&self) -> Result<String, AdapterError> {
        match (&self.column, &self.foreignkey, &self.constraint) {
            (Some(column), None, None) => Ok(format!("{} {}", quote_identifier(column)?, self.value)),
            (None, Some(key), None) => Ok(format!(
                "FOREIGN KEY ({}) {}",
                quote_identifier(key)?,
                self.value
            )),
            (None, None, Some(name)) => Ok(format!(
                "CONSTRAINT {} {}",
                quote_identifier(name)?,
                self.value
            )),
            _ => Err(AdapterError::InvalidJson(
                "schema entry needs exactly one of column, foreignkey, constraint".to_string(),
            )),
        }
    }
}

impl JsonTable {
    fn columns(&self) -> Vec<&str> {
        self.schema
            .iter()
            .filter_map(|entry| entry.column.as_deref())
            .collect()
    }
}

impl JsonSqlite {
    /// Parse and validate a document
    pub fn parse(json: &str) -> Result<Self, AdapterError> {
        let doc: Self = serde_json::from_str(json)
            .map_err(|e| AdapterError::InvalidJson(format!("not a database document: {e}")))?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn export_mode(&self) -> Result<ExportMode, AdapterError> {
        self.mode
            .parse()
            .map_err(|_| AdapterError::InvalidJson(format!("unknown mode {:?}", self.mode)))
    }

    /// Check the document is importable
    pub fn validate(&self) -> Result<(), AdapterError> {
        if self.database.is_empty() {
            return Err(AdapterError::InvalidJson("database is empty".to_string()));
        }
        if self.version < 1 {
            return Err(AdapterError::InvalidJson(format!(
                "version must be at least 1, got {}",
                self.version
            )));
        }
        let mode = self.export_mode()?;

        for table in &self.tables {
            quote_identifier(&table.name)?;
            if mode == ExportMode::Full && table.schema.is_empty() {
                return Err(AdapterError::InvalidJson(format!(
                    "table {} has no schema",
                    table.name
                )));
            }
            for entry in &table.schema {
                entry.definition()?;
            }

            let width = table.columns().len();
            if width == 0 {
                // A partial table without schema targets an existing table
                if mode == ExportMode::Partial && table.schema.is_empty() {
                    continue;
                }
                if !table.values.is_empty() {
                    return Err(AdapterError::InvalidJson(format!(
                        "table {} has values but no columns",
                        table.name
                    )));
                }
                continue;
            }
            if let Some(row) = table.values.iter().position(|row| row.len() != width) {
                return Err(AdapterError::InvalidJson(format!(
                    "table {} row {} has {} values, expected {}",
                    table.name,
                    row,
                    table.values[row].len(),
                    width
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Import
// ============================================================================

/// Apply `doc` to the database behind `pool` inside one transaction
///
/// Returns the number of rows written.
pub async fn import(pool: &SqlitePool, doc: &JsonSqlite) -> Result<Changes, AdapterError> {
    let mode = doc.export_mode()?;
    let mut tx = pool.begin().await?;
    let mut changes = 0_i64;
    let mut last_id = 0_i64;

    for table in &doc.tables {
        let name = quote_identifier(&table.name)?;

        if !table.schema.is_empty() {
            let definitions = table
                .schema
                .iter()
                .map(JsonColumn::definition)
                .collect::<Result<Vec<_>, _>>()?
                .join(", ");
            let ddl = match mode {
                ExportMode::Full => {
                    format!("DROP TABLE IF EXISTS {name}; CREATE TABLE {name} ({definitions});")
                }
                ExportMode::Partial => format!("CREATE TABLE IF NOT EXISTS {name} ({definitions});"),
            };
            sqlx::Executor::execute(&mut *tx, sqlx::raw_sql(&ddl)).await?;
        }

        if table.values.is_empty() {
            continue;
        }
        let columns: Vec<String> = if table.schema.is_empty() {
            existing_columns(&mut *tx, &table.name).await?
        } else {
            table.columns().into_iter().map(str::to_string).collect()
        };
        if columns.is_empty() {
            continue;
        }
        if let Some(row) = table.values.iter().position(|row| row.len() != columns.len()) {
            return Err(AdapterError::InvalidJson(format!(
                "table {} row {} has {} values, expected {}",
                table.name,
                row,
                table.values[row].len(),
                columns.len()
            )));
        }
        let column_list = columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ");
        let placeholders = vec!["?"; columns.len()].join(", ");
        let insert = format!("INSERT OR REPLACE INTO {name} ({column_list}) VALUES ({placeholders})");

        for row in &table.values {
            let result = bind_values(sqlx::query(&insert), row)
                .execute(&mut *tx)
                .await?;
            changes += result.rows_affected() as i64;
            last_id = result.last_insert_rowid();
        }
        tracing::debug!(table = %table.name, rows = table.values.len(), "Imported table");
    }

    tx.commit().await?;
    Ok(Changes::new(changes, last_id))
}

/// Column names of an existing table, read inside the import transaction
async fn existing_columns(
    conn: &mut SqliteConnection,
    table: &str,
) -> Result<Vec<String>, AdapterError> {
    let rows = sqlx::query(&format!("PRAGMA table_info({})", quote_identifier(table)?))
        .fetch_all(&mut *conn)
        .await?;
    if rows.is_empty() {
        return Err(AdapterError::InvalidJson(format!(
            "table {table} has no schema and does not exist"
        )));
    }
    rows.iter()
        .map(|row| row.try_get::<String, _>("name").map_err(AdapterError::from))
        .collect()
}

// ============================================================================
// Export
// ============================================================================

/// Last synchronization date as a unix timestamp
pub async fn sync_date(pool: &SqlitePool) -> Result<Option<i64>, AdapterError> {
    let exists: Option<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(SYNC_TABLE)
            .fetch_optional(pool)
            .await?;
    if exists.is_none() {
        return Ok(None);
    }

    let date: Option<Option<i64>> =
        sqlx::query_scalar("SELECT sync_date FROM sync_table WHERE id = 1")
            .fetch_optional(pool)
            .await?;
    Ok(date.flatten())
}

/// Serialize the database behind `pool`
pub async fn export(
    pool: &SqlitePool,
    database: &str,
    mode: ExportMode,
) -> Result<JsonSqlite, AdapterError> {
    let since = match mode {
        ExportMode::Full => None,
        ExportMode::Partial => Some(sync_date(pool).await?.ok_or_else(|| {
            AdapterError::QueryFailed(
                "partial export needs a sync date, create the sync table first".to_string(),
            )
        })?),
    };

    let names: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name != ? \
         ORDER BY rowid",
    )
    .bind(SYNC_TABLE)
    .fetch_all(pool)
    .await?;

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let schema = table_schema(pool, &name).await?;
        let has_last_modified = schema
            .iter()
            .any(|entry| entry.column.as_deref() == Some(LAST_MODIFIED));

        let quoted = quote_identifier(&name)?;
        let rows = match since {
            None => {
                sqlx::query(&format!("SELECT * FROM {quoted}"))
                    .fetch_all(pool)
                    .await?
            }
            Some(_) if !has_last_modified => continue,
            Some(date) => {
                sqlx::query(&format!("SELECT * FROM {quoted} WHERE {LAST_MODIFIED} > ?"))
                    .bind(date)
                    .fetch_all(pool)
                    .await?
            }
        };
        let values = rows
            .iter()
            .map(row_to_array)
            .collect::<Result<Vec<_>, _>>()?;

        tables.push(JsonTable {
            name,
            schema,
            values,
        });
    }

    let version = sqlx::query_scalar::<_, i64>("PRAGMA user_version")
        .fetch_one(pool)
        .await?;

    Ok(JsonSqlite {
        database: database.to_string(),
        version: version.max(1),
        encrypted: false,
        mode: mode.as_str().to_string(),
        tables,
    })
}

/// Column definitions of `table` as reported by `PRAGMA table_info`
async fn table_schema(pool: &SqlitePool, table: &str) -> Result<Vec<JsonColumn>, AdapterError> {
    let rows = sqlx::query(&format!("PRAGMA table_info({})", quote_identifier(table)?))
        .fetch_all(pool)
        .await?;
    let primary_keys = rows
        .iter()
        .filter(|row| row.try_get::<i64, _>("pk").unwrap_or(0) > 0)
        .count();

    rows.iter()
        .map(|row| -> Result<JsonColumn, AdapterError> {
            let name: String = row.try_get("name")?;
            let mut value: String = row.try_get("type")?;
            if primary_keys == 1 && row.try_get::<i64, _>("pk")? > 0 {
                value.push_str(" PRIMARY KEY");
            }
            if row.try_get::<i64, _>("notnull")? != 0 {
                value.push_str(" NOT NULL");
            }
            if let Some(default) = row.try_get::<Option<String>, _>("dflt_value")? {
                value.push_str(" DEFAULT ");
                value.push_str(&default);
            }
            Ok(JsonColumn::column(name, value.trim_start().to_string()))
        })
        .collect()
}
