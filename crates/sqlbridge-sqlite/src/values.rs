//! JSON <-> SQLite value mapping
//!
//! | JSON          | SQLite  |
//! |---------------|---------|
//! | null          | NULL    |
//! | bool          | INTEGER (0/1) |
//! | integer       | INTEGER |
//! | float         | REAL    |
//! | string        | TEXT    |
//! | array, object | TEXT (serialized JSON) |
//!
//! Going back, BLOBs become arrays of byte values.

use serde_json::{Map, Number, Value};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};

use crate::AdapterError;

pub(crate) type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Bind every value in order
pub(crate) fn bind_values<'q>(mut query: SqliteQuery<'q>, values: &'q [Value]) -> SqliteQuery<'q> {
    for value in values {
        query = match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => query.bind(i),
                None => query.bind(n.as_f64()),
            },
            Value::String(s) => query.bind(s.as_str()),
            other => query.bind(other.to_string()),
        };
    }
    query
}

/// Decode the `index`-th column of `row` by its runtime storage class
fn column_value(row: &SqliteRow, index: usize) -> Result<Value, AdapterError> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_string();

    let value = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => Value::from(row.try_get_unchecked::<i64, _>(index)?),
        "REAL" => Number::from_f64(row.try_get_unchecked::<f64, _>(index)?)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "BLOB" => Value::from(row.try_get_unchecked::<Vec<u8>, _>(index)?),
        _ => Value::String(row.try_get_unchecked::<String, _>(index)?),
    };
    Ok(value)
}

/// A row as a JSON object keyed by column name
pub(crate) fn row_to_object(row: &SqliteRow) -> Result<Value, AdapterError> {
    let mut object = Map::new();
    for column in row.columns() {
        object.insert(column.name().to_string(), column_value(row, column.ordinal())?);
    }
    Ok(Value::Object(object))
}

/// A row as a JSON array in column order
pub(crate) fn row_to_array(row: &SqliteRow) -> Result<Vec<Value>, AdapterError> {
    (0..row.len()).map(|index| column_value(row, index)).collect()
}
