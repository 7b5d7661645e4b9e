//! Normalized result rows.
//!
//! Regardless of which backend is active, callers receive the same shape: an
//! ordered mapping from column name to a JSON value. Callers must not assume
//! a numeric-looking column arrives as a native number — DECIMAL columns in
//! particular come back as text — so the getters here coerce defensively and
//! yield `None` instead of panicking on surprises.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};
use sqlx::{Column, Row as _, TypeInfo, ValueRef, mysql::MySqlRow, sqlite::SqliteRow};

use crate::error::DbError;

/// One result row, columns in backend order.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct Row(Map<String, Value>);

impl Row {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// String value, if present and textual. Numbers are rendered to text so
    /// a backend returning `42` where the other returns `"42"` reads the same.
    pub fn str_opt(&self, column: &str) -> Option<String> {
        match self.get(column)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn string(&self, column: &str) -> Result<String, DbError> {
        self.str_opt(column)
            .ok_or_else(|| DbError::Column(column.to_owned()))
    }

    pub fn i64_opt(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn i64(&self, column: &str) -> Result<i64, DbError> {
        self.i64_opt(column)
            .ok_or_else(|| DbError::Column(column.to_owned()))
    }

    /// `parseFloat(...) || null` equivalent: numeric text coerces, garbage
    /// does not.
    pub fn f64_opt(&self, column: &str) -> Option<f64> {
        match self.get(column)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Truthy flag: accepts booleans, nonzero numbers and "1"/"true" text,
    /// which is what `read_status`-style TINYINT columns produce.
    pub fn bool_flag(&self, column: &str) -> bool {
        match self.get(column) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => matches!(s.trim(), "1" | "true" | "TRUE"),
            _ => false,
        }
    }

    /// Date columns travel as ISO text on both backends; a trailing time
    /// component is tolerated and ignored.
    pub fn date_opt(&self, column: &str) -> Option<NaiveDate> {
        let text = self.str_opt(column)?;
        let date_part = text.get(..10)?;
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
    }

    pub fn datetime_opt(&self, column: &str) -> Option<NaiveDateTime> {
        let text = self.str_opt(column)?;
        let trimmed = text.trim();
        NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S"))
            .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
    }
}

impl From<Map<String, Value>> for Row {
    fn from(map: Map<String, Value>) -> Self {
        Row(map)
    }
}

pub(crate) fn from_mysql(row: &MySqlRow) -> Result<Row, DbError> {
    let mut map = Map::with_capacity(row.columns().len());
    for (i, col) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(i).map_err(DbError::query)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            decode_mysql(row, i, raw.type_info().name())?
        };
        map.insert(col.name().to_owned(), value);
    }
    Ok(Row(map))
}

fn decode_mysql(row: &MySqlRow, i: usize, type_name: &str) -> Result<Value, DbError> {
    let value = match type_name {
        "BOOLEAN" => Value::from(row.try_get::<bool, _>(i).map_err(DbError::query)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            Value::from(row.try_get::<i64, _>(i).map_err(DbError::query)?)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => Value::from(row.try_get::<u64, _>(i).map_err(DbError::query)?),
        "FLOAT" => Value::from(f64::from(row.try_get::<f32, _>(i).map_err(DbError::query)?)),
        "DOUBLE" => Value::from(row.try_get::<f64, _>(i).map_err(DbError::query)?),
        // DECIMAL stays textual: exact, and callers coerce explicitly.
        "DECIMAL" => Value::from(
            row.try_get::<rust_decimal::Decimal, _>(i)
                .map_err(DbError::query)?
                .to_string(),
        ),
        "DATE" => Value::from(
            row.try_get::<NaiveDate, _>(i)
                .map_err(DbError::query)?
                .format("%Y-%m-%d")
                .to_string(),
        ),
        "DATETIME" => Value::from(
            row.try_get::<NaiveDateTime, _>(i)
                .map_err(DbError::query)?
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        ),
        "TIMESTAMP" => Value::from(
            row.try_get::<chrono::DateTime<chrono::Utc>, _>(i)
                .map_err(DbError::query)?
                .naive_utc()
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        ),
        "TIME" => Value::from(
            row.try_get::<chrono::NaiveTime, _>(i)
                .map_err(DbError::query)?
                .format("%H:%M:%S")
                .to_string(),
        ),
        _ => match row.try_get::<String, _>(i) {
            Ok(text) => Value::from(text),
            Err(err) => {
                tracing::warn!(column = i, r#type = type_name, error = %err,
                    "undecodable mysql column, returning null");
                Value::Null
            }
        },
    };
    Ok(value)
}

pub(crate) fn from_sqlite(row: &SqliteRow) -> Result<Row, DbError> {
    let mut map = Map::with_capacity(row.columns().len());
    for (i, col) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(i).map_err(DbError::query)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            decode_sqlite(row, i, &raw.type_info().name().to_ascii_uppercase())?
        };
        map.insert(col.name().to_owned(), value);
    }
    Ok(Row(map))
}

fn decode_sqlite(row: &SqliteRow, i: usize, type_name: &str) -> Result<Value, DbError> {
    // SQLite columns are dynamically typed; the declared affinity is a hint,
    // not a guarantee, so numeric decodes fall back to text.
    let value = if type_name.contains("INT") || type_name.contains("BOOL") {
        match row.try_get::<i64, _>(i) {
            Ok(v) => Value::from(v),
            Err(_) => Value::from(row.try_get::<String, _>(i).map_err(DbError::query)?),
        }
    } else if type_name.contains("REAL")
        || type_name.contains("FLOA")
        || type_name.contains("DOUB")
        || type_name.contains("NUMERIC")
        || type_name.contains("DECIMAL")
    {
        match row.try_get::<f64, _>(i) {
            Ok(v) => Value::from(v),
            Err(_) => Value::from(row.try_get::<String, _>(i).map_err(DbError::query)?),
        }
    } else if type_name.contains("BLOB") {
        tracing::warn!(column = i, "blob column has no JSON mapping, returning null");
        Value::Null
    } else {
        Value::from(row.try_get::<String, _>(i).map_err(DbError::query)?)
    };
    Ok(value)
}
