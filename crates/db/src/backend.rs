//! Dialect adapter: one `execute`/`query` vocabulary over both engines.
//!
//! Call sites write statements once in the canonical `?` placeholder style.
//! When the SQLite fallback is active the statement is rewritten to that
//! engine's `$1, $2, ...` markers in encounter order before dispatch, and
//! insert ids are read from whatever mechanism the engine exposes, so no
//! caller ever branches on which backend is live.

use sqlx::mysql::{MySql, MySqlArguments, MySqlPool};
use sqlx::sqlite::{Sqlite, SqliteArguments, SqlitePool};

use crate::error::DbError;
use crate::row::{self, Row};
use crate::value::SqlValue;

/// Which engine selection landed on. Chosen once, never switched at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    MySql,
    Sqlite,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::MySql => write!(f, "mysql"),
            BackendKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Outcome of `query()`: rows for result-set statements, insert metadata for
/// mutations. `insert_id` is uniform across backends.
#[derive(Debug, Default)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub insert_id: Option<i64>,
    pub rows_affected: u64,
}

pub enum Backend {
    MySql(MySqlPool),
    Sqlite(SqlitePool),
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::MySql(_) => BackendKind::MySql,
            Backend::Sqlite(_) => BackendKind::Sqlite,
        }
    }

    /// Run a statement expecting possibly many result rows. Rows come back
    /// in backend order, unsorted.
    pub async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, DbError> {
        match self {
            Backend::MySql(pool) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = bind_mysql(query, param);
                }
                let rows = query.fetch_all(pool).await.map_err(DbError::query)?;
                rows.iter().map(row::from_mysql).collect()
            }
            Backend::Sqlite(pool) => {
                let rewritten = rewrite_placeholders(sql);
                let mut query = sqlx::query(&rewritten);
                for param in params {
                    query = bind_sqlite(query, param);
                }
                let rows = query.fetch_all(pool).await.map_err(DbError::query)?;
                rows.iter().map(row::from_sqlite).collect()
            }
        }
    }

    /// Run a statement and also surface insert metadata. Result-set
    /// statements behave like `execute`; mutations yield the generated id
    /// (when any) and the affected row count.
    pub async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<QueryResult, DbError> {
        if is_result_set_statement(sql) {
            let rows = self.execute(sql, params).await?;
            return Ok(QueryResult {
                rows,
                ..QueryResult::default()
            });
        }

        match self {
            Backend::MySql(pool) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = bind_mysql(query, param);
                }
                let done = query.execute(pool).await.map_err(DbError::query)?;
                let last_id = done.last_insert_id();
                Ok(QueryResult {
                    rows: Vec::new(),
                    insert_id: (last_id != 0).then_some(last_id as i64),
                    rows_affected: done.rows_affected(),
                })
            }
            Backend::Sqlite(pool) => {
                let rewritten = rewrite_placeholders(sql);
                let mut query = sqlx::query(&rewritten);
                for param in params {
                    query = bind_sqlite(query, param);
                }
                let done = query.execute(pool).await.map_err(DbError::query)?;
                // last_insert_rowid is scoped to the connection that ran the
                // statement, so interleaved writers cannot corrupt it.
                let last_id = done.last_insert_rowid();
                Ok(QueryResult {
                    rows: Vec::new(),
                    insert_id: (last_id != 0).then_some(last_id),
                    rows_affected: done.rows_affected(),
                })
            }
        }
    }

    /// Trivial liveness check.
    pub async fn ping(&self) -> Result<(), DbError> {
        match self {
            Backend::MySql(pool) => {
                sqlx::query("SELECT 1")
                    .execute(pool)
                    .await
                    .map_err(DbError::query)?;
            }
            Backend::Sqlite(pool) => {
                sqlx::query("SELECT 1")
                    .execute(pool)
                    .await
                    .map_err(DbError::query)?;
            }
        }
        Ok(())
    }

    pub async fn close(&self) {
        match self {
            Backend::MySql(pool) => pool.close().await,
            Backend::Sqlite(pool) => pool.close().await,
        }
    }
}

fn bind_mysql<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    value: &SqlValue,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Integer(v) => query.bind(*v),
        SqlValue::Real(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.clone()),
        SqlValue::Bool(v) => query.bind(*v),
    }
}

fn bind_sqlite<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &SqlValue,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Integer(v) => query.bind(*v),
        SqlValue::Real(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.clone()),
        SqlValue::Bool(v) => query.bind(*v),
    }
}

/// Rewrite canonical `?` markers to `$1, $2, ...` in encounter order.
/// Question marks inside quoted literals are left alone.
pub(crate) fn rewrite_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut index = 0usize;
    let mut quote: Option<char> = None;

    for ch in sql.chars() {
        match quote {
            Some(open) => {
                if ch == open {
                    quote = None;
                }
                out.push(ch);
            }
            None => match ch {
                '\'' | '"' | '`' => {
                    quote = Some(ch);
                    out.push(ch);
                }
                '?' => {
                    index += 1;
                    out.push('$');
                    out.push_str(&index.to_string());
                }
                _ => out.push(ch),
            },
        }
    }

    out
}

/// Statements whose first keyword promises a result set rather than an
/// insert id. Matches the behavior routes were written against.
pub(crate) fn is_result_set_statement(sql: &str) -> bool {
    let first = sql
        .trim_start()
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_ascii_uppercase();
    matches!(first.as_str(), "SELECT" | "WITH" | "EXPLAIN")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_number_in_encounter_order() {
        assert_eq!(
            rewrite_placeholders("SELECT * FROM t WHERE a = ? AND b = ?"),
            "SELECT * FROM t WHERE a = $1 AND b = $2"
        );
    }

    #[test]
    fn no_placeholders_is_identity() {
        let sql = "SELECT COUNT(*) AS count FROM notifications";
        assert_eq!(rewrite_placeholders(sql), sql);
    }

    #[test]
    fn question_mark_inside_literal_survives() {
        assert_eq!(
            rewrite_placeholders("SELECT * FROM t WHERE title = 'why?' AND id = ?"),
            "SELECT * FROM t WHERE title = 'why?' AND id = $1"
        );
        assert_eq!(
            rewrite_placeholders(r#"UPDATE t SET note = "??" WHERE id = ?"#),
            r#"UPDATE t SET note = "??" WHERE id = $1"#
        );
    }

    #[test]
    fn many_placeholders_past_nine() {
        let sql = "INSERT INTO t VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";
        let rewritten = rewrite_placeholders(sql);
        assert!(rewritten.ends_with("$10, $11)"));
    }

    #[test]
    fn statement_classification() {
        assert!(is_result_set_statement("  select * from t"));
        assert!(is_result_set_statement("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(!is_result_set_statement("INSERT INTO t (x) VALUES (?)"));
        assert!(!is_result_set_statement("UPDATE t SET x = ?"));
        assert!(!is_result_set_statement("DELETE FROM t"));
    }
}
