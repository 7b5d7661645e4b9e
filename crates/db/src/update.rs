//! Conditional UPDATE statement builder.
//!
//! Partial updates arrive with an arbitrary subset of fields present. This
//! builder assembles the `SET` clause from a typed list of (column, value)
//! pairs instead of splicing strings, and refuses to produce a statement at
//! all when no field was supplied.

use crate::value::SqlValue;

pub struct UpdateBuilder {
    table: &'static str,
    columns: Vec<&'static str>,
    values: Vec<SqlValue>,
}

impl UpdateBuilder {
    pub fn new(table: &'static str) -> Self {
        UpdateBuilder {
            table,
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Always set `column`. Pass `SqlValue::Null` to clear a column.
    pub fn set(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.columns.push(column);
        self.values.push(value.into());
        self
    }

    /// Set `column` only when the field was present in the request.
    /// `None` means "absent", not "set to NULL".
    pub fn set_opt<T: Into<SqlValue>>(self, column: &'static str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Produce `UPDATE <table> SET c1 = ?, c2 = ? WHERE <clause>` with the
    /// WHERE parameters appended after the SET values, or `None` when no
    /// field was set.
    pub fn build(
        self,
        where_clause: &str,
        where_params: impl IntoIterator<Item = SqlValue>,
    ) -> Option<(String, Vec<SqlValue>)> {
        if self.columns.is_empty() {
            return None;
        }

        let sets = self
            .columns
            .iter()
            .map(|c| format!("{c} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE {} SET {} WHERE {}", self.table, sets, where_clause);

        let mut params = self.values;
        params.extend(where_params);
        Some((sql, params))
    }
}
