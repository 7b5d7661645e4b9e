//! User notifications. Owned directly by `user_id`, no project join needed.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::value::SqlValue;
use crate::{Database, DbError, Row, params};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub user_id: Option<i64>,
    pub project_id: Option<i64>,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub read_status: bool,
    pub created_at: Option<NaiveDateTime>,
}

/// Optional filters for listing: read state and row cap.
#[derive(Debug, Default)]
pub struct NotificationFilter {
    pub read: Option<bool>,
    pub limit: Option<i64>,
}

impl Notification {
    pub fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Notification {
            id: row.i64("id")?,
            user_id: row.i64_opt("user_id"),
            project_id: row.i64_opt("project_id"),
            title: row.string("title")?,
            message: row.string("message")?,
            kind: row.str_opt("type").unwrap_or_else(|| "info".to_owned()),
            read_status: row.bool_flag("read_status"),
            created_at: row.datetime_opt("created_at"),
        })
    }

    pub async fn list_for_user(
        db: &Database,
        user_id: i64,
        filter: &NotificationFilter,
    ) -> Result<Vec<Notification>, DbError> {
        let mut sql = String::from("SELECT * FROM notifications WHERE user_id = ?");
        let mut sql_params = vec![SqlValue::Integer(user_id)];

        if let Some(read) = filter.read {
            sql.push_str(" AND read_status = ?");
            sql_params.push(SqlValue::Integer(i64::from(read)));
        }
        sql.push_str(" ORDER BY created_at DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            sql_params.push(SqlValue::Integer(limit));
        }

        let rows = db.execute(&sql, &sql_params).await?;
        rows.iter().map(Self::from_row).collect()
    }

    pub async fn unread_count(db: &Database, user_id: i64) -> Result<i64, DbError> {
        let rows = db
            .execute(
                "SELECT COUNT(*) AS count FROM notifications WHERE user_id = ? AND read_status = 0",
                &params![user_id],
            )
            .await?;
        Ok(rows.first().and_then(|r| r.i64_opt("count")).unwrap_or(0))
    }

    pub async fn create(
        db: &Database,
        user_id: i64,
        project_id: Option<i64>,
        title: &str,
        message: &str,
        kind: &str,
    ) -> Result<Notification, DbError> {
        let result = db
            .query(
                "INSERT INTO notifications (user_id, project_id, title, message, type) \
                 VALUES (?, ?, ?, ?, ?)",
                &params![user_id, project_id, title, message, kind],
            )
            .await?;
        let id = result.insert_id.ok_or(DbError::NoInsertId)?;
        let rows = db
            .execute("SELECT * FROM notifications WHERE id = ?", &params![id])
            .await?;
        rows.first()
            .map(Self::from_row)
            .transpose()?
            .ok_or(DbError::RowNotFound)
    }

    pub async fn mark_read(db: &Database, id: i64, user_id: i64) -> Result<bool, DbError> {
        let result = db
            .query(
                "UPDATE notifications SET read_status = 1 WHERE id = ? AND user_id = ?",
                &params![id, user_id],
            )
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn mark_all_read(db: &Database, user_id: i64) -> Result<u64, DbError> {
        let result = db
            .query(
                "UPDATE notifications SET read_status = 1 WHERE user_id = ? AND read_status = 0",
                &params![user_id],
            )
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn delete(db: &Database, id: i64, user_id: i64) -> Result<bool, DbError> {
        let result = db
            .query(
                "DELETE FROM notifications WHERE id = ? AND user_id = ?",
                &params![id, user_id],
            )
            .await?;
        Ok(result.rows_affected > 0)
    }
}
