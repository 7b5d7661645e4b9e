//! Project records, the ownership root for everything else.
//!
//! Every child table (tasks, milestones, assets, ...) checks access by
//! joining back to `projects.user_id`; [`Project::is_owned_by`] is the
//! single predicate they share.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::update::UpdateBuilder;
use crate::value::SqlValue;
use crate::{Database, DbError, Row, params};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub client: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: String,
    pub risk_score: Option<i64>,
    /// DECIMAL columns arrive as text from either backend; coerced here.
    pub budgeted_amount: Option<f64>,
    pub spent_amount: Option<f64>,
    pub currency_code: Option<String>,
    pub user_id: Option<i64>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProject {
    pub title: String,
    pub description: Option<String>,
    pub client: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProject {
    pub title: Option<String>,
    pub description: Option<String>,
    pub client: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub risk_score: Option<i64>,
}

impl Project {
    pub fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Project {
            id: row.i64("id")?,
            title: row.string("title")?,
            description: row.str_opt("description"),
            client: row.str_opt("client"),
            start_date: row.date_opt("start_date"),
            end_date: row.date_opt("end_date"),
            status: row.str_opt("status").unwrap_or_else(|| "Active".to_owned()),
            risk_score: row.i64_opt("risk_score"),
            budgeted_amount: row.f64_opt("budgeted_amount"),
            spent_amount: row.f64_opt("spent_amount"),
            currency_code: row.str_opt("currency_code"),
            user_id: row.i64_opt("user_id"),
            created_at: row.datetime_opt("created_at"),
        })
    }

    /// The shared ownership predicate: does `project_id` belong to `user_id`?
    pub async fn is_owned_by(
        db: &Database,
        project_id: i64,
        user_id: i64,
    ) -> Result<bool, DbError> {
        let rows = db
            .execute(
                "SELECT id FROM projects WHERE id = ? AND user_id = ?",
                &params![project_id, user_id],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    pub async fn list_for_user(db: &Database, user_id: i64) -> Result<Vec<Project>, DbError> {
        let rows = db
            .execute(
                "SELECT * FROM projects WHERE user_id = ? ORDER BY created_at DESC",
                &params![user_id],
            )
            .await?;
        rows.iter().map(Self::from_row).collect()
    }

    pub async fn find_for_user(
        db: &Database,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Project>, DbError> {
        let rows = db
            .execute(
                "SELECT * FROM projects WHERE id = ? AND user_id = ?",
                &params![id, user_id],
            )
            .await?;
        rows.first().map(Self::from_row).transpose()
    }

    pub async fn create(
        db: &Database,
        data: &CreateProject,
        user_id: i64,
    ) -> Result<Project, DbError> {
        let result = db
            .query(
                "INSERT INTO projects (title, description, client, start_date, end_date, status, user_id) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                &params![
                    &data.title,
                    data.description.as_deref(),
                    data.client.as_deref(),
                    data.start_date,
                    data.end_date,
                    data.status.as_deref().unwrap_or("Active"),
                    user_id,
                ],
            )
            .await?;
        let id = result.insert_id.ok_or(DbError::NoInsertId)?;
        Self::find_for_user(db, id, user_id)
            .await?
            .ok_or(DbError::RowNotFound)
    }

    /// Partial update. Returns the fresh row, or `None` when the project is
    /// missing or owned by someone else. A request with no recognized
    /// fields is a no-op, not an error.
    pub async fn update(
        db: &Database,
        id: i64,
        user_id: i64,
        data: &UpdateProject,
    ) -> Result<Option<Project>, DbError> {
        if !Self::is_owned_by(db, id, user_id).await? {
            return Ok(None);
        }

        let built = UpdateBuilder::new("projects")
            .set_opt("title", data.title.as_deref())
            .set_opt("description", data.description.as_deref())
            .set_opt("client", data.client.as_deref())
            .set_opt("start_date", data.start_date)
            .set_opt("end_date", data.end_date)
            .set_opt("status", data.status.as_deref())
            .set_opt("risk_score", data.risk_score)
            .build(
                "id = ? AND user_id = ?",
                [SqlValue::Integer(id), SqlValue::Integer(user_id)],
            );

        if let Some((sql, sql_params)) = built {
            db.query(&sql, &sql_params).await?;
        }
        Self::find_for_user(db, id, user_id).await
    }

    /// Delete cascades to every child table. Returns whether a row went away.
    pub async fn delete(db: &Database, id: i64, user_id: i64) -> Result<bool, DbError> {
        let result = db
            .query(
                "DELETE FROM projects WHERE id = ? AND user_id = ?",
                &params![id, user_id],
            )
            .await?;
        Ok(result.rows_affected > 0)
    }
}
