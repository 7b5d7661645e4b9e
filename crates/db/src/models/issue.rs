use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::project::Project;
use crate::update::UpdateBuilder;
use crate::value::SqlValue;
use crate::{Database, DbError, Row, params};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: i64,
    pub project_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub priority: String,
    pub status: String,
    pub resolution: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIssue {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIssue {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub resolution: Option<String>,
}

impl Issue {
    pub fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Issue {
            id: row.i64("id")?,
            project_id: row.i64_opt("project_id"),
            title: row.string("title")?,
            description: row.str_opt("description"),
            priority: row.str_opt("priority").unwrap_or_else(|| "Medium".to_owned()),
            status: row.str_opt("status").unwrap_or_else(|| "Open".to_owned()),
            resolution: row.str_opt("resolution"),
            created_at: row.datetime_opt("created_at"),
        })
    }

    pub async fn list_for_project(
        db: &Database,
        project_id: i64,
        user_id: i64,
    ) -> Result<Option<Vec<Issue>>, DbError> {
        if !Project::is_owned_by(db, project_id, user_id).await? {
            return Ok(None);
        }
        let rows = db
            .execute(
                "SELECT * FROM issues WHERE project_id = ? ORDER BY created_at DESC",
                &params![project_id],
            )
            .await?;
        rows.iter().map(Self::from_row).collect::<Result<_, _>>().map(Some)
    }

    pub async fn find_for_user(db: &Database, id: i64, user_id: i64) -> Result<Option<Issue>, DbError> {
        let rows = db
            .execute(
                "SELECT i.* FROM issues i JOIN projects p ON p.id = i.project_id \
                 WHERE i.id = ? AND p.user_id = ?",
                &params![id, user_id],
            )
            .await?;
        rows.first().map(Self::from_row).transpose()
    }

    pub async fn create(
        db: &Database,
        project_id: i64,
        user_id: i64,
        data: &CreateIssue,
    ) -> Result<Option<Issue>, DbError> {
        if !Project::is_owned_by(db, project_id, user_id).await? {
            return Ok(None);
        }
        let result = db
            .query(
                "INSERT INTO issues (project_id, title, description, priority) VALUES (?, ?, ?, ?)",
                &params![
                    project_id,
                    &data.title,
                    data.description.as_deref(),
                    data.priority.as_deref().unwrap_or("Medium"),
                ],
            )
            .await?;
        let id = result.insert_id.ok_or(DbError::NoInsertId)?;
        Self::find_for_user(db, id, user_id).await
    }

    pub async fn update(
        db: &Database,
        id: i64,
        user_id: i64,
        data: &UpdateIssue,
    ) -> Result<Option<Issue>, DbError> {
        if Self::find_for_user(db, id, user_id).await?.is_none() {
            return Ok(None);
        }

        let built = UpdateBuilder::new("issues")
            .set_opt("title", data.title.as_deref())
            .set_opt("description", data.description.as_deref())
            .set_opt("priority", data.priority.as_deref())
            .set_opt("status", data.status.as_deref())
            .set_opt("resolution", data.resolution.as_deref())
            .build("id = ?", [SqlValue::Integer(id)]);

        if let Some((sql, sql_params)) = built {
            db.query(&sql, &sql_params).await?;
        }
        Self::find_for_user(db, id, user_id).await
    }

    pub async fn delete(db: &Database, id: i64, user_id: i64) -> Result<bool, DbError> {
        if Self::find_for_user(db, id, user_id).await?.is_none() {
            return Ok(false);
        }
        let result = db.query("DELETE FROM issues WHERE id = ?", &params![id]).await?;
        Ok(result.rows_affected > 0)
    }
}
