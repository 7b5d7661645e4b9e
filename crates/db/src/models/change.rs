use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::project::Project;
use crate::update::UpdateBuilder;
use crate::value::SqlValue;
use crate::{Database, DbError, Row, params};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub id: i64,
    pub project_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub change_type: String,
    pub status: String,
    pub requested_by: Option<String>,
    pub approved_by: Option<String>,
    pub implemented_by: Option<String>,
    pub implementation_date: Option<NaiveDate>,
    pub rollback_plan: Option<String>,
    pub risk_assessment: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChange {
    pub title: String,
    pub description: Option<String>,
    pub change_type: Option<String>,
    pub requested_by: Option<String>,
    pub implementation_date: Option<NaiveDate>,
    pub rollback_plan: Option<String>,
    pub risk_assessment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChange {
    pub title: Option<String>,
    pub description: Option<String>,
    pub change_type: Option<String>,
    pub status: Option<String>,
    pub approved_by: Option<String>,
    pub implemented_by: Option<String>,
    pub implementation_date: Option<NaiveDate>,
    pub rollback_plan: Option<String>,
    pub risk_assessment: Option<String>,
}

impl Change {
    pub fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Change {
            id: row.i64("id")?,
            project_id: row.i64_opt("project_id"),
            title: row.string("title")?,
            description: row.str_opt("description"),
            change_type: row.str_opt("change_type").unwrap_or_else(|| "Normal".to_owned()),
            status: row.str_opt("status").unwrap_or_else(|| "Requested".to_owned()),
            requested_by: row.str_opt("requested_by"),
            approved_by: row.str_opt("approved_by"),
            implemented_by: row.str_opt("implemented_by"),
            implementation_date: row.date_opt("implementation_date"),
            rollback_plan: row.str_opt("rollback_plan"),
            risk_assessment: row.str_opt("risk_assessment"),
            created_at: row.datetime_opt("created_at"),
        })
    }

    pub async fn list_for_project(
        db: &Database,
        project_id: i64,
        user_id: i64,
    ) -> Result<Option<Vec<Change>>, DbError> {
        if !Project::is_owned_by(db, project_id, user_id).await? {
            return Ok(None);
        }
        let rows = db
            .execute(
                "SELECT * FROM changes WHERE project_id = ? ORDER BY created_at DESC",
                &params![project_id],
            )
            .await?;
        rows.iter().map(Self::from_row).collect::<Result<_, _>>().map(Some)
    }

    pub async fn find_for_user(db: &Database, id: i64, user_id: i64) -> Result<Option<Change>, DbError> {
        let rows = db
            .execute(
                "SELECT c.* FROM changes c JOIN projects p ON p.id = c.project_id \
                 WHERE c.id = ? AND p.user_id = ?",
                &params![id, user_id],
            )
            .await?;
        rows.first().map(Self::from_row).transpose()
    }

    pub async fn create(
        db: &Database,
        project_id: i64,
        user_id: i64,
        data: &CreateChange,
    ) -> Result<Option<Change>, DbError> {
        if !Project::is_owned_by(db, project_id, user_id).await? {
            return Ok(None);
        }
        let result = db
            .query(
                "INSERT INTO changes (project_id, title, description, change_type, requested_by, \
                 implementation_date, rollback_plan, risk_assessment) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                &params![
                    project_id,
                    &data.title,
                    data.description.as_deref(),
                    data.change_type.as_deref().unwrap_or("Normal"),
                    data.requested_by.as_deref(),
                    data.implementation_date,
                    data.rollback_plan.as_deref(),
                    data.risk_assessment.as_deref(),
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
        data: &UpdateChange,
    ) -> Result<Option<Change>, DbError> {
        if Self::find_for_user(db, id, user_id).await?.is_none() {
            return Ok(None);
        }

        let built = UpdateBuilder::new("changes")
            .set_opt("title", data.title.as_deref())
            .set_opt("description", data.description.as_deref())
            .set_opt("change_type", data.change_type.as_deref())
            .set_opt("status", data.status.as_deref())
            .set_opt("approved_by", data.approved_by.as_deref())
            .set_opt("implemented_by", data.implemented_by.as_deref())
            .set_opt("implementation_date", data.implementation_date)
            .set_opt("rollback_plan", data.rollback_plan.as_deref())
            .set_opt("risk_assessment", data.risk_assessment.as_deref())
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
        let result = db.query("DELETE FROM changes WHERE id = ?", &params![id]).await?;
        Ok(result.rows_affected > 0)
    }
}
