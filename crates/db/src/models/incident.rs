use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::project::Project;
use crate::update::UpdateBuilder;
use crate::value::SqlValue;
use crate::{Database, DbError, Row, params};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: i64,
    pub project_id: Option<i64>,
    pub asset_id: Option<i64>,
    pub sla_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub priority: String,
    pub status: String,
    pub reported_by: Option<String>,
    pub assigned_to: Option<String>,
    pub resolution: Option<String>,
    pub resolved_at: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIncident {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub asset_id: Option<i64>,
    pub sla_id: Option<i64>,
    pub reported_by: Option<String>,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIncident {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub assigned_to: Option<String>,
    pub asset_id: Option<i64>,
    pub sla_id: Option<i64>,
}

impl Incident {
    pub fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Incident {
            id: row.i64("id")?,
            project_id: row.i64_opt("project_id"),
            asset_id: row.i64_opt("asset_id"),
            sla_id: row.i64_opt("sla_id"),
            title: row.string("title")?,
            description: row.str_opt("description"),
            priority: row.str_opt("priority").unwrap_or_else(|| "Medium".to_owned()),
            status: row.str_opt("status").unwrap_or_else(|| "Open".to_owned()),
            reported_by: row.str_opt("reported_by"),
            assigned_to: row.str_opt("assigned_to"),
            resolution: row.str_opt("resolution"),
            resolved_at: row.datetime_opt("resolved_at"),
            created_at: row.datetime_opt("created_at"),
        })
    }

    pub async fn list_for_project(
        db: &Database,
        project_id: i64,
        user_id: i64,
    ) -> Result<Option<Vec<Incident>>, DbError> {
        if !Project::is_owned_by(db, project_id, user_id).await? {
            return Ok(None);
        }
        let rows = db
            .execute(
                "SELECT * FROM incidents WHERE project_id = ? ORDER BY created_at DESC",
                &params![project_id],
            )
            .await?;
        rows.iter().map(Self::from_row).collect::<Result<_, _>>().map(Some)
    }

    pub async fn find_for_user(
        db: &Database,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Incident>, DbError> {
        let rows = db
            .execute(
                "SELECT i.* FROM incidents i JOIN projects p ON p.id = i.project_id \
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
        data: &CreateIncident,
    ) -> Result<Option<Incident>, DbError> {
        if !Project::is_owned_by(db, project_id, user_id).await? {
            return Ok(None);
        }
        let result = db
            .query(
                "INSERT INTO incidents (project_id, asset_id, sla_id, title, description, \
                 priority, reported_by, assigned_to) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                &params![
                    project_id,
                    data.asset_id,
                    data.sla_id,
                    &data.title,
                    data.description.as_deref(),
                    data.priority.as_deref().unwrap_or("Medium"),
                    data.reported_by.as_deref(),
                    data.assigned_to.as_deref(),
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
        data: &UpdateIncident,
    ) -> Result<Option<Incident>, DbError> {
        if Self::find_for_user(db, id, user_id).await?.is_none() {
            return Ok(None);
        }

        let built = UpdateBuilder::new("incidents")
            .set_opt("title", data.title.as_deref())
            .set_opt("description", data.description.as_deref())
            .set_opt("priority", data.priority.as_deref())
            .set_opt("status", data.status.as_deref())
            .set_opt("assigned_to", data.assigned_to.as_deref())
            .set_opt("asset_id", data.asset_id)
            .set_opt("sla_id", data.sla_id)
            .build("id = ?", [SqlValue::Integer(id)]);

        if let Some((sql, sql_params)) = built {
            db.query(&sql, &sql_params).await?;
        }
        Self::find_for_user(db, id, user_id).await
    }

    /// Closes the incident: records the resolution text and stamps `resolved_at`.
    pub async fn resolve(
        db: &Database,
        id: i64,
        user_id: i64,
        resolution: &str,
    ) -> Result<Option<Incident>, DbError> {
        if Self::find_for_user(db, id, user_id).await?.is_none() {
            return Ok(None);
        }
        db.query(
            "UPDATE incidents SET status = 'Resolved', resolution = ?, \
             resolved_at = CURRENT_TIMESTAMP WHERE id = ?",
            &params![resolution, id],
        )
        .await?;
        Self::find_for_user(db, id, user_id).await
    }

    pub async fn delete(db: &Database, id: i64, user_id: i64) -> Result<bool, DbError> {
        if Self::find_for_user(db, id, user_id).await?.is_none() {
            return Ok(false);
        }
        let result = db
            .query("DELETE FROM incidents WHERE id = ?", &params![id])
            .await?;
        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::{seeded_project, seeded_user, test_db};

    #[tokio::test]
    async fn resolve_stamps_time_and_status() {
        let (db, _dir) = test_db().await;
        let user_id = seeded_user(&db).await;
        let project_id = seeded_project(&db, user_id).await;

        let incident = Incident::create(
            &db,
            project_id,
            user_id,
            &CreateIncident {
                title: "DB latency spike".to_owned(),
                description: Some("p99 over 2s".to_owned()),
                priority: Some("Critical".to_owned()),
                asset_id: None,
                sla_id: None,
                reported_by: Some("oncall".to_owned()),
                assigned_to: None,
            },
        )
        .await
        .unwrap()
        .expect("owned");
        assert_eq!(incident.status, "Open");
        assert!(incident.resolved_at.is_none());

        let resolved = Incident::resolve(&db, incident.id, user_id, "Rebuilt index")
            .await
            .unwrap()
            .expect("visible");
        assert_eq!(resolved.status, "Resolved");
        assert_eq!(resolved.resolution.as_deref(), Some("Rebuilt index"));
        assert!(resolved.resolved_at.is_some());
    }
}
