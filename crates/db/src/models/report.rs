use chrono::NaiveDateTime;
use serde::Serialize;

use crate::models::project::Project;
use crate::{Database, DbError, Row, params};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: i64,
    pub project_id: Option<i64>,
    pub summary: String,
    pub created_at: Option<NaiveDateTime>,
}

impl Report {
    pub fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Report {
            id: row.i64("id")?,
            project_id: row.i64_opt("project_id"),
            summary: row.string("summary")?,
            created_at: row.datetime_opt("created_at"),
        })
    }

    pub async fn list_for_project(
        db: &Database,
        project_id: i64,
        user_id: i64,
    ) -> Result<Option<Vec<Report>>, DbError> {
        if !Project::is_owned_by(db, project_id, user_id).await? {
            return Ok(None);
        }
        let rows = db
            .execute(
                "SELECT * FROM reports WHERE project_id = ? ORDER BY created_at DESC",
                &params![project_id],
            )
            .await?;
        rows.iter().map(Self::from_row).collect::<Result<_, _>>().map(Some)
    }

    pub async fn create(
        db: &Database,
        project_id: i64,
        user_id: i64,
        summary: &str,
    ) -> Result<Option<Report>, DbError> {
        if !Project::is_owned_by(db, project_id, user_id).await? {
            return Ok(None);
        }
        let result = db
            .query(
                "INSERT INTO reports (project_id, summary) VALUES (?, ?)",
                &params![project_id, summary],
            )
            .await?;
        let id = result.insert_id.ok_or(DbError::NoInsertId)?;
        let rows = db
            .execute("SELECT * FROM reports WHERE id = ?", &params![id])
            .await?;
        rows.first().map(Self::from_row).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::{seeded_project, seeded_user, test_db};

    #[tokio::test]
    async fn insert_then_list() {
        let (db, _dir) = test_db().await;
        let user_id = seeded_user(&db).await;
        let project_id = seeded_project(&db, user_id).await;

        let report = Report::create(&db, project_id, user_id, "All green this week")
            .await
            .unwrap()
            .expect("owned");
        assert_eq!(report.summary, "All green this week");

        let listed = Report::list_for_project(&db, project_id, user_id)
            .await
            .unwrap()
            .expect("owned");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, report.id);
    }
}
