//! Task records, scoped to a project.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::project::Project;
use crate::update::UpdateBuilder;
use crate::value::SqlValue;
use crate::{Database, DbError, Row, params};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub project_id: Option<i64>,
    pub title: String,
    pub owner: Option<String>,
    /// Completion percentage, 0..=100 enforced by a check constraint.
    pub progress: i64,
    pub due_date: Option<NaiveDate>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    pub title: String,
    pub owner: Option<String>,
    pub progress: Option<i64>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTask {
    pub title: Option<String>,
    pub owner: Option<String>,
    pub progress: Option<i64>,
    pub due_date: Option<NaiveDate>,
}

impl Task {
    pub fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Task {
            id: row.i64("id")?,
            project_id: row.i64_opt("project_id"),
            title: row.string("title")?,
            owner: row.str_opt("owner"),
            progress: row.i64_opt("progress").unwrap_or(0),
            due_date: row.date_opt("due_date"),
            created_at: row.datetime_opt("created_at"),
        })
    }

    pub async fn list_for_project(
        db: &Database,
        project_id: i64,
        user_id: i64,
    ) -> Result<Option<Vec<Task>>, DbError> {
        if !Project::is_owned_by(db, project_id, user_id).await? {
            return Ok(None);
        }
        let rows = db
            .execute(
                "SELECT * FROM tasks WHERE project_id = ? ORDER BY created_at DESC",
                &params![project_id],
            )
            .await?;
        rows.iter().map(Self::from_row).collect::<Result<_, _>>().map(Some)
    }

    pub async fn find_for_user(
        db: &Database,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Task>, DbError> {
        let rows = db
            .execute(
                "SELECT t.* FROM tasks t JOIN projects p ON p.id = t.project_id \
                 WHERE t.id = ? AND p.user_id = ?",
                &params![id, user_id],
            )
            .await?;
        rows.first().map(Self::from_row).transpose()
    }

    pub async fn create(
        db: &Database,
        project_id: i64,
        user_id: i64,
        data: &CreateTask,
    ) -> Result<Option<Task>, DbError> {
        if !Project::is_owned_by(db, project_id, user_id).await? {
            return Ok(None);
        }
        let result = db
            .query(
                "INSERT INTO tasks (project_id, title, owner, progress, due_date) \
                 VALUES (?, ?, ?, ?, ?)",
                &params![
                    project_id,
                    &data.title,
                    data.owner.as_deref(),
                    data.progress.unwrap_or(0),
                    data.due_date,
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
        data: &UpdateTask,
    ) -> Result<Option<Task>, DbError> {
        if Self::find_for_user(db, id, user_id).await?.is_none() {
            return Ok(None);
        }

        let built = UpdateBuilder::new("tasks")
            .set_opt("title", data.title.as_deref())
            .set_opt("owner", data.owner.as_deref())
            .set_opt("progress", data.progress)
            .set_opt("due_date", data.due_date)
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
        let result = db
            .query("DELETE FROM tasks WHERE id = ?", &params![id])
            .await?;
        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::{seeded_project, seeded_user, test_db};

    #[tokio::test]
    async fn crud_round_trip() {
        let (db, _dir) = test_db().await;
        let user_id = seeded_user(&db).await;
        let project_id = seeded_project(&db, user_id).await;

        let task = Task::create(
            &db,
            project_id,
            user_id,
            &CreateTask {
                title: "Wire up CI".to_owned(),
                owner: Some("sam".to_owned()),
                progress: None,
                due_date: NaiveDate::from_ymd_opt(2026, 9, 1),
            },
        )
        .await
        .unwrap()
        .expect("project owned");
        assert_eq!(task.progress, 0);
        assert_eq!(task.project_id, Some(project_id));

        let updated = Task::update(
            &db,
            task.id,
            user_id,
            &UpdateTask {
                progress: Some(60),
                ..UpdateTask::default()
            },
        )
        .await
        .unwrap()
        .expect("visible");
        assert_eq!(updated.progress, 60);
        assert_eq!(updated.title, "Wire up CI");

        let listed = Task::list_for_project(&db, project_id, user_id)
            .await
            .unwrap()
            .expect("owned");
        assert_eq!(listed.len(), 1);

        assert!(Task::delete(&db, task.id, user_id).await.unwrap());
        assert!(Task::find_for_user(&db, task.id, user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn foreign_project_is_not_accessible() {
        let (db, _dir) = test_db().await;
        let owner = seeded_user(&db).await;
        let project_id = seeded_project(&db, owner).await;
        let stranger = owner + 1000; // no such user, certainly not the owner

        assert!(
            Task::list_for_project(&db, project_id, stranger)
                .await
                .unwrap()
                .is_none()
        );
        let denied = Task::create(
            &db,
            project_id,
            stranger,
            &CreateTask {
                title: "sneaky".to_owned(),
                owner: None,
                progress: None,
                due_date: None,
            },
        )
        .await
        .unwrap();
        assert!(denied.is_none());
    }
}
