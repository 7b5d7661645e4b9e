use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::project::Project;
use crate::update::UpdateBuilder;
use crate::value::SqlValue;
use crate::{Database, DbError, Row, params};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: i64,
    pub project_id: Option<i64>,
    pub name: String,
    pub role: Option<String>,
    pub allocation_percent: i64,
    pub skills: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResource {
    pub name: String,
    pub role: Option<String>,
    pub allocation_percent: Option<i64>,
    pub skills: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResource {
    pub name: Option<String>,
    pub role: Option<String>,
    pub allocation_percent: Option<i64>,
    pub skills: Option<String>,
}

impl Resource {
    pub fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Resource {
            id: row.i64("id")?,
            project_id: row.i64_opt("project_id"),
            name: row.string("name")?,
            role: row.str_opt("role"),
            allocation_percent: row.i64_opt("allocation_percent").unwrap_or(100),
            skills: row.str_opt("skills"),
            created_at: row.datetime_opt("created_at"),
        })
    }

    pub async fn list_for_project(
        db: &Database,
        project_id: i64,
        user_id: i64,
    ) -> Result<Option<Vec<Resource>>, DbError> {
        if !Project::is_owned_by(db, project_id, user_id).await? {
            return Ok(None);
        }
        let rows = db
            .execute(
                "SELECT * FROM resources WHERE project_id = ? ORDER BY name ASC",
                &params![project_id],
            )
            .await?;
        rows.iter().map(Self::from_row).collect::<Result<_, _>>().map(Some)
    }

    pub async fn find_for_user(
        db: &Database,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Resource>, DbError> {
        let rows = db
            .execute(
                "SELECT r.* FROM resources r JOIN projects p ON p.id = r.project_id \
                 WHERE r.id = ? AND p.user_id = ?",
                &params![id, user_id],
            )
            .await?;
        rows.first().map(Self::from_row).transpose()
    }

    pub async fn create(
        db: &Database,
        project_id: i64,
        user_id: i64,
        data: &CreateResource,
    ) -> Result<Option<Resource>, DbError> {
        if !Project::is_owned_by(db, project_id, user_id).await? {
            return Ok(None);
        }
        let result = db
            .query(
                "INSERT INTO resources (project_id, name, role, allocation_percent, skills) \
                 VALUES (?, ?, ?, ?, ?)",
                &params![
                    project_id,
                    &data.name,
                    data.role.as_deref(),
                    data.allocation_percent.unwrap_or(100),
                    data.skills.as_deref(),
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
        data: &UpdateResource,
    ) -> Result<Option<Resource>, DbError> {
        if Self::find_for_user(db, id, user_id).await?.is_none() {
            return Ok(None);
        }

        let built = UpdateBuilder::new("resources")
            .set_opt("name", data.name.as_deref())
            .set_opt("role", data.role.as_deref())
            .set_opt("allocation_percent", data.allocation_percent)
            .set_opt("skills", data.skills.as_deref())
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
            .query("DELETE FROM resources WHERE id = ?", &params![id])
            .await?;
        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::{seeded_project, seeded_user, test_db};

    #[tokio::test]
    async fn allocation_defaults_to_full_time() {
        let (db, _dir) = test_db().await;
        let user_id = seeded_user(&db).await;
        let project_id = seeded_project(&db, user_id).await;

        let resource = Resource::create(
            &db,
            project_id,
            user_id,
            &CreateResource {
                name: "Dana".to_owned(),
                role: Some("Engineer".to_owned()),
                allocation_percent: None,
                skills: Some("rust,sql".to_owned()),
            },
        )
        .await
        .unwrap()
        .expect("owned");
        assert_eq!(resource.allocation_percent, 100);

        let halved = Resource::update(
            &db,
            resource.id,
            user_id,
            &UpdateResource {
                allocation_percent: Some(50),
                ..UpdateResource::default()
            },
        )
        .await
        .unwrap()
        .expect("visible");
        assert_eq!(halved.allocation_percent, 50);
    }
}
