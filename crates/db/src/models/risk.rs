use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::project::Project;
use crate::update::UpdateBuilder;
use crate::value::SqlValue;
use crate::{Database, DbError, Row, params};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Risk {
    pub id: i64,
    pub project_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub probability: String,
    pub impact: String,
    pub status: String,
    pub mitigation: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRisk {
    pub title: String,
    pub description: Option<String>,
    pub probability: Option<String>,
    pub impact: Option<String>,
    pub mitigation: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRisk {
    pub title: Option<String>,
    pub description: Option<String>,
    pub probability: Option<String>,
    pub impact: Option<String>,
    pub status: Option<String>,
    pub mitigation: Option<String>,
}

impl Risk {
    pub fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Risk {
            id: row.i64("id")?,
            project_id: row.i64_opt("project_id"),
            title: row.string("title")?,
            description: row.str_opt("description"),
            probability: row.str_opt("probability").unwrap_or_else(|| "Medium".to_owned()),
            impact: row.str_opt("impact").unwrap_or_else(|| "Medium".to_owned()),
            status: row.str_opt("status").unwrap_or_else(|| "Open".to_owned()),
            mitigation: row.str_opt("mitigation"),
            created_at: row.datetime_opt("created_at"),
        })
    }

    pub async fn list_for_project(
        db: &Database,
        project_id: i64,
        user_id: i64,
    ) -> Result<Option<Vec<Risk>>, DbError> {
        if !Project::is_owned_by(db, project_id, user_id).await? {
            return Ok(None);
        }
        let rows = db
            .execute(
                "SELECT * FROM risks WHERE project_id = ? ORDER BY created_at DESC",
                &params![project_id],
            )
            .await?;
        rows.iter().map(Self::from_row).collect::<Result<_, _>>().map(Some)
    }

    pub async fn find_for_user(db: &Database, id: i64, user_id: i64) -> Result<Option<Risk>, DbError> {
        let rows = db
            .execute(
                "SELECT r.* FROM risks r JOIN projects p ON p.id = r.project_id \
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
        data: &CreateRisk,
    ) -> Result<Option<Risk>, DbError> {
        if !Project::is_owned_by(db, project_id, user_id).await? {
            return Ok(None);
        }
        let result = db
            .query(
                "INSERT INTO risks (project_id, title, description, probability, impact, mitigation) \
                 VALUES (?, ?, ?, ?, ?, ?)",
                &params![
                    project_id,
                    &data.title,
                    data.description.as_deref(),
                    data.probability.as_deref().unwrap_or("Medium"),
                    data.impact.as_deref().unwrap_or("Medium"),
                    data.mitigation.as_deref(),
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
        data: &UpdateRisk,
    ) -> Result<Option<Risk>, DbError> {
        if Self::find_for_user(db, id, user_id).await?.is_none() {
            return Ok(None);
        }

        let built = UpdateBuilder::new("risks")
            .set_opt("title", data.title.as_deref())
            .set_opt("description", data.description.as_deref())
            .set_opt("probability", data.probability.as_deref())
            .set_opt("impact", data.impact.as_deref())
            .set_opt("status", data.status.as_deref())
            .set_opt("mitigation", data.mitigation.as_deref())
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
        let result = db.query("DELETE FROM risks WHERE id = ?", &params![id]).await?;
        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::{seeded_project, seeded_user, test_db};

    #[tokio::test]
    async fn defaults_apply_on_create() {
        let (db, _dir) = test_db().await;
        let user_id = seeded_user(&db).await;
        let project_id = seeded_project(&db, user_id).await;

        let risk = Risk::create(
            &db,
            project_id,
            user_id,
            &CreateRisk {
                title: "Vendor slip".to_owned(),
                description: None,
                probability: None,
                impact: Some("High".to_owned()),
                mitigation: None,
            },
        )
        .await
        .unwrap()
        .expect("owned");

        assert_eq!(risk.probability, "Medium");
        assert_eq!(risk.impact, "High");
        assert_eq!(risk.status, "Open");

        let mitigated = Risk::update(
            &db,
            risk.id,
            user_id,
            &UpdateRisk {
                status: Some("Mitigated".to_owned()),
                mitigation: Some("Second vendor on retainer".to_owned()),
                ..UpdateRisk::default()
            },
        )
        .await
        .unwrap()
        .expect("visible");
        assert_eq!(mitigated.status, "Mitigated");
    }
}
