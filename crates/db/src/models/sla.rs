use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::project::Project;
use crate::update::UpdateBuilder;
use crate::value::SqlValue;
use crate::{Database, DbError, Row, params};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sla {
    pub id: i64,
    pub project_id: Option<i64>,
    pub name: String,
    pub service_description: Option<String>,
    pub target_uptime: f64,
    pub response_time_target: i64,
    pub resolution_time_target: i64,
    pub penalty_clause: Option<String>,
    pub ai_risk_score: f64,
    pub status: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSla {
    pub name: String,
    pub service_description: Option<String>,
    pub target_uptime: Option<f64>,
    pub response_time_target: Option<i64>,
    pub resolution_time_target: Option<i64>,
    pub penalty_clause: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSla {
    pub name: Option<String>,
    pub service_description: Option<String>,
    pub target_uptime: Option<f64>,
    pub response_time_target: Option<i64>,
    pub resolution_time_target: Option<i64>,
    pub penalty_clause: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Sla {
    /// The agreement's coverage window has ended but nobody retired it.
    pub fn coverage_lapsed(&self, today: NaiveDate) -> bool {
        self.status == "Active" && self.end_date.is_some_and(|end| end < today)
    }

    pub fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Sla {
            id: row.i64("id")?,
            project_id: row.i64_opt("project_id"),
            name: row.string("name")?,
            service_description: row.str_opt("service_description"),
            target_uptime: row.f64_opt("target_uptime").unwrap_or(99.90),
            response_time_target: row.i64_opt("response_time_target").unwrap_or(60),
            resolution_time_target: row.i64_opt("resolution_time_target").unwrap_or(240),
            penalty_clause: row.str_opt("penalty_clause"),
            ai_risk_score: row.f64_opt("ai_risk_score").unwrap_or(0.0),
            status: row.str_opt("status").unwrap_or_else(|| "Active".to_owned()),
            start_date: row.date_opt("start_date"),
            end_date: row.date_opt("end_date"),
            created_at: row.datetime_opt("created_at"),
        })
    }

    pub async fn list_for_project(
        db: &Database,
        project_id: i64,
        user_id: i64,
    ) -> Result<Option<Vec<Sla>>, DbError> {
        if !Project::is_owned_by(db, project_id, user_id).await? {
            return Ok(None);
        }
        let rows = db
            .execute(
                "SELECT * FROM slas WHERE project_id = ? ORDER BY created_at DESC",
                &params![project_id],
            )
            .await?;
        rows.iter().map(Self::from_row).collect::<Result<_, _>>().map(Some)
    }

    pub async fn find_for_user(db: &Database, id: i64, user_id: i64) -> Result<Option<Sla>, DbError> {
        let rows = db
            .execute(
                "SELECT s.* FROM slas s JOIN projects p ON p.id = s.project_id \
                 WHERE s.id = ? AND p.user_id = ?",
                &params![id, user_id],
            )
            .await?;
        rows.first().map(Self::from_row).transpose()
    }

    pub async fn create(
        db: &Database,
        project_id: i64,
        user_id: i64,
        data: &CreateSla,
    ) -> Result<Option<Sla>, DbError> {
        if !Project::is_owned_by(db, project_id, user_id).await? {
            return Ok(None);
        }
        let result = db
            .query(
                "INSERT INTO slas (project_id, name, service_description, target_uptime, \
                 response_time_target, resolution_time_target, penalty_clause, start_date, end_date) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                &params![
                    project_id,
                    &data.name,
                    data.service_description.as_deref(),
                    data.target_uptime.unwrap_or(99.90),
                    data.response_time_target.unwrap_or(60),
                    data.resolution_time_target.unwrap_or(240),
                    data.penalty_clause.as_deref(),
                    data.start_date,
                    data.end_date,
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
        data: &UpdateSla,
    ) -> Result<Option<Sla>, DbError> {
        if Self::find_for_user(db, id, user_id).await?.is_none() {
            return Ok(None);
        }

        let built = UpdateBuilder::new("slas")
            .set_opt("name", data.name.as_deref())
            .set_opt("service_description", data.service_description.as_deref())
            .set_opt("target_uptime", data.target_uptime)
            .set_opt("response_time_target", data.response_time_target)
            .set_opt("resolution_time_target", data.resolution_time_target)
            .set_opt("penalty_clause", data.penalty_clause.as_deref())
            .set_opt("status", data.status.as_deref())
            .set_opt("start_date", data.start_date)
            .set_opt("end_date", data.end_date)
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
        let result = db.query("DELETE FROM slas WHERE id = ?", &params![id]).await?;
        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::{seeded_project, seeded_user, test_db};

    #[tokio::test]
    async fn numeric_targets_survive_round_trip() {
        let (db, _dir) = test_db().await;
        let user_id = seeded_user(&db).await;
        let project_id = seeded_project(&db, user_id).await;

        let sla = Sla::create(
            &db,
            project_id,
            user_id,
            &CreateSla {
                name: "API availability".to_owned(),
                service_description: Some("Public REST API".to_owned()),
                target_uptime: Some(99.95),
                response_time_target: Some(15),
                resolution_time_target: None,
                penalty_clause: None,
                start_date: NaiveDate::from_ymd_opt(2026, 1, 1),
                end_date: None,
            },
        )
        .await
        .unwrap()
        .expect("owned");

        assert_eq!(sla.target_uptime, 99.95);
        assert_eq!(sla.response_time_target, 15);
        assert_eq!(sla.resolution_time_target, 240);
        assert_eq!(sla.ai_risk_score, 0.0);
        assert_eq!(sla.status, "Active");
    }

    #[test]
    fn lapse_requires_active_status_and_past_end() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();
        let mut sla = Sla {
            id: 1,
            project_id: Some(1),
            name: "uptime".to_owned(),
            service_description: None,
            target_uptime: 99.9,
            response_time_target: 60,
            resolution_time_target: 240,
            penalty_clause: None,
            ai_risk_score: 0.0,
            status: "Active".to_owned(),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 1),
            created_at: None,
        };
        assert!(sla.coverage_lapsed(today));

        sla.status = "Expired".to_owned();
        assert!(!sla.coverage_lapsed(today));

        sla.status = "Active".to_owned();
        sla.end_date = None;
        assert!(!sla.coverage_lapsed(today));
    }
}
