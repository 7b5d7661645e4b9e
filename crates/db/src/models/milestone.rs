//! Milestone records with schedule-derived flags.

use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::project::Project;
use crate::update::UpdateBuilder;
use crate::value::SqlValue;
use crate::{Database, DbError, Row, params};

/// Window ahead of the target date in which a milestone counts as due soon.
const DUE_SOON_DAYS: u64 = 7;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: i64,
    pub project_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub status: String,
    pub created_at: Option<NaiveDateTime>,
}

/// Client-facing view: the record plus flags computed against "today".
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneView {
    #[serde(flatten)]
    pub milestone: Milestone,
    pub is_overdue: bool,
    pub is_due_soon: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMilestone {
    pub title: String,
    pub description: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMilestone {
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub status: Option<String>,
}

impl Milestone {
    pub fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Milestone {
            id: row.i64("id")?,
            project_id: row.i64_opt("project_id"),
            title: row.string("title")?,
            description: row.str_opt("description"),
            target_date: row.date_opt("target_date"),
            status: row.str_opt("status").unwrap_or_else(|| "Pending".to_owned()),
            created_at: row.datetime_opt("created_at"),
        })
    }

    /// Past its target date and not completed.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != "Completed"
            && self.target_date.is_some_and(|target| target < today)
    }

    /// Inside the due-soon window, not yet overdue, not completed.
    pub fn is_due_soon(&self, today: NaiveDate) -> bool {
        if self.status == "Completed" || self.is_overdue(today) {
            return false;
        }
        self.target_date.is_some_and(|target| {
            target <= today + Days::new(DUE_SOON_DAYS)
        })
    }

    pub fn view(self, today: NaiveDate) -> MilestoneView {
        let is_overdue = self.is_overdue(today);
        let is_due_soon = self.is_due_soon(today);
        MilestoneView {
            milestone: self,
            is_overdue,
            is_due_soon,
        }
    }

    pub async fn list_for_project(
        db: &Database,
        project_id: i64,
        user_id: i64,
    ) -> Result<Option<Vec<Milestone>>, DbError> {
        if !Project::is_owned_by(db, project_id, user_id).await? {
            return Ok(None);
        }
        let rows = db
            .execute(
                "SELECT * FROM milestones WHERE project_id = ? ORDER BY target_date ASC",
                &params![project_id],
            )
            .await?;
        rows.iter().map(Self::from_row).collect::<Result<_, _>>().map(Some)
    }

    pub async fn find_for_user(
        db: &Database,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Milestone>, DbError> {
        let rows = db
            .execute(
                "SELECT m.* FROM milestones m JOIN projects p ON p.id = m.project_id \
                 WHERE m.id = ? AND p.user_id = ?",
                &params![id, user_id],
            )
            .await?;
        rows.first().map(Self::from_row).transpose()
    }

    pub async fn create(
        db: &Database,
        project_id: i64,
        user_id: i64,
        data: &CreateMilestone,
    ) -> Result<Option<Milestone>, DbError> {
        if !Project::is_owned_by(db, project_id, user_id).await? {
            return Ok(None);
        }
        let result = db
            .query(
                "INSERT INTO milestones (project_id, title, description, target_date, status) \
                 VALUES (?, ?, ?, ?, ?)",
                &params![
                    project_id,
                    &data.title,
                    data.description.as_deref(),
                    data.target_date,
                    data.status.as_deref().unwrap_or("Pending"),
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
        data: &UpdateMilestone,
    ) -> Result<Option<Milestone>, DbError> {
        if Self::find_for_user(db, id, user_id).await?.is_none() {
            return Ok(None);
        }

        let built = UpdateBuilder::new("milestones")
            .set_opt("title", data.title.as_deref())
            .set_opt("description", data.description.as_deref())
            .set_opt("target_date", data.target_date)
            .set_opt("status", data.status.as_deref())
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
            .query("DELETE FROM milestones WHERE id = ?", &params![id])
            .await?;
        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn milestone(target: Option<NaiveDate>, status: &str) -> Milestone {
        Milestone {
            id: 1,
            project_id: Some(1),
            title: "beta".to_owned(),
            description: None,
            target_date: target,
            status: status.to_owned(),
            created_at: None,
        }
    }

    #[test]
    fn overdue_and_due_soon_windows() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2026, 6, 14).unwrap();
        let in_three_days = NaiveDate::from_ymd_opt(2026, 6, 18).unwrap();
        let next_month = NaiveDate::from_ymd_opt(2026, 7, 20).unwrap();

        assert!(milestone(Some(yesterday), "Pending").is_overdue(today));
        assert!(!milestone(Some(yesterday), "Pending").is_due_soon(today));

        assert!(!milestone(Some(in_three_days), "Pending").is_overdue(today));
        assert!(milestone(Some(in_three_days), "Pending").is_due_soon(today));

        assert!(!milestone(Some(next_month), "Pending").is_due_soon(today));
        assert!(!milestone(None, "Pending").is_overdue(today));
    }

    #[test]
    fn completed_milestones_never_flag() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2026, 6, 14).unwrap();
        let done = milestone(Some(yesterday), "Completed");
        assert!(!done.is_overdue(today));
        assert!(!done.is_due_soon(today));
    }

    #[test]
    fn view_flattens_record_and_flags() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();
        let view = milestone(NaiveDate::from_ymd_opt(2026, 6, 14), "Pending").view(today);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["title"], "beta");
        assert_eq!(json["isOverdue"], true);
        assert_eq!(json["isDueSoon"], false);
    }
}
