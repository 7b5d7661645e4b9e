//! Tracked hardware/software assets with warranty-derived flags.

use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::project::Project;
use crate::update::UpdateBuilder;
use crate::value::SqlValue;
use crate::{Database, DbError, Row, params};

/// Window ahead of warranty expiry in which an asset is flagged.
const WARRANTY_WARNING_DAYS: u64 = 30;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: i64,
    pub project_id: Option<i64>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub owner: Option<String>,
    pub status: String,
    pub location: Option<String>,
    pub serial_number: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub warranty_expiry: Option<NaiveDate>,
    pub cost: Option<f64>,
    pub created_at: Option<NaiveDateTime>,
}

/// The record plus warranty flags computed against "today".
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetView {
    #[serde(flatten)]
    pub asset: Asset,
    pub warranty_expired: bool,
    pub warranty_expiring_soon: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAsset {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub owner: Option<String>,
    pub status: Option<String>,
    pub location: Option<String>,
    pub serial_number: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub warranty_expiry: Option<NaiveDate>,
    pub cost: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAsset {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub owner: Option<String>,
    pub status: Option<String>,
    pub location: Option<String>,
    pub serial_number: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub warranty_expiry: Option<NaiveDate>,
    pub cost: Option<f64>,
}

impl Asset {
    pub fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Asset {
            id: row.i64("id")?,
            project_id: row.i64_opt("project_id"),
            name: row.string("name")?,
            kind: row.str_opt("type").unwrap_or_else(|| "Other".to_owned()),
            owner: row.str_opt("owner"),
            status: row.str_opt("status").unwrap_or_else(|| "Active".to_owned()),
            location: row.str_opt("location"),
            serial_number: row.str_opt("serial_number"),
            purchase_date: row.date_opt("purchase_date"),
            warranty_expiry: row.date_opt("warranty_expiry"),
            cost: row.f64_opt("cost"),
            created_at: row.datetime_opt("created_at"),
        })
    }

    pub fn warranty_expired(&self, today: NaiveDate) -> bool {
        self.warranty_expiry.is_some_and(|expiry| expiry < today)
    }

    pub fn warranty_expiring_soon(&self, today: NaiveDate) -> bool {
        !self.warranty_expired(today)
            && self.warranty_expiry.is_some_and(|expiry| {
                expiry <= today + Days::new(WARRANTY_WARNING_DAYS)
            })
    }

    pub fn view(self, today: NaiveDate) -> AssetView {
        let warranty_expired = self.warranty_expired(today);
        let warranty_expiring_soon = self.warranty_expiring_soon(today);
        AssetView {
            asset: self,
            warranty_expired,
            warranty_expiring_soon,
        }
    }

    pub async fn list_for_project(
        db: &Database,
        project_id: i64,
        user_id: i64,
    ) -> Result<Option<Vec<Asset>>, DbError> {
        if !Project::is_owned_by(db, project_id, user_id).await? {
            return Ok(None);
        }
        let rows = db
            .execute(
                "SELECT * FROM assets WHERE project_id = ? ORDER BY created_at DESC",
                &params![project_id],
            )
            .await?;
        rows.iter().map(Self::from_row).collect::<Result<_, _>>().map(Some)
    }

    pub async fn find_for_user(db: &Database, id: i64, user_id: i64) -> Result<Option<Asset>, DbError> {
        let rows = db
            .execute(
                "SELECT a.* FROM assets a JOIN projects p ON p.id = a.project_id \
                 WHERE a.id = ? AND p.user_id = ?",
                &params![id, user_id],
            )
            .await?;
        rows.first().map(Self::from_row).transpose()
    }

    pub async fn create(
        db: &Database,
        project_id: i64,
        user_id: i64,
        data: &CreateAsset,
    ) -> Result<Option<Asset>, DbError> {
        if !Project::is_owned_by(db, project_id, user_id).await? {
            return Ok(None);
        }
        let result = db
            .query(
                "INSERT INTO assets (project_id, name, type, owner, status, location, \
                 serial_number, purchase_date, warranty_expiry, cost) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                &params![
                    project_id,
                    &data.name,
                    data.kind.as_deref().unwrap_or("Other"),
                    data.owner.as_deref(),
                    data.status.as_deref().unwrap_or("Active"),
                    data.location.as_deref(),
                    data.serial_number.as_deref(),
                    data.purchase_date,
                    data.warranty_expiry,
                    data.cost,
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
        data: &UpdateAsset,
    ) -> Result<Option<Asset>, DbError> {
        if Self::find_for_user(db, id, user_id).await?.is_none() {
            return Ok(None);
        }

        let built = UpdateBuilder::new("assets")
            .set_opt("name", data.name.as_deref())
            .set_opt("type", data.kind.as_deref())
            .set_opt("owner", data.owner.as_deref())
            .set_opt("status", data.status.as_deref())
            .set_opt("location", data.location.as_deref())
            .set_opt("serial_number", data.serial_number.as_deref())
            .set_opt("purchase_date", data.purchase_date)
            .set_opt("warranty_expiry", data.warranty_expiry)
            .set_opt("cost", data.cost)
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
        let result = db.query("DELETE FROM assets WHERE id = ?", &params![id]).await?;
        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::{seeded_project, seeded_user, test_db};

    fn asset(expiry: Option<NaiveDate>) -> Asset {
        Asset {
            id: 1,
            project_id: Some(1),
            name: "laptop".to_owned(),
            kind: "Hardware".to_owned(),
            owner: None,
            status: "Active".to_owned(),
            location: None,
            serial_number: None,
            purchase_date: None,
            warranty_expiry: expiry,
            cost: Some(1200.0),
            created_at: None,
        }
    }

    #[test]
    fn warranty_windows() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();
        let last_week = NaiveDate::from_ymd_opt(2026, 6, 8).unwrap();
        let in_two_weeks = NaiveDate::from_ymd_opt(2026, 6, 29).unwrap();
        let next_quarter = NaiveDate::from_ymd_opt(2026, 9, 30).unwrap();

        assert!(asset(Some(last_week)).warranty_expired(today));
        assert!(!asset(Some(last_week)).warranty_expiring_soon(today));

        assert!(!asset(Some(in_two_weeks)).warranty_expired(today));
        assert!(asset(Some(in_two_weeks)).warranty_expiring_soon(today));

        assert!(!asset(Some(next_quarter)).warranty_expiring_soon(today));
        assert!(!asset(None).warranty_expired(today));
    }

    #[tokio::test]
    async fn crud_with_dates_and_cost() {
        let (db, _dir) = test_db().await;
        let user_id = seeded_user(&db).await;
        let project_id = seeded_project(&db, user_id).await;

        let created = Asset::create(
            &db,
            project_id,
            user_id,
            &CreateAsset {
                name: "Build server".to_owned(),
                kind: Some("Hardware".to_owned()),
                owner: Some("Infra".to_owned()),
                status: None,
                location: Some("Rack 4".to_owned()),
                serial_number: Some("BS-0042".to_owned()),
                purchase_date: NaiveDate::from_ymd_opt(2025, 1, 10),
                warranty_expiry: NaiveDate::from_ymd_opt(2028, 1, 10),
                cost: Some(5400.50),
            },
        )
        .await
        .unwrap()
        .expect("owned");
        assert_eq!(created.status, "Active");
        assert_eq!(created.cost, Some(5400.50));
        assert_eq!(created.warranty_expiry, NaiveDate::from_ymd_opt(2028, 1, 10));

        let moved = Asset::update(
            &db,
            created.id,
            user_id,
            &UpdateAsset {
                location: Some("Rack 7".to_owned()),
                ..UpdateAsset::default()
            },
        )
        .await
        .unwrap()
        .expect("visible");
        assert_eq!(moved.location.as_deref(), Some("Rack 7"));

        assert!(Asset::delete(&db, created.id, user_id).await.unwrap());
        assert!(Asset::find_for_user(&db, created.id, user_id).await.unwrap().is_none());
    }
}
