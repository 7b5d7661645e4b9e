//! Account records. `password_hash` never serializes to clients.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::{Database, DbError, Row, params};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: Option<NaiveDateTime>,
}

impl User {
    pub fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(User {
            id: row.i64("id")?,
            name: row.string("name")?,
            email: row.string("email")?,
            role: row.str_opt("role").unwrap_or_else(|| "Viewer".to_owned()),
            password_hash: row.string("password_hash")?,
            created_at: row.datetime_opt("created_at"),
        })
    }

    pub async fn create(
        db: &Database,
        name: &str,
        email: &str,
        role: &str,
        password_hash: &str,
    ) -> Result<User, DbError> {
        let result = db
            .query(
                "INSERT INTO users (name, email, role, password_hash) VALUES (?, ?, ?, ?)",
                &params![name, email, role, password_hash],
            )
            .await?;
        let id = result.insert_id.ok_or(DbError::NoInsertId)?;
        Self::find_by_id(db, id).await?.ok_or(DbError::RowNotFound)
    }

    pub async fn find_by_id(db: &Database, id: i64) -> Result<Option<User>, DbError> {
        let rows = db
            .execute("SELECT * FROM users WHERE id = ?", &params![id])
            .await?;
        rows.first().map(Self::from_row).transpose()
    }

    pub async fn find_by_email(db: &Database, email: &str) -> Result<Option<User>, DbError> {
        let rows = db
            .execute("SELECT * FROM users WHERE email = ?", &params![email])
            .await?;
        rows.first().map(Self::from_row).transpose()
    }

    pub async fn email_exists(db: &Database, email: &str) -> Result<bool, DbError> {
        Ok(Self::find_by_email(db, email).await?.is_some())
    }
}
