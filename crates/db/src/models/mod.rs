//! Plain records over database rows.
//!
//! Models carry no behavior beyond field mapping and a few derived flags
//! computed at serialization time (warranty expiring, milestone overdue).
//! Every statement is written once in the canonical `?` placeholder style;
//! row ownership is enforced with a `user_id` predicate, directly on the
//! table or through a join on the owning project.

pub mod asset;
pub mod change;
pub mod incident;
pub mod issue;
pub mod milestone;
pub mod notification;
pub mod project;
pub mod report;
pub mod resource;
pub mod risk;
pub mod sla;
pub mod task;
pub mod user;

pub use asset::Asset;
pub use change::Change;
pub use incident::Incident;
pub use issue::Issue;
pub use milestone::Milestone;
pub use notification::Notification;
pub use project::Project;
pub use report::Report;
pub use resource::Resource;
pub use risk::Risk;
pub use sla::Sla;
pub use task::Task;
pub use user::User;

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared fixtures for model tests: a throwaway SQLite database with the
    //! schema bootstrapped and a seeded user/project pair.

    use tempfile::TempDir;

    use crate::backend::Backend;
    use crate::schema;
    use crate::Database;

    pub async fn test_db() -> (Database, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("test.db");
        let options = sqlx::sqlite::SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await
            .expect("sqlite pool");
        schema::ensure_schema(&pool).await.expect("schema");
        (Database::new(Backend::Sqlite(pool)), dir)
    }

    pub async fn seeded_user(db: &Database) -> i64 {
        let result = db
            .query(
                "INSERT INTO users (name, email, role, password_hash) VALUES (?, ?, ?, ?)",
                &crate::params!["Test User", "test@example.com", "Admin", "x"],
            )
            .await
            .expect("insert user");
        result.insert_id.expect("user id")
    }

    pub async fn seeded_project(db: &Database, user_id: i64) -> i64 {
        let result = db
            .query(
                "INSERT INTO projects (title, status, user_id) VALUES (?, ?, ?)",
                &crate::params!["Fixture Project", "Active", user_id],
            )
            .await
            .expect("insert project");
        result.insert_id.expect("project id")
    }
}
