//! Schema bootstrap for the SQLite fallback.
//!
//! The primary engine's schema is provisioned externally and never touched
//! here. When selection lands on the fallback, this runs a fixed, ordered
//! sequence of idempotent DDL so the application finds every table it needs
//! on a fresh file. Safe to call repeatedly; "already exists" class errors
//! are swallowed, anything else is fatal.

use sqlx::SqlitePool;

use crate::error::DbError;

// Parent tables first: children declare cascading foreign keys.
const CREATE_TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name VARCHAR(255) NOT NULL,
        email VARCHAR(255) UNIQUE NOT NULL,
        role VARCHAR(50) NOT NULL DEFAULT 'Viewer',
        password_hash VARCHAR(255) NOT NULL,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS projects (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title VARCHAR(255) NOT NULL,
        description TEXT,
        client VARCHAR(255),
        start_date DATE,
        end_date DATE,
        status VARCHAR(50) DEFAULT 'Active',
        risk_score INTEGER CHECK (risk_score >= 0 AND risk_score <= 100),
        budgeted_amount DECIMAL(15, 2) DEFAULT 0.00,
        spent_amount DECIMAL(15, 2) DEFAULT 0.00,
        currency_code VARCHAR(3) DEFAULT 'USD',
        user_id INTEGER,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER,
        title VARCHAR(255) NOT NULL,
        owner VARCHAR(255),
        progress INTEGER DEFAULT 0 CHECK (progress >= 0 AND progress <= 100),
        due_date DATE,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS reports (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER,
        summary TEXT NOT NULL,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS milestones (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER,
        title VARCHAR(255) NOT NULL,
        description TEXT,
        target_date DATE,
        status VARCHAR(50) DEFAULT 'Pending',
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS risks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER,
        title VARCHAR(255) NOT NULL,
        description TEXT,
        probability VARCHAR(50) DEFAULT 'Medium',
        impact VARCHAR(50) DEFAULT 'Medium',
        status VARCHAR(50) DEFAULT 'Open',
        mitigation TEXT,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS issues (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER,
        title VARCHAR(255) NOT NULL,
        description TEXT,
        priority VARCHAR(50) DEFAULT 'Medium',
        status VARCHAR(50) DEFAULT 'Open',
        resolution TEXT,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS files (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER,
        filename VARCHAR(255) NOT NULL,
        file_path VARCHAR(500) NOT NULL,
        file_size INTEGER,
        mime_type VARCHAR(100),
        uploaded_by INTEGER,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE,
        FOREIGN KEY (uploaded_by) REFERENCES users(id) ON DELETE SET NULL
    )",
    "CREATE TABLE IF NOT EXISTS notifications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER,
        project_id INTEGER,
        title VARCHAR(255) NOT NULL,
        message TEXT NOT NULL,
        type VARCHAR(50) DEFAULT 'info',
        read_status INTEGER DEFAULT 0,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
        FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS resources (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER,
        name VARCHAR(255) NOT NULL,
        role VARCHAR(255),
        allocation_percent INTEGER DEFAULT 100,
        skills TEXT,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS assets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER,
        name VARCHAR(255) NOT NULL,
        type VARCHAR(50) DEFAULT 'Other',
        owner VARCHAR(255),
        status VARCHAR(50) DEFAULT 'Active',
        location VARCHAR(255),
        serial_number VARCHAR(255),
        purchase_date DATE,
        warranty_expiry DATE,
        cost DECIMAL(15, 2),
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS slas (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER,
        name VARCHAR(255) NOT NULL,
        service_description TEXT,
        target_uptime DECIMAL(5,2) DEFAULT 99.90,
        response_time_target INTEGER DEFAULT 60,
        resolution_time_target INTEGER DEFAULT 240,
        penalty_clause TEXT,
        ai_risk_score DECIMAL(5,2) DEFAULT 0.00,
        status VARCHAR(50) DEFAULT 'Active',
        start_date DATE,
        end_date DATE,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS incidents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER,
        asset_id INTEGER,
        title VARCHAR(255) NOT NULL,
        description TEXT,
        priority VARCHAR(50) DEFAULT 'Medium',
        status VARCHAR(50) DEFAULT 'Open',
        reported_by VARCHAR(255),
        assigned_to VARCHAR(255),
        sla_id INTEGER,
        resolution TEXT,
        resolved_at TIMESTAMP NULL,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE,
        FOREIGN KEY (asset_id) REFERENCES assets(id) ON DELETE SET NULL,
        FOREIGN KEY (sla_id) REFERENCES slas(id) ON DELETE SET NULL
    )",
    "CREATE TABLE IF NOT EXISTS changes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER,
        title VARCHAR(255) NOT NULL,
        description TEXT,
        change_type VARCHAR(50) DEFAULT 'Normal',
        status VARCHAR(50) DEFAULT 'Requested',
        requested_by VARCHAR(255),
        approved_by VARCHAR(255),
        implemented_by VARCHAR(255),
        implementation_date DATE,
        rollback_plan TEXT,
        risk_assessment TEXT,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
    )",
];

// One covering index per foreign key, plus the notification read filter.
const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_projects_user_id ON projects(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_project_id ON tasks(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_reports_project_id ON reports(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_milestones_project_id ON milestones(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_risks_project_id ON risks(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_issues_project_id ON issues(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_files_project_id ON files(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_notifications_user_id ON notifications(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_notifications_read_status ON notifications(read_status)",
    "CREATE INDEX IF NOT EXISTS idx_resources_project_id ON resources(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_assets_project_id ON assets(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_slas_project_id ON slas(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_incidents_project_id ON incidents(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_changes_project_id ON changes(project_id)",
];

/// Create every table and index the application expects, in order.
/// Idempotent: a second call on the same file changes nothing.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), DbError> {
    for statement in CREATE_TABLES.iter().chain(CREATE_INDEXES.iter()) {
        if let Err(err) = sqlx::query(statement).execute(pool).await {
            if is_already_exists(&err) {
                tracing::debug!(statement = statement_head(statement), "object already exists");
                continue;
            }
            return Err(DbError::Schema(err));
        }
    }
    tracing::info!(
        tables = CREATE_TABLES.len(),
        indexes = CREATE_INDEXES.len(),
        "sqlite schema ready"
    );
    Ok(())
}

fn is_already_exists(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            let message = db.message();
            message.contains("already exists") || message.contains("duplicate")
        }
        _ => false,
    }
}

fn statement_head(statement: &str) -> &str {
    statement.split('(').next().unwrap_or(statement).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_precede_their_foreign_keys() {
        let order: Vec<&str> = CREATE_TABLES
            .iter()
            .map(|s| {
                s.trim_start()
                    .strip_prefix("CREATE TABLE IF NOT EXISTS ")
                    .unwrap()
                    .split_whitespace()
                    .next()
                    .unwrap()
            })
            .collect();
        let position =
            |name: &str| order.iter().position(|t| *t == name).expect("table missing");
        assert!(position("users") < position("projects"));
        assert!(position("projects") < position("tasks"));
        assert!(position("assets") < position("incidents"));
        assert!(position("slas") < position("incidents"));
    }

    #[test]
    fn every_index_targets_a_created_table() {
        for index in CREATE_INDEXES {
            let target = index
                .rsplit(" ON ")
                .next()
                .unwrap()
                .split('(')
                .next()
                .unwrap();
            assert!(
                CREATE_TABLES
                    .iter()
                    .any(|t| t.contains(&format!("EXISTS {target} "))
                        || t.contains(&format!("EXISTS {target}\n"))),
                "index {index} targets unknown table {target}"
            );
        }
    }
}
