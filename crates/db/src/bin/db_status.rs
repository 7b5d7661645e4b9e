//! Reports which backend the current environment resolves to.
//!
//! Runs the same selection path the application uses: probe the primary
//! unless `USE_SQLITE` is set, fall back to the file-backed engine, then
//! ping whatever was chosen and print the verdict.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use db::{BackendKind, ConnectionManager};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let manager = ConnectionManager::from_env();
    info!(params = %manager.config().redacted(), "checking database status");

    let verdict = report(&manager).await?;
    println!("{verdict}");
    Ok(())
}

/// Run selection, ping the chosen backend and render a one-line verdict.
async fn report(manager: &ConnectionManager) -> Result<String> {
    let database = manager.get().await?;
    database.ping().await?;

    let verdict = match database.backend_kind() {
        BackendKind::MySql => {
            format!("primary (mysql) — {}", manager.config().redacted())
        }
        BackendKind::Sqlite => {
            format!(
                "fallback (sqlite) — {}",
                manager.config().sqlite_path.display()
            )
        }
    };

    database.close().await;
    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use db::DbConfig;

    use super::*;

    fn config(use_sqlite: bool, port: u16, path: &Path) -> DbConfig {
        DbConfig {
            use_sqlite,
            host: "127.0.0.1".to_owned(),
            port,
            database: "paxipm".to_owned(),
            user: "root".to_owned(),
            password: String::new(),
            connect_timeout: Duration::from_millis(500),
            sqlite_path: path.to_path_buf(),
        }
    }

    #[tokio::test]
    async fn forced_fallback_reports_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let manager =
            ConnectionManager::new(config(true, 3306, &dir.path().join("pm.db")));
        let verdict = report(&manager).await.unwrap();
        assert!(verdict.starts_with("fallback (sqlite)"));
        assert!(verdict.contains("pm.db"));
    }

    #[tokio::test]
    async fn unreachable_primary_reports_the_fallback() {
        let dir = tempfile::tempdir().unwrap();
        // Port 1 refuses, selection degrades to sqlite, report still succeeds.
        let manager = ConnectionManager::new(config(false, 1, &dir.path().join("pm.db")));
        let verdict = report(&manager).await.unwrap();
        assert!(verdict.starts_with("fallback (sqlite)"));
    }
}
