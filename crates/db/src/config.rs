//! Backend selection settings, read from the environment.
//!
//! Keys match the original deployment's `.env` vocabulary: `DB_HOST`,
//! `DB_PORT`, `DB_NAME`, `DB_USER`, `DB_PASSWORD`, `USE_SQLITE`, plus
//! `DB_CONNECT_TIMEOUT_MS` and `DB_SQLITE_PATH` for the two knobs this
//! layer owns.

use std::path::PathBuf;
use std::time::Duration;

/// Default primary probe timeout. Short on purpose: an unreachable primary
/// should degrade to the fallback within seconds, not stall startup.
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Force the SQLite fallback; no primary probe is attempted.
    pub use_sqlite: bool,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    /// Bounds the whole primary probe (pool construction + liveness query).
    pub connect_timeout: Duration,
    /// File backing the fallback engine.
    pub sqlite_path: PathBuf,
}

impl DbConfig {
    pub fn from_env() -> Self {
        DbConfig {
            use_sqlite: env_flag("USE_SQLITE"),
            host: var_or("DB_HOST", "localhost"),
            port: std::env::var("DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3306),
            database: var_or("DB_NAME", "paxipm"),
            user: var_or("DB_USER", "root"),
            password: var_or("DB_PASSWORD", ""),
            connect_timeout: Duration::from_millis(
                std::env::var("DB_CONNECT_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .filter(|&ms| ms > 0)
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS),
            ),
            sqlite_path: utils::assets::database_path(),
        }
    }

    /// Connection parameters for logging, secrets redacted.
    pub fn redacted(&self) -> String {
        format!(
            "mysql://{}@{}:{}/{} (password {})",
            self.user,
            self.host,
            self.port,
            self.database,
            if self.password.is_empty() {
                "empty"
            } else {
                "***"
            }
        )
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_owned())
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
