//! Backend selection.
//!
//! Exactly one backend is chosen per process, lazily, on the first call to
//! [`ConnectionManager::get`]. The in-flight selection future itself is
//! shared, so N concurrent early callers trigger one selection and all
//! observe the same handle. The choice never reverts: a primary that comes
//! back to life later is not revisited.

use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::Executor;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::backend::{Backend, BackendKind};
use crate::config::DbConfig;
use crate::error::{DbError, ProbeFailure};
use crate::{Database, schema};

/// SQLite benefits from limited connections due to single-writer model.
const SQLITE_MAX_CONNECTIONS: u32 = 10;
const MYSQL_MAX_CONNECTIONS: u32 = 10;
const MYSQL_MIN_CONNECTIONS: u32 = 2;
const ACQUIRE_TIMEOUT_SECS: u64 = 30;

pub struct ConnectionManager {
    config: DbConfig,
    cell: OnceCell<Database>,
    selections: AtomicU32,
    probes: AtomicU32,
}

impl ConnectionManager {
    pub fn new(config: DbConfig) -> Self {
        ConnectionManager {
            config,
            cell: OnceCell::new(),
            selections: AtomicU32::new(0),
            probes: AtomicU32::new(0),
        }
    }

    pub fn from_env() -> Self {
        Self::new(DbConfig::from_env())
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Resolve the active backend, selecting it on first use.
    ///
    /// Idempotent and concurrency-safe: all callers await the same one-shot
    /// initialization and receive the same handle. Selection itself never
    /// errors into callers unless both engines are unusable, which is a
    /// fatal startup condition.
    pub async fn get(&self) -> Result<&Database, DbError> {
        self.cell.get_or_try_init(|| self.select_backend()).await
    }

    /// How many selection sequences have run (0 before first use, then 1).
    pub fn selection_count(&self) -> u32 {
        self.selections.load(Ordering::SeqCst)
    }

    /// How many primary probes were attempted. Stays 0 when `USE_SQLITE`
    /// short-circuits selection.
    pub fn probe_count(&self) -> u32 {
        self.probes.load(Ordering::SeqCst)
    }

    async fn select_backend(&self) -> Result<Database, DbError> {
        self.selections.fetch_add(1, Ordering::SeqCst);

        if self.config.use_sqlite {
            info!("USE_SQLITE set, skipping primary engine probe");
            return self.open_fallback().await;
        }

        match self.probe_primary().await {
            Ok(pool) => {
                info!(
                    backend = %BackendKind::MySql,
                    params = %self.config.redacted(),
                    "primary engine active"
                );
                Ok(Database::new(Backend::MySql(pool)))
            }
            Err(failure) => {
                warn!(
                    category = failure.category(),
                    params = %self.config.redacted(),
                    error = %failure,
                    "primary engine unavailable, falling back to sqlite"
                );
                self.open_fallback().await
            }
        }
    }

    /// Open a pool against the primary engine and prove it with `SELECT 1`.
    /// A pool can construct successfully yet fail on its first real query
    /// (e.g. an auth plugin the client cannot negotiate), so construction
    /// alone is not trusted.
    async fn probe_primary(&self) -> Result<MySqlPool, ProbeFailure> {
        self.probes.fetch_add(1, Ordering::SeqCst);

        let options = MySqlConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .database(&self.config.database)
            .username(&self.config.user)
            .password(&self.config.password);

        let attempt = async {
            let pool = MySqlPoolOptions::new()
                .max_connections(MYSQL_MAX_CONNECTIONS)
                .min_connections(MYSQL_MIN_CONNECTIONS)
                .acquire_timeout(self.config.connect_timeout)
                .connect_with(options)
                .await?;
            // Don't leave a half-proven pool's connections to unwind on
            // their own when the liveness query fails.
            if let Err(err) = sqlx::query("SELECT 1").execute(&pool).await {
                pool.close().await;
                return Err(err);
            }
            Ok::<_, sqlx::Error>(pool)
        };

        match tokio::time::timeout(self.config.connect_timeout, attempt).await {
            Ok(Ok(pool)) => Ok(pool),
            Ok(Err(err)) => Err(ProbeFailure::classify(err)),
            Err(_elapsed) => Err(ProbeFailure::Timeout),
        }
    }

    /// Open (creating if needed) the file-backed fallback and bootstrap its
    /// schema. Failure here is fatal: there is nothing left to serve
    /// requests with.
    async fn open_fallback(&self) -> Result<Database, DbError> {
        let path = &self.config.sqlite_path;
        if !path.exists() {
            info!(path = %path.display(), "creating sqlite fallback database");
        }

        let database_url = format!("sqlite://{}", path.to_string_lossy());
        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(DbError::FallbackInit)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS));

        let pool = SqlitePoolOptions::new()
            .max_connections(SQLITE_MAX_CONNECTIONS)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    // temp_store = MEMORY (2), 64MB page cache
                    conn.execute("PRAGMA temp_store = 2").await?;
                    conn.execute("PRAGMA cache_size = -64000").await?;
                    Ok(())
                })
            })
            .connect_with(options)
            .await
            .map_err(DbError::FallbackInit)?;

        schema::ensure_schema(&pool).await?;

        info!(
            backend = %BackendKind::Sqlite,
            path = %path.display(),
            "fallback engine active"
        );
        Ok(Database::new(Backend::Sqlite(pool)))
    }
}
