//! Data access layer with automatic backend failover.
//!
//! All call sites speak one vocabulary — [`Database::execute`] and
//! [`Database::query`] with canonical `?` placeholders — against whichever
//! engine selection landed on: the MariaDB/MySQL primary when it is
//! reachable, otherwise a file-backed SQLite fallback whose schema this
//! crate bootstraps itself. Selection happens once, lazily, and is shared
//! by every caller for the process lifetime.

use std::sync::{Arc, OnceLock};

pub mod backend;
pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod row;
pub mod schema;
pub mod update;
pub mod value;

pub use backend::{Backend, BackendKind, QueryResult};
pub use config::DbConfig;
pub use error::{DbError, ProbeFailure};
pub use manager::ConnectionManager;
pub use row::Row;
pub use update::UpdateBuilder;
pub use value::SqlValue;

/// Cloneable handle to the selected backend.
///
/// Callers never learn which engine is behind it except through
/// [`Database::backend_kind`], and must not branch on it.
#[derive(Clone)]
pub struct Database {
    backend: Arc<Backend>,
}

impl Database {
    pub fn new(backend: Backend) -> Self {
        Database {
            backend: Arc::new(backend),
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Run a statement expecting possibly many result rows.
    pub async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, DbError> {
        tracing::trace!(sql, params = params.len(), "execute");
        self.backend.execute(sql, params).await
    }

    /// Run a statement, additionally surfacing the generated insert id and
    /// affected-row count for mutations.
    pub async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<QueryResult, DbError> {
        tracing::trace!(sql, params = params.len(), "query");
        self.backend.query(sql, params).await
    }

    /// Trivial liveness check against the active backend.
    pub async fn ping(&self) -> Result<(), DbError> {
        self.backend.ping().await
    }

    pub async fn close(&self) {
        self.backend.close().await;
    }
}

static GLOBAL: OnceLock<ConnectionManager> = OnceLock::new();

/// Process-wide database handle.
///
/// The first caller triggers backend selection from environment
/// configuration; everyone else shares the result. Route-level code should
/// use this rather than constructing its own [`ConnectionManager`].
pub async fn database() -> Result<Database, DbError> {
    let manager = GLOBAL.get_or_init(ConnectionManager::from_env);
    manager.get().await.cloned()
}
