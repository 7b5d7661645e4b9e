//! Error taxonomy for the data access layer.
//!
//! Probe failures during backend selection are recovered locally (they force
//! the fallback engine) and only logged. Everything else propagates to the
//! caller unchanged, with the backend's own message attached.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// A statement failed on the active backend. The original backend error
    /// message is preserved; no retry is attempted at this layer.
    #[error("query failed: {message}")]
    Query {
        message: String,
        #[source]
        source: sqlx::Error,
    },

    /// A column expected by a row mapper is missing or has a type the
    /// defensive getters cannot coerce.
    #[error("column `{0}` missing or has an unexpected type")]
    Column(String),

    /// An insert-style statement did not yield a generated id.
    #[error("statement did not produce an insert id")]
    NoInsertId,

    /// A freshly inserted row could not be read back.
    #[error("row not found")]
    RowNotFound,

    /// The SQLite fallback could not be opened. Selection has nothing left
    /// to fall back to, so this aborts startup.
    #[error("fallback database unavailable: {0}")]
    FallbackInit(#[source] sqlx::Error),

    /// Schema bootstrap hit a DDL error that is not of the
    /// "already exists" class.
    #[error("schema bootstrap failed: {0}")]
    Schema(#[source] sqlx::Error),
}

impl DbError {
    pub(crate) fn query(source: sqlx::Error) -> Self {
        DbError::Query {
            message: source.to_string(),
            source,
        }
    }
}

/// Why the primary engine probe failed.
///
/// Categorized so an operator can tell "wrong password" from "wrong host"
/// in the logs. Never surfaced to callers; every variant ends in fallback
/// selection.
#[derive(Debug)]
pub enum ProbeFailure {
    /// The probe did not complete within the configured connect timeout.
    Timeout,
    /// TCP-level refusal or unreachable host.
    ConnectionRefused,
    /// The server rejected the credentials.
    AuthenticationRejected,
    /// Connected, but the named database does not exist.
    UnknownDatabase,
    /// Authentication negotiation used a plugin the client cannot speak
    /// (e.g. MariaDB's `auth_gssapi_client`).
    UnsupportedAuthPlugin,
    /// Anything else the probe surfaced.
    Other(sqlx::Error),
}

// MySQL/MariaDB server error numbers seen during a failed handshake.
// `MySqlDatabaseError::number()` yields u16.
const ER_ACCESS_DENIED: u16 = 1045;
const ER_ACCESS_DENIED_NO_PASSWORD: u16 = 1698;
const ER_BAD_DB: u16 = 1049;

impl ProbeFailure {
    pub fn classify(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(io) if io.kind() == std::io::ErrorKind::ConnectionRefused => {
                ProbeFailure::ConnectionRefused
            }
            sqlx::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
                ProbeFailure::Timeout
            }
            sqlx::Error::PoolTimedOut => ProbeFailure::Timeout,
            sqlx::Error::Protocol(msg)
                if msg.contains("auth") && msg.contains("plugin") =>
            {
                ProbeFailure::UnsupportedAuthPlugin
            }
            sqlx::Error::Database(db) => {
                match db
                    .try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
                    .map(|e| e.number())
                {
                    Some(ER_ACCESS_DENIED) | Some(ER_ACCESS_DENIED_NO_PASSWORD) => {
                        ProbeFailure::AuthenticationRejected
                    }
                    Some(ER_BAD_DB) => ProbeFailure::UnknownDatabase,
                    _ => ProbeFailure::Other(err),
                }
            }
            _ => ProbeFailure::Other(err),
        }
    }

    /// Stable category string for log filtering.
    pub fn category(&self) -> &'static str {
        match self {
            ProbeFailure::Timeout => "timeout",
            ProbeFailure::ConnectionRefused => "connection-refused",
            ProbeFailure::AuthenticationRejected => "authentication",
            ProbeFailure::UnknownDatabase => "unknown-database",
            ProbeFailure::UnsupportedAuthPlugin => "unsupported-auth-plugin",
            ProbeFailure::Other(_) => "other",
        }
    }
}

impl std::fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeFailure::Timeout => write!(f, "connect timeout exceeded"),
            ProbeFailure::ConnectionRefused => write!(f, "connection refused"),
            ProbeFailure::AuthenticationRejected => write!(f, "credentials rejected"),
            ProbeFailure::UnknownDatabase => write!(f, "unknown database"),
            ProbeFailure::UnsupportedAuthPlugin => {
                write!(f, "unsupported authentication plugin")
            }
            ProbeFailure::Other(err) => write!(f, "{err}"),
        }
    }
}
