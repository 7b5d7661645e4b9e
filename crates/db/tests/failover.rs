//! End-to-end backend selection behavior against real engines: a forced
//! SQLite fallback, and a primary that is guaranteed unreachable.

use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;

use db::{BackendKind, ConnectionManager, DbConfig, params};

fn sqlite_only_config(path: &Path) -> DbConfig {
    DbConfig {
        use_sqlite: true,
        host: "localhost".to_owned(),
        port: 3306,
        database: "paxipm".to_owned(),
        user: "root".to_owned(),
        password: String::new(),
        connect_timeout: Duration::from_millis(500),
        sqlite_path: path.to_path_buf(),
    }
}

fn dead_primary_config(path: &Path) -> DbConfig {
    DbConfig {
        use_sqlite: false,
        // Port 1 on loopback refuses immediately on any sane host.
        host: "127.0.0.1".to_owned(),
        port: 1,
        database: "paxipm".to_owned(),
        user: "nobody".to_owned(),
        password: "wrong".to_owned(),
        connect_timeout: Duration::from_millis(500),
        sqlite_path: path.to_path_buf(),
    }
}

#[tokio::test]
async fn forced_fallback_skips_the_probe() {
    let dir = TempDir::new().unwrap();
    let manager = ConnectionManager::new(sqlite_only_config(&dir.path().join("pm.db")));

    let database = manager.get().await.unwrap();
    assert_eq!(database.backend_kind(), BackendKind::Sqlite);
    assert_eq!(manager.selection_count(), 1);
    assert_eq!(manager.probe_count(), 0);
    database.ping().await.unwrap();
}

#[tokio::test]
async fn concurrent_first_callers_share_one_selection() {
    let dir = TempDir::new().unwrap();
    let manager = std::sync::Arc::new(ConnectionManager::new(sqlite_only_config(
        &dir.path().join("pm.db"),
    )));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            manager.get().await.unwrap().backend_kind()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), BackendKind::Sqlite);
    }
    assert_eq!(manager.selection_count(), 1);
}

#[tokio::test]
async fn unreachable_primary_falls_back_within_the_timeout() {
    let dir = TempDir::new().unwrap();
    let manager = ConnectionManager::new(dead_primary_config(&dir.path().join("pm.db")));

    let started = std::time::Instant::now();
    let database = manager.get().await.unwrap();
    // One probe, then the fallback; the whole selection is bounded by the
    // configured timeout plus fallback setup.
    assert_eq!(database.backend_kind(), BackendKind::Sqlite);
    assert_eq!(manager.probe_count(), 1);
    assert!(started.elapsed() < Duration::from_secs(10));

    // The selection is memoized: a second get() probes nothing.
    let again = manager.get().await.unwrap();
    assert_eq!(again.backend_kind(), BackendKind::Sqlite);
    assert_eq!(manager.selection_count(), 1);
    assert_eq!(manager.probe_count(), 1);
}

#[tokio::test]
async fn hanging_primary_probe_times_out_and_falls_back() {
    // Bound but never accepted: the TCP connect succeeds and the MySQL
    // handshake then stalls forever, so only the probe's outer timeout can
    // end the attempt.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let dir = TempDir::new().unwrap();
    let mut config = dead_primary_config(&dir.path().join("pm.db"));
    config.port = port;
    config.connect_timeout = Duration::from_millis(800);

    let started = std::time::Instant::now();
    let manager = ConnectionManager::new(config);
    let database = manager.get().await.unwrap();

    assert_eq!(database.backend_kind(), BackendKind::Sqlite);
    assert_eq!(manager.probe_count(), 1);
    assert!(started.elapsed() < Duration::from_secs(5));
    drop(listener);
}

#[tokio::test]
async fn fallback_creates_the_file_and_bootstraps_schema() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fresh.db");
    assert!(!path.exists());

    let manager = ConnectionManager::new(sqlite_only_config(&path));
    let database = manager.get().await.unwrap();
    assert!(path.exists());

    // The bootstrapped schema is usable immediately.
    let inserted = database
        .query(
            "INSERT INTO users (name, email, role, password_hash) VALUES (?, ?, ?, ?)",
            &params!["Ada", "ada@example.com", "Admin", "hash"],
        )
        .await
        .unwrap();
    let id = inserted.insert_id.unwrap();
    assert_eq!(inserted.rows_affected, 1);

    let rows = database
        .execute("SELECT * FROM users WHERE email = ?", &params!["ada@example.com"])
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].i64("id").unwrap(), id);
    assert_eq!(rows[0].str_opt("name").as_deref(), Some("Ada"));
}

#[tokio::test]
async fn schema_bootstrap_is_idempotent_across_managers() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pm.db");

    let first = ConnectionManager::new(sqlite_only_config(&path));
    let database = first.get().await.unwrap();
    database
        .query(
            "INSERT INTO users (name, email, role, password_hash) VALUES (?, ?, ?, ?)",
            &params!["Grace", "grace@example.com", "Admin", "hash"],
        )
        .await
        .unwrap();
    database.close().await;

    // A second process opening the same file re-runs the bootstrap without
    // clobbering existing data.
    let second = ConnectionManager::new(sqlite_only_config(&path));
    let database = second.get().await.unwrap();
    let rows = database
        .execute("SELECT COUNT(*) AS count FROM users", &params![])
        .await
        .unwrap();
    assert_eq!(rows[0].i64_opt("count"), Some(1));
}

#[tokio::test]
async fn rewritten_placeholders_match_handwritten_markers() {
    let dir = TempDir::new().unwrap();
    let manager = ConnectionManager::new(sqlite_only_config(&dir.path().join("pm.db")));
    let database = manager.get().await.unwrap();

    for (name, email) in [("Ada", "ada@example.com"), ("Lin", "lin@example.com")] {
        database
            .query(
                "INSERT INTO users (name, email, role, password_hash) VALUES (?, ?, ?, ?)",
                &params![name, email, "Admin", "hash"],
            )
            .await
            .unwrap();
    }

    let canonical = database
        .execute(
            "SELECT * FROM users WHERE email = ? AND role = ?",
            &params!["lin@example.com", "Admin"],
        )
        .await
        .unwrap();
    let handwritten = database
        .execute(
            "SELECT * FROM users WHERE email = $1 AND role = $2",
            &params!["lin@example.com", "Admin"],
        )
        .await
        .unwrap();
    assert_eq!(canonical, handwritten);
    assert_eq!(canonical.len(), 1);
    assert_eq!(canonical[0].str_opt("name").as_deref(), Some("Lin"));
}

#[tokio::test]
async fn bound_parameters_round_trip_typed_values() {
    let dir = TempDir::new().unwrap();
    let manager = ConnectionManager::new(sqlite_only_config(&dir.path().join("pm.db")));
    let database = manager.get().await.unwrap();

    let user = database
        .query(
            "INSERT INTO users (name, email, role, password_hash) VALUES (?, ?, ?, ?)",
            &params!["Lin", "lin@example.com", "Admin", "hash"],
        )
        .await
        .unwrap();
    let project = database
        .query(
            "INSERT INTO projects (title, status, user_id, budgeted_amount) VALUES (?, ?, ?, ?)",
            &params!["Rollout", "Active", user.insert_id.unwrap(), 1500.75],
        )
        .await
        .unwrap();

    let rows = database
        .execute(
            "SELECT title, budgeted_amount FROM projects WHERE id = ? AND status = ?",
            &params![project.insert_id.unwrap(), "Active"],
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].str_opt("title").as_deref(), Some("Rollout"));
    assert_eq!(rows[0].f64_opt("budgeted_amount"), Some(1500.75));
}
