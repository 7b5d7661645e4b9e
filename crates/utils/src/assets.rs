use directories::ProjectDirs;

/// Get the application data directory.
///
/// Respects the `PM_DATA_DIR` environment variable for custom locations.
/// Supports tilde expansion (e.g., `~/paxipm/data`).
pub fn data_dir() -> std::path::PathBuf {
    let path = if let Ok(custom) = std::env::var("PM_DATA_DIR") {
        crate::path::expand_tilde(&custom)
    } else {
        ProjectDirs::from("io", "paxipm", "paxipm")
            .expect("OS didn't give us a home directory")
            .data_dir()
            .to_path_buf()
    };

    // Ensure the directory exists
    if !path.exists() {
        tracing::debug!(path = %path.display(), "creating data directory");
        std::fs::create_dir_all(&path).expect("Failed to create data directory");
    }

    path
    // ✔ macOS → ~/Library/Application Support/paxipm
    // ✔ Linux → ~/.local/share/paxipm   (respects XDG_DATA_HOME)
    // ✔ Windows → %APPDATA%\paxipm\paxipm
}

/// Get the SQLite fallback database file path.
///
/// Respects the `DB_SQLITE_PATH` environment variable for custom locations.
/// Supports tilde expansion (e.g., `~/paxipm/paxipm.db`).
///
/// Default: `{data_dir}/paxipm.db`
pub fn database_path() -> std::path::PathBuf {
    if let Ok(path) = std::env::var("DB_SQLITE_PATH") {
        return crate::path::expand_tilde(&path);
    }
    data_dir().join("paxipm.db")
}
