use std::path::PathBuf;

/// Override for the data directory (tests, containers).
pub const DATA_DIR_ENV: &str = "INACTIVE_USER_DATA_DIR";

/// Retourne le repertoire de donnees centralise cross-platform.
/// Linux: ~/.config/inactive-user/
/// macOS: ~/Library/Application Support/inactive-user/
/// Windows: %APPDATA%/inactive-user/
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    let base = dirs::config_dir().unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
    });
    base.join("inactive-user")
}

/// {data_dir}/accounts.db
pub fn db_path() -> PathBuf {
    data_dir().join("accounts.db")
}

/// {data_dir}/config.json
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// {data_dir}/inactive-user.log
pub fn log_path() -> PathBuf {
    data_dir().join("inactive-user.log")
}

/// {data_dir}/watch.pid
pub fn pid_path() -> PathBuf {
    data_dir().join("watch.pid")
}
