use crate::constants::SQLITE_BUSY_TIMEOUT_MS;
use crate::{LifecycleError, LifecycleResult};
use rusqlite::Connection;

/// Ouvre une connexion SQLite avec les pragmas appropries
pub fn open_connection(path: &std::path::Path) -> LifecycleResult<Connection> {
    // Create parent directories if needed
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path).map_err(|e| {
        LifecycleError::Repository(format!("Failed to open {}: {}", path.display(), e))
    })?;

    tracing::debug!(path = %path.display(), "Database connection opened");

    configure(&conn)?;
    Ok(conn)
}

/// Pragmas:
/// - journal_mode = WAL
/// - busy_timeout = SQLITE_BUSY_TIMEOUT_MS (constants.rs)
/// - synchronous = NORMAL
/// - foreign_keys = ON
fn configure(conn: &Connection) -> LifecycleResult<()> {
    conn.execute_batch(&format!(
        "PRAGMA journal_mode = WAL;
         PRAGMA busy_timeout = {};
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;",
        SQLITE_BUSY_TIMEOUT_MS,
    ))
    .map_err(|e| LifecycleError::Repository(format!("Failed to configure pragmas: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_db_path() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("test.db");
        (dir, path)
    }

    #[test]
    fn test_open_connection_creates_parent() {
        let (_dir, path) = tmp_db_path();
        assert!(open_connection(&path).is_ok());
        assert!(path.exists());
    }

    #[test]
    fn test_busy_timeout_set_correctly() {
        let (_dir, path) = tmp_db_path();
        let conn = open_connection(&path).unwrap();
        let timeout: u32 = conn
            .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, SQLITE_BUSY_TIMEOUT_MS);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let (_dir, path) = tmp_db_path();
        let conn = open_connection(&path).unwrap();
        let fk: i32 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }
}
