//! Database schema migrations.
//!
//! Applies the initial schema: the `kv` table holding the session list and
//! per-session transcripts, plus the `schema_migrations` tracking table.

use rusqlite::Connection;
use tracing::info;

use analyst_core::error::AnalystError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), AnalystError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| AnalystError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| AnalystError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: key_value_store");
    }

    Ok(())
}

/// Version 1: key-value text store.
fn apply_v1(conn: &Connection) -> Result<(), AnalystError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS kv (
            key         TEXT PRIMARY KEY NOT NULL,
            value       TEXT NOT NULL,
            updated_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'key_value_store');
        ",
    )
    .map_err(|e| AnalystError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_run_once() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_kv_table_exists() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)",
            rusqlite::params!["chat_sessions", "[]"],
        )
        .unwrap();
        let value: String = conn
            .query_row("SELECT value FROM kv WHERE key = 'chat_sessions'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(value, "[]");
    }

    #[test]
    fn test_kv_key_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        conn.execute("INSERT INTO kv (key, value) VALUES ('a', '1')", [])
            .unwrap();
        assert!(conn
            .execute("INSERT INTO kv (key, value) VALUES ('a', '2')", [])
            .is_err());
    }
}
