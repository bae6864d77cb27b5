use anyhow::Result;
use rusqlite::Connection;

/// Initialize database schema
///
/// # Errors
///
/// Returns an error if database table creation or index creation fails
pub fn init_schema(conn: &Connection) -> Result<()> {
    // Settings table - threshold, session goal and watch list (single row)
    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings (
            id TEXT PRIMARY KEY,
            reminder_threshold_seconds INTEGER NOT NULL,
            session_goal TEXT NOT NULL,
            watchlist TEXT NOT NULL DEFAULT '[]'
        )",
        [],
    )?;

    // Usage logs - one row per acknowledged reminder
    conn.execute(
        "CREATE TABLE IF NOT EXISTS usage_logs (
            id TEXT PRIMARY KEY,
            domain TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            duration_seconds INTEGER NOT NULL
        )",
        [],
    )?;

    // Test results - output of the cognitive tests, result kept as JSON
    conn.execute(
        "CREATE TABLE IF NOT EXISTS test_results (
            id TEXT PRIMARY KEY,
            test_type TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            result TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_usage_logs_timestamp ON usage_logs(timestamp)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_usage_logs_domain ON usage_logs(domain)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_test_results_type ON test_results(test_type)",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('settings', 'usage_logs', 'test_results')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }
}
