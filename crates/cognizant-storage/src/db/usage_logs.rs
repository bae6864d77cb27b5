//! Usage log database operations.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::params;

use super::helpers::{parse_datetime, parse_uuid};
use super::Database;
use crate::models::UsageLog;

impl Database {
    /// Store a usage record locally
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert operation fails
    pub fn insert_usage_log(&self, log: &UsageLog) -> Result<()> {
        self.conn.execute(
            "INSERT INTO usage_logs (id, domain, timestamp, duration_seconds)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                log.id.to_string(),
                log.domain,
                log.timestamp.to_rfc3339(),
                log.duration_seconds,
            ],
        )?;
        Ok(())
    }

    /// Get usage logs for a time range, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn get_usage_logs(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UsageLog>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, domain, timestamp, duration_seconds
             FROM usage_logs
             WHERE timestamp BETWEEN ?1 AND ?2
             ORDER BY timestamp DESC",
        )?;

        let logs = stmt
            .query_map(params![start.to_rfc3339(), end.to_rfc3339()], |row| {
                Ok(UsageLog {
                    id: parse_uuid(&row.get::<_, String>(0)?)?,
                    domain: row.get(1)?,
                    timestamp: parse_datetime(&row.get::<_, String>(2)?)?,
                    duration_seconds: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(logs)
    }
}
