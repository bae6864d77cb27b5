//! Cognitive test result database operations.

use anyhow::Result;
use rusqlite::params;

use super::helpers::{parse_datetime, parse_json, parse_uuid};
use super::Database;
use crate::models::TestResultRecord;

impl Database {
    /// Store a test result locally
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization or the database insert fails
    pub fn insert_test_result(&self, record: &TestResultRecord) -> Result<()> {
        let result_json = serde_json::to_string(&record.result)?;
        self.conn.execute(
            "INSERT INTO test_results (id, test_type, timestamp, result)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.id.to_string(),
                record.test_type,
                record.timestamp.to_rfc3339(),
                result_json,
            ],
        )?;
        Ok(())
    }

    /// Get stored test results, optionally filtered by test type, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn get_test_results(&self, test_type: Option<&str>) -> Result<Vec<TestResultRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, test_type, timestamp, result
             FROM test_results
             WHERE ?1 IS NULL OR test_type = ?1
             ORDER BY timestamp ASC",
        )?;

        let records = stmt
            .query_map(params![test_type], |row| {
                Ok(TestResultRecord {
                    id: parse_uuid(&row.get::<_, String>(0)?)?,
                    test_type: row.get(1)?,
                    timestamp: parse_datetime(&row.get::<_, String>(2)?)?,
                    result: parse_json(&row.get::<_, String>(3)?)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::temp_db;
    use super::*;
    use chrono::{Duration, Utc};
    use serde_json::json;

    #[test]
    fn test_insert_and_filter_test_results() {
        let (_dir, db) = temp_db();
        let now = Utc::now();

        db.insert_test_result(&TestResultRecord::new(
            "focus".to_string(),
            now - Duration::minutes(5),
            json!({"correctCount": 3, "score": 100}),
        ))
        .unwrap();
        db.insert_test_result(&TestResultRecord::new(
            "memory".to_string(),
            now,
            json!({"correctCount": 1, "score": 33}),
        ))
        .unwrap();

        let all = db.get_test_results(None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].test_type, "focus");

        let memory = db.get_test_results(Some("memory")).unwrap();
        assert_eq!(memory.len(), 1);
        assert_eq!(memory[0].result["score"], 33);
    }
}
