//! Database operations split into domain-specific modules.
//!
//! This module re-exports the main Database struct and all its operations.

mod helpers;
mod test_results;
mod usage_logs;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;

use crate::migrations;
use crate::models::{normalize_watchlist, SessionGoal, Settings};
use helpers::{parse_json, parse_uuid};

/// Database connection wrapper
pub struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    /// Create a new database connection
    ///
    /// # Errors
    ///
    /// Returns an error if database directory creation, connection opening, or schema initialization fails
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = db_path.unwrap_or_else(Self::default_db_path);

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(&path).context("Failed to open database connection")?;
        migrations::init_schema(&conn)?;

        log::info!("Database initialized at: {}", path.display());

        Ok(Self { conn })
    }

    /// Get default database path
    fn default_db_path() -> PathBuf {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("cognizant");
        path.push("cognizant.db");
        path
    }

    // ==================== Settings Methods ====================

    /// Get or create settings
    ///
    /// # Errors
    ///
    /// Returns an error if the database query or insert operation fails
    pub fn get_settings(&self) -> Result<Settings> {
        let result: Option<Settings> = self
            .conn
            .query_row(
                "SELECT id, reminder_threshold_seconds, session_goal, watchlist
                 FROM settings LIMIT 1",
                [],
                |row| {
                    let goal: String = row.get(2)?;
                    let watchlist_json: String = row.get(3)?;

                    Ok(Settings {
                        id: parse_uuid(&row.get::<_, String>(0)?)?,
                        reminder_threshold_seconds: row.get(1)?,
                        session_goal: goal.parse().unwrap_or_default(),
                        watchlist: parse_json(&watchlist_json)?,
                    })
                },
            )
            .optional()?;

        if let Some(settings) = result {
            Ok(settings)
        } else {
            // Create default settings
            let settings = Settings::default_settings();
            self.update_settings(&settings)?;
            Ok(settings)
        }
    }

    /// Update settings
    ///
    /// # Errors
    ///
    /// Returns an error if the database update operation or JSON serialization fails
    pub fn update_settings(&self, settings: &Settings) -> Result<()> {
        let watchlist_json = serde_json::to_string(&settings.watchlist)?;

        self.conn.execute(
            "INSERT INTO settings (id, reminder_threshold_seconds, session_goal, watchlist)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                reminder_threshold_seconds = ?2,
                session_goal = ?3,
                watchlist = ?4",
            params![
                settings.id.to_string(),
                settings.reminder_threshold_seconds,
                settings.session_goal.as_str(),
                watchlist_json,
            ],
        )?;
        Ok(())
    }

    /// Save a new reminder threshold
    ///
    /// # Errors
    ///
    /// Returns an error if the threshold is zero or the update fails
    pub fn set_reminder_threshold(&self, seconds: u32) -> Result<Settings> {
        if seconds == 0 {
            anyhow::bail!("Reminder threshold must be a positive number of seconds");
        }
        let mut settings = self.get_settings()?;
        settings.reminder_threshold_seconds = seconds;
        self.update_settings(&settings)?;
        Ok(settings)
    }

    /// Save a new session goal
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub fn set_session_goal(&self, goal: SessionGoal) -> Result<Settings> {
        let mut settings = self.get_settings()?;
        settings.session_goal = goal;
        self.update_settings(&settings)?;
        Ok(settings)
    }

    /// Replace the watch list wholesale
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub fn set_watchlist(&self, entries: &[String]) -> Result<Settings> {
        let mut settings = self.get_settings()?;
        settings.watchlist = normalize_watchlist(entries);
        self.update_settings(&settings)?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(super) fn temp_db() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(Some(dir.path().join("cognizant.db"))).unwrap();
        (dir, db)
    }

    #[test]
    fn test_settings_created_with_defaults() {
        let (_dir, db) = temp_db();
        let settings = db.get_settings().unwrap();
        assert_eq!(settings.reminder_threshold_seconds, 60);
        assert_eq!(settings.session_goal, SessionGoal::Focus);
        assert_eq!(settings.watchlist.len(), 3);

        // Second read returns the same row
        let again = db.get_settings().unwrap();
        assert_eq!(again.id, settings.id);
    }

    #[test]
    fn test_set_reminder_threshold() {
        let (_dir, db) = temp_db();
        db.set_reminder_threshold(5).unwrap();
        assert_eq!(db.get_settings().unwrap().reminder_threshold_seconds, 5);
        assert!(db.set_reminder_threshold(0).is_err());
        assert_eq!(db.get_settings().unwrap().reminder_threshold_seconds, 5);
    }

    #[test]
    fn test_set_session_goal() {
        let (_dir, db) = temp_db();
        db.set_session_goal(SessionGoal::Relax).unwrap();
        assert_eq!(db.get_settings().unwrap().session_goal, SessionGoal::Relax);
    }

    #[test]
    fn test_set_watchlist_replaces_wholesale() {
        let (_dir, db) = temp_db();
        db.set_watchlist(&[" example.com ".to_string(), String::new()])
            .unwrap();
        assert_eq!(
            db.get_settings().unwrap().watchlist,
            vec!["example.com".to_string()]
        );
    }

    #[test]
    fn test_settings_persist_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cognizant.db");
        {
            let db = Database::new(Some(path.clone())).unwrap();
            db.set_reminder_threshold(90).unwrap();
        }
        let db = Database::new(Some(path)).unwrap();
        assert_eq!(db.get_settings().unwrap().reminder_threshold_seconds, 90);
    }
}
