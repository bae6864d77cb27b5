pub mod db;
pub mod migrations;
pub mod models;

pub use db::Database;
pub use models::{
    default_watchlist, normalize_watchlist, SessionGoal, Settings, TestResultRecord, UsageLog,
    DEFAULT_REMINDER_THRESHOLD_SECONDS,
};
