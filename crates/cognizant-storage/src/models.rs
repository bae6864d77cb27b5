use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Reminder threshold used until the user saves one
pub const DEFAULT_REMINDER_THRESHOLD_SECONDS: u32 = 60;

/// What the user says they are doing right now; selects the reminder wording
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionGoal {
    Study,
    #[default]
    Focus,
    Relax,
    Other,
}

impl SessionGoal {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Study => "study",
            Self::Focus => "focus",
            Self::Relax => "relax",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for SessionGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown goals are kept as `Other` so they fall through to the generic reminder
impl FromStr for SessionGoal {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "study" => Self::Study,
            "focus" => Self::Focus,
            "relax" => Self::Relax,
            _ => Self::Other,
        })
    }
}

/// User settings saved from the popup controls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub id: Uuid,
    pub reminder_threshold_seconds: u32,
    pub session_goal: SessionGoal,
    pub watchlist: Vec<String>, // Domain substrings, e.g. "youtube.com"
}

impl Settings {
    #[must_use]
    pub fn default_settings() -> Self {
        Self {
            id: Uuid::new_v4(),
            reminder_threshold_seconds: DEFAULT_REMINDER_THRESHOLD_SECONDS,
            session_goal: SessionGoal::Focus,
            watchlist: default_watchlist(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::default_settings()
    }
}

/// Sites watched out of the box
#[must_use]
pub fn default_watchlist() -> Vec<String> {
    vec![
        "facebook.com".to_string(),
        "instagram.com".to_string(),
        "youtube.com".to_string(),
    ]
}

/// Normalize a user-entered watch list: trim entries and drop blanks
#[must_use]
pub fn normalize_watchlist<I, S>(entries: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .map(|entry| entry.as_ref().trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// Local copy of a usage record that was emitted after an acknowledged reminder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageLog {
    pub id: Uuid,
    pub domain: String,
    pub timestamp: DateTime<Utc>,
    pub duration_seconds: u32,
}

impl UsageLog {
    #[must_use]
    pub fn new(domain: String, timestamp: DateTime<Utc>, duration_seconds: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            domain,
            timestamp,
            duration_seconds,
        }
    }
}

/// Local copy of a cognitive test result (focus, memory, reaction)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResultRecord {
    pub id: Uuid,
    pub test_type: String,
    pub timestamp: DateTime<Utc>,
    pub result: serde_json::Value,
}

impl TestResultRecord {
    #[must_use]
    pub fn new(test_type: String, timestamp: DateTime<Utc>, result: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            test_type,
            timestamp,
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_goal_parse() {
        assert_eq!("study".parse::<SessionGoal>().unwrap(), SessionGoal::Study);
        assert_eq!(" Focus ".parse::<SessionGoal>().unwrap(), SessionGoal::Focus);
        assert_eq!("relax".parse::<SessionGoal>().unwrap(), SessionGoal::Relax);
        assert_eq!("gaming".parse::<SessionGoal>().unwrap(), SessionGoal::Other);
    }

    #[test]
    fn test_session_goal_default_is_focus() {
        assert_eq!(SessionGoal::default(), SessionGoal::Focus);
        assert_eq!(Settings::default_settings().session_goal, SessionGoal::Focus);
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default_settings();
        assert_eq!(settings.reminder_threshold_seconds, 60);
        assert_eq!(settings.watchlist, default_watchlist());
    }

    #[test]
    fn test_normalize_watchlist() {
        let list = normalize_watchlist(vec![" reddit.com", "", "  ", "x.com "]);
        assert_eq!(list, vec!["reddit.com".to_string(), "x.com".to_string()]);
    }
}
