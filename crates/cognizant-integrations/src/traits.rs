use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Usage record emitted when a reminder is acknowledged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub domain: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "duration")]
    pub duration_seconds: u32,
}

/// Result of one cognitive test run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    #[serde(rename = "type")]
    pub test_type: String,
    pub timestamp: DateTime<Utc>,
    pub result: serde_json::Value,
}

/// Acknowledgement body returned by the log service on POST
#[derive(Debug, Clone, Deserialize)]
pub struct PostAck {
    #[serde(default)]
    pub message: Option<String>,
}

/// Remote log collaborator: stores usage records and test results
#[async_trait]
pub trait LogCollaborator: Send + Sync {
    /// Post a usage record
    ///
    /// # Errors
    ///
    /// Returns an error if the service is unreachable or rejects the record
    async fn post_usage_record(&self, record: &UsageRecord) -> Result<PostAck>;

    /// Post a test result
    ///
    /// # Errors
    ///
    /// Returns an error if the service is unreachable or rejects the result
    async fn post_test_result(&self, result: &TestResult) -> Result<PostAck>;

    /// Fetch all usage records
    ///
    /// # Errors
    ///
    /// Returns an error if the request or response parsing fails
    async fn fetch_usage_records(&self) -> Result<Vec<UsageRecord>>;

    /// Fetch all test results
    ///
    /// # Errors
    ///
    /// Returns an error if the request or response parsing fails
    async fn fetch_test_results(&self) -> Result<Vec<TestResult>>;

    /// Get the collaborator name
    #[must_use]
    fn system_name(&self) -> &'static str;
}

impl UsageRecord {
    #[must_use]
    pub fn new(domain: String, timestamp: DateTime<Utc>, duration_seconds: u32) -> Self {
        Self {
            domain,
            timestamp,
            duration_seconds,
        }
    }
}

impl TestResult {
    #[must_use]
    pub fn new(test_type: String, timestamp: DateTime<Utc>, result: serde_json::Value) -> Self {
        Self {
            test_type,
            timestamp,
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_usage_record_wire_format() {
        let record = UsageRecord::new(
            "example.com".to_string(),
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 5).unwrap(),
            5,
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["domain"], "example.com");
        assert_eq!(json["duration"], 5);
        assert_eq!(json["timestamp"], "2024-03-01T12:00:05Z");
        assert!(json.get("duration_seconds").is_none());
    }

    #[test]
    fn test_usage_record_parses_service_response() {
        let body = r#"[{"domain":"youtube.com","timestamp":"2024-03-01T12:00:05.123Z","duration":61}]"#;
        let records: Vec<UsageRecord> = serde_json::from_str(body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].duration_seconds, 61);
    }

    #[test]
    fn test_test_result_uses_type_key() {
        let result = TestResult::new(
            "memory".to_string(),
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            serde_json::json!({"score": 80}),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "memory");
        assert_eq!(json["result"]["score"], 80);
    }
}
