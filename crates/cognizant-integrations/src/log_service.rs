use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::http::ResponseExt;
use crate::traits::{LogCollaborator, PostAck, TestResult, UsageRecord};

/// Where the log service listens unless configured otherwise
pub const DEFAULT_LOG_SERVICE_URL: &str = "http://127.0.0.1:8000";

const USAGE_LOGS_PATH: &str = "usage-logs/";
const TEST_RESULTS_PATH: &str = "test-results/";

/// Client for the usage/test-result log service
pub struct LogServiceClient {
    base_url: String,
    client: reqwest::Client,
}

impl LogServiceClient {
    /// Create a new log service client
    ///
    /// # Arguments
    /// * `base_url` - Optional base URL, defaults to the local service
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created
    pub fn new(base_url: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = base_url.unwrap_or_else(|| DEFAULT_LOG_SERVICE_URL.to_string());
        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self { base_url, client })
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        log::debug!("GET {url}");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request to log service")?
            .ensure_success(url)
            .await?;

        response
            .json()
            .await
            .context("Failed to parse log service response")
    }

    async fn post<T: for<'de> Deserialize<'de>, B: Serialize + Sync>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        log::debug!("POST {url}");

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .context("Failed to send request to log service")?
            .ensure_success(url)
            .await?;

        response
            .json()
            .await
            .context("Failed to parse log service response")
    }
}

#[async_trait]
impl LogCollaborator for LogServiceClient {
    async fn post_usage_record(&self, record: &UsageRecord) -> Result<PostAck> {
        let ack: PostAck = self.post(&self.build_url(USAGE_LOGS_PATH), record).await?;
        log::info!(
            "Usage log posted: {} ({}s)",
            record.domain,
            record.duration_seconds
        );
        Ok(ack)
    }

    async fn post_test_result(&self, result: &TestResult) -> Result<PostAck> {
        let ack: PostAck = self.post(&self.build_url(TEST_RESULTS_PATH), result).await?;
        log::info!("Test result posted: {}", result.test_type);
        Ok(ack)
    }

    async fn fetch_usage_records(&self) -> Result<Vec<UsageRecord>> {
        self.get(&self.build_url(USAGE_LOGS_PATH)).await
    }

    async fn fetch_test_results(&self) -> Result<Vec<TestResult>> {
        self.get(&self.build_url(TEST_RESULTS_PATH)).await
    }

    fn system_name(&self) -> &'static str {
        "log-service"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_build_url_default() {
        let client = LogServiceClient::new(None).unwrap();
        assert_eq!(
            client.build_url(USAGE_LOGS_PATH),
            "http://127.0.0.1:8000/usage-logs/"
        );
        assert_eq!(client.system_name(), "log-service");
    }

    #[test]
    fn test_build_url_trims_trailing_slash() {
        let client = LogServiceClient::new(Some("http://logs.local:9000/".to_string())).unwrap();
        assert_eq!(
            client.build_url(TEST_RESULTS_PATH),
            "http://logs.local:9000/test-results/"
        );
    }

    #[tokio::test]
    async fn test_post_to_unreachable_service_fails() {
        // Port 9 (discard) is not listening on loopback in test environments
        let client = LogServiceClient::new(Some("http://127.0.0.1:9".to_string())).unwrap();
        let record = UsageRecord::new("example.com".to_string(), Utc::now(), 5);
        assert!(client.post_usage_record(&record).await.is_err());
    }
}
