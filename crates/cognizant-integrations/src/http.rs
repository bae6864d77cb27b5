//! Response checks shared by log service calls.

use anyhow::Result;
use reqwest::StatusCode;

/// Longest slice of an error body kept in the error message
const MAX_ERROR_BODY_CHARS: usize = 200;

#[async_trait::async_trait]
pub trait ResponseExt {
    /// Turn a non-2xx response into an error carrying the status and body.
    ///
    /// # Errors
    ///
    /// Returns an error if the response status is not successful
    async fn ensure_success(self, endpoint: &str) -> Result<Self>
    where
        Self: Sized;
}

#[async_trait::async_trait]
impl ResponseExt for reqwest::Response {
    async fn ensure_success(self, endpoint: &str) -> Result<Self> {
        let status = self.status();
        if status.is_success() {
            return Ok(self);
        }
        let body = self.text().await.unwrap_or_default();
        Err(anyhow::anyhow!(describe_failure(endpoint, status, &body)))
    }
}

fn describe_failure(endpoint: &str, status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return format!("{endpoint} returned {status}");
    }
    let excerpt: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    format!("{endpoint} returned {status}: {excerpt}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_failure_without_body() {
        assert_eq!(
            describe_failure("usage-logs/", StatusCode::BAD_GATEWAY, "  "),
            "usage-logs/ returned 502 Bad Gateway"
        );
    }

    #[test]
    fn test_describe_failure_truncates_body() {
        let body = "x".repeat(500);
        let message = describe_failure("test-results/", StatusCode::BAD_REQUEST, &body);
        assert!(message.starts_with("test-results/ returned 400 Bad Request: "));
        assert_eq!(message.matches('x').count(), MAX_ERROR_BODY_CHARS);
    }
}
