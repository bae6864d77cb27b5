/// Test result commands
use anyhow::{Context, Result};
use chrono::Utc;
use cognizant_core::config::DaemonConfig;
use cognizant_integrations::{LogCollaborator, LogServiceClient, TestResult};
use cognizant_storage::{Database, TestResultRecord};
use tabled::{Table, Tabled};

use super::helpers::truncate_str;

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "Type")]
    test_type: String,
    #[tabled(rename = "Recorded")]
    timestamp: String,
    #[tabled(rename = "Result")]
    result: String,
}

impl ResultRow {
    fn new(test_type: String, timestamp: chrono::DateTime<Utc>, result: &serde_json::Value) -> Self {
        Self {
            test_type,
            timestamp: timestamp.format("%Y-%m-%d %H:%M").to_string(),
            result: truncate_str(&result.to_string(), 60),
        }
    }
}

fn log_service() -> Result<LogServiceClient> {
    let config = DaemonConfig::load_default()?;
    LogServiceClient::new(Some(config.log_service_url))
}

pub async fn handle_results_command(test_type: Option<&str>, local: bool) -> Result<()> {
    let rows: Vec<ResultRow> = if local {
        Database::new(None)?
            .get_test_results(test_type)?
            .into_iter()
            .map(|r| ResultRow::new(r.test_type, r.timestamp, &r.result))
            .collect()
    } else {
        log_service()?
            .fetch_test_results()
            .await?
            .into_iter()
            .filter(|r| test_type.is_none() || test_type == Some(r.test_type.as_str()))
            .map(|r| ResultRow::new(r.test_type, r.timestamp, &r.result))
            .collect()
    };

    if rows.is_empty() {
        println!("No test results recorded");
        return Ok(());
    }

    println!("\n{}", Table::new(rows));
    Ok(())
}

pub async fn handle_record_test(test_type: &str, raw_result: &str) -> Result<()> {
    let result: serde_json::Value =
        serde_json::from_str(raw_result).context("Result must be valid JSON")?;
    let timestamp = Utc::now();

    let db = Database::new(None)?;
    db.insert_test_result(&TestResultRecord::new(
        test_type.to_string(),
        timestamp,
        result.clone(),
    ))?;

    let payload = TestResult::new(test_type.to_string(), timestamp, result);
    match log_service()?.post_test_result(&payload).await {
        Ok(_) => println!("Recorded {test_type} result."),
        Err(e) => {
            log::error!("Failed to post test result: {e:#}");
            println!("Saved {test_type} result locally; the log service did not accept it.");
        }
    }
    Ok(())
}
