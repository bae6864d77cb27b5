/// Usage report command handler
use anyhow::Result;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use cognizant_core::config::DaemonConfig;
use cognizant_integrations::{LogCollaborator, LogServiceClient};
use cognizant_storage::Database;
use std::collections::HashMap;
use tabled::{Table, Tabled};

use super::helpers::{format_hms, truncate_str};

#[derive(Tabled, Debug, PartialEq, Eq)]
struct SiteStats {
    #[tabled(rename = "Site")]
    domain: String,
    #[tabled(rename = "Reminders")]
    reminders: usize,
    #[tabled(rename = "Time before reminder")]
    total: String,
    #[tabled(rename = "Share")]
    percentage: String,
}

fn period_range(period: &str, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    match period {
        "today" => Some((now.date_naive().and_time(NaiveTime::MIN).and_utc(), now)),
        "week" => Some((now - Duration::days(7), now)),
        "month" => Some((now - Duration::days(30), now)),
        _ => None,
    }
}

/// Per-site totals, largest first
fn summarize<I>(records: I) -> (Vec<SiteStats>, u64)
where
    I: IntoIterator<Item = (String, u32)>,
{
    let mut per_site: HashMap<String, (usize, u64)> = HashMap::new();
    for (domain, seconds) in records {
        let entry = per_site.entry(domain).or_default();
        entry.0 += 1;
        entry.1 += u64::from(seconds);
    }
    let total: u64 = per_site.values().map(|(_, seconds)| seconds).sum();

    let mut rows: Vec<(String, usize, u64)> = per_site
        .into_iter()
        .map(|(domain, (count, seconds))| (domain, count, seconds))
        .collect();
    rows.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(&b.0)));

    let stats = rows
        .into_iter()
        .map(|(domain, reminders, seconds)| {
            #[allow(clippy::cast_precision_loss)]
            let percentage = if total > 0 {
                format!("{:.1}%", (seconds as f64 / total as f64) * 100.0)
            } else {
                String::from("0%")
            };
            SiteStats {
                domain: truncate_str(&domain, 40),
                reminders,
                total: format_hms(seconds),
                percentage,
            }
        })
        .collect();

    (stats, total)
}

pub async fn handle_report_command(period: &str, local: bool) -> Result<()> {
    let Some((start, end)) = period_range(period, Utc::now()) else {
        println!("Unknown period: {period}. Use 'today', 'week', or 'month'");
        return Ok(());
    };

    let records: Vec<(String, u32)> = if local {
        Database::new(None)?
            .get_usage_logs(start, end)?
            .into_iter()
            .map(|log| (log.domain, log.duration_seconds))
            .collect()
    } else {
        let config = DaemonConfig::load_default()?;
        let client = LogServiceClient::new(Some(config.log_service_url))?;
        client
            .fetch_usage_records()
            .await?
            .into_iter()
            .filter(|record| record.timestamp >= start && record.timestamp <= end)
            .map(|record| (record.domain, record.duration_seconds))
            .collect()
    };

    if records.is_empty() {
        println!("No reminders recorded for period: {period}");
        return Ok(());
    }

    let (stats, total) = summarize(records);

    println!("\nUsage Report: {period}");
    println!("\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}");

    let table = Table::new(stats).to_string();
    println!("\n{table}");
    println!("\nTotal time before reminders: {}", format_hms(total));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_period_range() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 15, 30, 0).unwrap();
        let (start, end) = period_range("today", now).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap());
        assert_eq!(end, now);

        let (start, _) = period_range("week", now).unwrap();
        assert_eq!(start, now - Duration::days(7));
        assert!(period_range("fortnight", now).is_none());
    }

    #[test]
    fn test_summarize_groups_and_sorts() {
        let (stats, total) = summarize(vec![
            ("youtube.com".to_string(), 60),
            ("example.com".to_string(), 5),
            ("youtube.com".to_string(), 90),
        ]);
        assert_eq!(total, 155);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].domain, "youtube.com");
        assert_eq!(stats[0].reminders, 2);
        assert_eq!(stats[0].total, "00:02:30");
        assert_eq!(stats[0].percentage, "96.8%");
        assert_eq!(stats[1].domain, "example.com");
    }
}
