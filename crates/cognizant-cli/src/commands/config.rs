/// Configuration management command handlers
use anyhow::{Context, Result};
use cognizant_core::{config::DaemonConfig, ipc::IpcRequest};
use cognizant_storage::{Database, SessionGoal, Settings};
use std::path::Path;

use super::helpers::{send_accepted, socket_path};

pub fn handle_config_get(key: &str) -> Result<()> {
    let db = Database::new(None)?;
    let settings = db.get_settings()?;
    let config = DaemonConfig::load_default()?;
    match get_config_value(&settings, &config, key) {
        Some(v) => println!("{key} = {v}"),
        None => println!("{key} is not a known key"),
    }
    Ok(())
}

pub async fn handle_config_set(data_dir: &Path, key: &str, value: &str) -> Result<()> {
    let db = Database::new(None)?;
    let Some(request) = set_config_value(&db, key, value)? else {
        println!("Set {key} = {value}");
        println!("Restart the daemon for this to take effect.");
        return Ok(());
    };
    println!("Set {key} = {value}");

    if !socket_path(data_dir).exists() {
        return Ok(());
    }
    if let Err(e) = send_accepted(data_dir, request).await {
        log::warn!("Saved, but the running daemon was not updated: {e}");
    }
    Ok(())
}

pub fn handle_config_list() -> Result<()> {
    let db = Database::new(None)?;
    let settings = db.get_settings()?;
    let config = DaemonConfig::load_default()?;

    println!("Configuration:");
    println!("\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}");

    println!("\n[settings]");
    println!("  threshold = {}", settings.reminder_threshold_seconds);
    println!("  goal = {}", settings.session_goal);
    println!("  watchlist = {}", settings.watchlist.join(","));

    println!("\n[daemon]");
    println!("  log_service_url = {}", config.log_service_url);
    println!("  tick_interval_ms = {}", config.tick_interval_ms);
    println!("  ack_timeout_ms = {}", config.ack_timeout_ms);

    Ok(())
}

fn get_config_value(settings: &Settings, config: &DaemonConfig, key: &str) -> Option<String> {
    match key {
        "threshold" => Some(settings.reminder_threshold_seconds.to_string()),
        "goal" => Some(settings.session_goal.to_string()),
        "watchlist" => Some(settings.watchlist.join(",")),
        "log_service_url" => Some(config.log_service_url.clone()),
        _ => None,
    }
}

/// Persist a value. Returns the daemon update to send when the running
/// daemon can apply it live.
fn set_config_value(db: &Database, key: &str, value: &str) -> Result<Option<IpcRequest>> {
    match key {
        "threshold" => {
            let seconds: u32 = value
                .trim()
                .parse()
                .context("Threshold must be a whole number of seconds")?;
            let settings = db.set_reminder_threshold(seconds)?;
            Ok(Some(IpcRequest::UpdateThreshold(
                settings.reminder_threshold_seconds,
            )))
        }
        "goal" => {
            let goal: SessionGoal = value.parse().unwrap_or_default();
            let settings = db.set_session_goal(goal)?;
            Ok(Some(IpcRequest::UpdateSessionGoal(settings.session_goal)))
        }
        "watchlist" => {
            let entries: Vec<String> = value.split(',').map(str::to_string).collect();
            let settings = db.set_watchlist(&entries)?;
            Ok(Some(IpcRequest::UpdateWatchlist(settings.watchlist)))
        }
        "log_service_url" => {
            let path = DaemonConfig::default_path()?;
            let mut config = DaemonConfig::load(&path)?;
            config.log_service_url = value.trim().to_string();
            config.save(&path)?;
            Ok(None)
        }
        _ => anyhow::bail!(
            "Unknown key: {key}. Use threshold, goal, watchlist or log_service_url"
        ),
    }
}
