//! First-time setup: data directory, database and daemon config file

use anyhow::{Context, Result};
use cognizant_core::config::DaemonConfig;
use cognizant_storage::Database;
use std::{fs, path::Path};

/// Initialize cognizant
///
/// # Errors
///
/// Returns an error if the data directory, database or config file cannot be created
pub fn init_command(data_dir: &Path) -> Result<()> {
    println!("Initializing Cognizant...\n");

    println!("Step 1/2: Database Setup");
    println!("{}", "-".repeat(40));
    fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;
    let db = Database::new(None)?;
    let settings = db.get_settings()?;
    println!("Database ready.");
    println!("  threshold = {}s", settings.reminder_threshold_seconds);
    println!("  goal = {}", settings.session_goal);
    println!("  watchlist = {}", settings.watchlist.join(", "));

    println!("\nStep 2/2: Daemon Configuration");
    println!("{}", "-".repeat(40));
    let config_path = data_dir.join("config.toml");
    if config_path.exists() {
        println!("Config already exists at: {}", config_path.display());
    } else {
        DaemonConfig::default().save(&config_path)?;
        println!("Config written to: {}", config_path.display());
    }

    println!("\n========================================");
    println!("  Setup Complete!");
    println!("========================================");
    println!("\nStart the daemon with: cognizant start");

    Ok(())
}
