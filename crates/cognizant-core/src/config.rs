use anyhow::{Context, Result};
use cognizant_integrations::DEFAULT_LOG_SERVICE_URL;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};

/// Get the local data directory for cognizant.
///
/// # Errors
///
/// Returns an error if the local data directory cannot be determined.
pub fn get_data_dir() -> Result<PathBuf> {
    let mut path =
        dirs::data_local_dir().ok_or_else(|| anyhow::anyhow!("Failed to get local data dir"))?;
    path.push("cognizant");
    Ok(path)
}

/// Daemon settings read from `config.toml` in the data directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Base URL of the usage/test-result log service
    pub log_service_url: String,
    /// Period of the dwell watch tick
    pub tick_interval_ms: u64,
    /// How long an observer has to acknowledge a reminder
    pub ack_timeout_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_service_url: DEFAULT_LOG_SERVICE_URL.to_string(),
            tick_interval_ms: 1000,
            ack_timeout_ms: 5000,
        }
    }
}

impl DaemonConfig {
    /// Load the config file, falling back to defaults when it does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self =
            toml::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `config.toml` from the data directory
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory is unknown or the file is invalid
    pub fn load_default() -> Result<Self> {
        Self::load(&Self::default_path()?)
    }

    /// Path of `config.toml` in the data directory
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be determined
    pub fn default_path() -> Result<PathBuf> {
        Ok(get_data_dir()?.join("config.toml"))
    }

    /// Write the config file, creating the parent directory if needed
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(self)?;
        fs::write(path, raw).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            anyhow::bail!("tick_interval_ms must be greater than zero");
        }
        if self.ack_timeout_ms == 0 {
            anyhow::bail!("ack_timeout_ms must be greater than zero");
        }
        Ok(())
    }

    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    #[must_use]
    pub const fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}
