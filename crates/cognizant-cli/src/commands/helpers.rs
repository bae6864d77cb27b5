//! Helper utility functions for CLI commands

use anyhow::Result;
use cognizant_core::ipc::{IpcClient, IpcRequest, IpcResponse};
use std::path::{Path, PathBuf};

pub fn socket_path(data_dir: &Path) -> PathBuf {
    data_dir.join("cognizant.sock")
}

pub fn pid_path(data_dir: &Path) -> PathBuf {
    data_dir.join("cognizant.pid")
}

/// Client for the running daemon, or an error telling the user to start it
pub fn daemon_client(data_dir: &Path) -> Result<IpcClient> {
    let sock_path = socket_path(data_dir);
    if !sock_path.exists() {
        anyhow::bail!("Daemon is not running. Start it with: cognizant start");
    }
    Ok(IpcClient::new(&sock_path))
}

/// Send a request that the daemon answers with `Accepted`
pub async fn send_accepted(data_dir: &Path, request: IpcRequest) -> Result<()> {
    match daemon_client(data_dir)?.send_command(request).await? {
        IpcResponse::Accepted => Ok(()),
        IpcResponse::Error(e) => anyhow::bail!("Daemon refused request: {e}"),
        other => anyhow::bail!("Unexpected response from daemon: {other:?}"),
    }
}

/// Format whole seconds as HH:MM:SS
pub fn format_hms(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Safely truncate a string to a maximum number of characters (not bytes).
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(61), "00:01:01");
        assert_eq!(format_hms(3725), "01:02:05");
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("youtube.com", 20), "youtube.com");
        assert_eq!(truncate_str("subdomain.example.com", 9), "subdomain...");
    }

    #[test]
    fn test_truncate_str_unicode() {
        assert_eq!(truncate_str("\u{4f60}\u{597d}\u{4e16}\u{754c}", 2), "\u{4f60}\u{597d}...");
    }

    #[test]
    fn test_daemon_client_requires_socket() {
        let dir = tempfile::tempdir().unwrap();
        assert!(daemon_client(dir.path()).is_err());
    }
}
