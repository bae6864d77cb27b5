/// Daemon lifecycle management commands
use anyhow::Result;
use cognizant_core::{
    config::DaemonConfig,
    ipc::{IpcClient, IpcRequest, IpcResponse},
    watch::WatchPhase,
    Daemon, DaemonStatus,
};
use cognizant_storage::Database;
use std::{env, fs, io, path::Path, process::Command, time::Duration};
use sysinfo::{Pid, System};

use super::helpers::{format_hms, pid_path, socket_path};

fn process_alive(pid: usize) -> bool {
    let mut sys = System::new();
    sys.refresh_process(Pid::from(pid))
}

pub fn start_daemon(data_dir: &Path) -> Result<()> {
    let pid_file_path = pid_path(data_dir);
    let sock_path = socket_path(data_dir);

    if pid_file_path.exists() {
        if let Ok(pid_str) = fs::read_to_string(&pid_file_path) {
            if let Ok(pid) = pid_str.trim().parse::<usize>() {
                if process_alive(pid) {
                    log::info!("Daemon is already running (PID: {pid}).");
                    return Ok(());
                }
            }
        }
        log::warn!("Removing stale PID file.");
        let _ = fs::remove_file(&pid_file_path);
    }

    if sock_path.exists() {
        log::warn!("Removing stale socket file.");
        fs::remove_file(&sock_path)?;
    }

    fs::create_dir_all(data_dir)?;
    log::info!("Starting Cognizant daemon...");

    let child = Command::new(env::current_exe()?)
        .arg("daemon-internal-start")
        .current_dir(env::current_dir()?)
        .spawn()?;

    log::info!("Daemon process started with PID: {}", child.id());
    fs::write(&pid_file_path, child.id().to_string())?;

    Ok(())
}

/// Entry point of the detached daemon process
pub async fn run_daemon_process(data_dir: &Path) -> Result<()> {
    setup_daemon_logging(data_dir)?;
    log::info!("Daemon process started internally.");

    if let Err(e) = daemon_main_logic(data_dir).await {
        log::error!("Daemon main logic exited with a fatal error: {e:#}");
        return Err(e);
    }

    Ok(())
}

async fn daemon_main_logic(data_dir: &Path) -> Result<()> {
    let config = DaemonConfig::load_default()?;
    log::info!(
        "Log service at {}, tick every {}ms",
        config.log_service_url,
        config.tick_interval_ms
    );
    let db = Database::new(None)?;
    let mut daemon = Daemon::new(db, config)?;
    daemon.run_with_signals(&socket_path(data_dir)).await
}

pub async fn stop_daemon(data_dir: &Path) -> Result<()> {
    let pid_file_path = pid_path(data_dir);
    let sock_path = socket_path(data_dir);

    if !pid_file_path.exists() {
        log::info!("Daemon is not running (no PID file).");
        if sock_path.exists() {
            fs::remove_file(&sock_path)?;
        }
        return Ok(());
    }

    let pid = fs::read_to_string(&pid_file_path)?
        .trim()
        .parse::<usize>()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    log::info!("Stopping Cognizant daemon (PID: {pid})...");
    let client = IpcClient::new(&sock_path);

    match client.send_command(IpcRequest::Shutdown).await {
        Ok(IpcResponse::Shutdown) => {
            log::info!("Daemon shutdown signal sent. Waiting for process to exit...");
            tokio::time::sleep(Duration::from_secs(2)).await;
            if process_alive(pid) {
                log::warn!("Daemon did not stop gracefully. Force killing...");
                kill(pid);
            } else {
                log::info!("Daemon stopped successfully.");
            }
        }
        Ok(resp) => log::error!("Received unexpected response from daemon: {resp:?}"),
        Err(e) => {
            log::error!("Failed to send shutdown command: {e}. Forcing cleanup.");
            kill(pid);
        }
    }

    fs::remove_file(&pid_file_path)?;
    if sock_path.exists() {
        fs::remove_file(&sock_path)?;
    }

    Ok(())
}

fn kill(pid: usize) {
    let mut sys = System::new();
    if sys.refresh_process(Pid::from(pid)) {
        if let Some(process) = sys.process(Pid::from(pid)) {
            process.kill();
            log::info!("Process killed.");
        }
    }
}

pub async fn show_status(data_dir: &Path) -> Result<()> {
    let sock_path = socket_path(data_dir);

    if !sock_path.exists() {
        println!("Daemon Status: Not running");
        return Ok(());
    }

    let client = IpcClient::new(&sock_path);
    match client.send_command(IpcRequest::Status).await {
        Ok(IpcResponse::Status(status)) => print_status(&status),
        Ok(_) => anyhow::bail!("Unexpected response from daemon"),
        Err(e) => {
            log::error!("Failed to get status: {e}");
            println!("Daemon Status: Not running (or not responding)");
        }
    }
    Ok(())
}

fn print_status(status: &DaemonStatus) {
    println!("Daemon Status: Running");
    let uptime = chrono::Utc::now()
        .signed_duration_since(status.started_at)
        .num_seconds();
    println!("Uptime: {}", format_hms(u64::try_from(uptime).unwrap_or(0)));

    println!("\nCurrent Watch:");
    match (&status.watch.phase, &status.watch.target) {
        (WatchPhase::Idle, _) | (_, None) => println!("  Idle"),
        (phase, Some(target)) => {
            let label = if *phase == WatchPhase::ReminderPending {
                "reminder pending"
            } else {
                "tracking"
            };
            println!("  Tab {} on {} ({label})", target.tab_id, target.domain);
            println!(
                "  Elapsed: {} / {}s",
                format_hms(u64::from(status.watch.elapsed_seconds)),
                target.threshold_seconds
            );
        }
    }

    println!("\nSettings:");
    println!("  Threshold: {}s", status.threshold_seconds);
    println!("  Goal: {}", status.session_goal);
    println!("  Watchlist: {}", status.watchlist.join(", "));
}

fn setup_daemon_logging(data_dir: &Path) -> Result<()> {
    use std::fs::{create_dir_all, OpenOptions};

    create_dir_all(data_dir)?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_dir.join("cognizant.log"))?;

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter_level(log::LevelFilter::Debug)
        .init();

    Ok(())
}
