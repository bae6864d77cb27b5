//! Terminal observer: stands in for the in-page script of one tab.
//!
//! Announces readiness, prints each reminder and acknowledges it right away,
//! and sends a continue request when the user types `c`.

use anyhow::Result;
use cognizant_core::{ObserverMessage, TabId};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::helpers::daemon_client;

pub async fn observe_command(data_dir: &Path, tab_id: TabId, auto_continue: bool) -> Result<()> {
    let mut observer = daemon_client(data_dir)?.attach(tab_id).await?;
    observer
        .send(&ObserverMessage::ReadyNotice { tab_id })
        .await?;
    log::info!(
        "Observing tab {tab_id} (session {})",
        observer.session_id
    );
    println!("Observing tab {tab_id}. Type 'c' and Enter to keep browsing after a reminder.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            message = observer.next_message() => match message {
                Some(ObserverMessage::ReminderRequest { text }) => {
                    print_reminder(&text);
                    observer.send(&ObserverMessage::ReminderAck).await?;
                    if auto_continue {
                        observer.send(&ObserverMessage::ContinueRequest).await?;
                    }
                }
                Some(other) => log::debug!("Ignoring {other:?} from daemon"),
                None => {
                    println!("Daemon closed the session.");
                    break;
                }
            },
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) if is_continue(&line) => {
                    observer.send(&ObserverMessage::ContinueRequest).await?;
                    println!("Timer restarted.");
                }
                Some(_) => {}
                None => stdin_open = false,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

fn is_continue(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "c" | "continue")
}

fn print_reminder(text: &str) {
    let rule = "-".repeat(text.len().min(72));
    println!("\n{rule}\n{text}\n{rule}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_continue() {
        assert!(is_continue("c"));
        assert!(is_continue(" Continue \n"));
        assert!(!is_continue("close"));
        assert!(!is_continue(""));
    }
}
