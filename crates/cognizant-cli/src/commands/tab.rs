/// Browser bridge: tab lifecycle events and the continue control
use anyhow::Result;
use cognizant_core::{ipc::IpcRequest, TabId};
use std::path::Path;

use super::helpers::send_accepted;

pub fn activated(tab_id: TabId, url: Option<String>) -> IpcRequest {
    IpcRequest::TabActivated { tab_id, url }
}

pub fn navigated(tab_id: TabId, url: String) -> IpcRequest {
    IpcRequest::NavigationComplete { tab_id, url }
}

pub fn closed(tab_id: TabId) -> IpcRequest {
    IpcRequest::TabClosed { tab_id }
}

pub async fn send(data_dir: &Path, request: IpcRequest) -> Result<()> {
    log::debug!("Forwarding {request:?}");
    send_accepted(data_dir, request).await
}

pub async fn continue_command(data_dir: &Path) -> Result<()> {
    send_accepted(data_dir, IpcRequest::Continue).await?;
    println!("Timer restarted. Keep it mindful.");
    Ok(())
}
