use anyhow::{bail, Result};
use cognizant_storage::SessionGoal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::{
        unix::{OwnedReadHalf, OwnedWriteHalf},
        UnixListener, UnixStream,
    },
    sync::{mpsc, Mutex},
};

use crate::{
    channel::{ObserverHub, PendingReminder},
    daemon::DaemonStatus,
    messages::{ObserverMessage, TabId, WatchEvent},
};

/// Largest frame either side will accept
const MAX_FRAME_LEN: u32 = 1024 * 1024;

/// IPC request from CLI to daemon
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum IpcRequest {
    Status,
    Shutdown,
    TabActivated { tab_id: TabId, url: Option<String> },
    NavigationComplete { tab_id: TabId, url: String },
    TabClosed { tab_id: TabId },
    Continue,
    UpdateWatchlist(Vec<String>),
    UpdateThreshold(u32),
    UpdateSessionGoal(SessionGoal),
    /// Turn this connection into the observer session for a tab
    Attach { tab_id: TabId },
}

/// IPC response from daemon to CLI
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum IpcResponse {
    Status(DaemonStatus),
    Accepted,
    Shutdown,
    Attached { session_id: u64 },
    Error(String),
}

/// Write one length-prefixed bincode frame
///
/// # Errors
///
/// Returns an error if encoding fails, the frame is too large or the write fails
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let encoded = bincode::serialize(value)?;
    let len = u32::try_from(encoded.len())?;
    if len > MAX_FRAME_LEN {
        bail!("Frame of {len} bytes exceeds limit");
    }
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&encoded).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed bincode frame
///
/// # Errors
///
/// Returns an error on EOF, an oversized length prefix or undecodable payload
pub async fn read_frame<R, T>(reader: &mut R) -> Result<T>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        bail!("Frame of {len} bytes exceeds limit");
    }

    let mut payload = vec![0u8; usize::try_from(len)?];
    reader.read_exact(&mut payload).await?;
    Ok(bincode::deserialize(&payload)?)
}

/// Move frame reads onto their own task so callers can select on a channel
fn spawn_frame_reader(mut reader: OwnedReadHalf) -> mpsc::Receiver<ObserverMessage> {
    let (tx, rx) = mpsc::channel(8);
    tokio::spawn(async move {
        loop {
            match read_frame::<_, ObserverMessage>(&mut reader).await {
                Ok(message) => {
                    if tx.send(message).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::debug!("Observer stream closed: {e}");
                    break;
                }
            }
        }
    });
    rx
}

#[derive(Debug)]
pub struct IpcClient {
    sock_path: PathBuf,
}

impl IpcClient {
    #[must_use]
    pub fn new(sock_path: &Path) -> Self {
        Self {
            sock_path: sock_path.to_path_buf(),
        }
    }

    pub async fn send_command(&self, request: IpcRequest) -> Result<IpcResponse> {
        let mut stream = UnixStream::connect(&self.sock_path).await?;
        write_frame(&mut stream, &request).await?;
        read_frame(&mut stream).await
    }

    /// Open an observer session for `tab_id`
    pub async fn attach(&self, tab_id: TabId) -> Result<ObserverConnection> {
        let mut stream = UnixStream::connect(&self.sock_path).await?;
        write_frame(&mut stream, &IpcRequest::Attach { tab_id }).await?;

        let session_id = match read_frame(&mut stream).await? {
            IpcResponse::Attached { session_id } => session_id,
            IpcResponse::Error(e) => bail!("Attach refused: {e}"),
            other => bail!("Unexpected attach response: {other:?}"),
        };

        let (reader, writer) = stream.into_split();
        Ok(ObserverConnection {
            tab_id,
            session_id,
            inbound: spawn_frame_reader(reader),
            writer,
        })
    }
}

/// Client side of an observer session
#[derive(Debug)]
pub struct ObserverConnection {
    pub tab_id: TabId,
    pub session_id: u64,
    inbound: mpsc::Receiver<ObserverMessage>,
    writer: OwnedWriteHalf,
}

impl ObserverConnection {
    /// Next message from the daemon, or `None` once it hangs up
    pub async fn next_message(&mut self) -> Option<ObserverMessage> {
        self.inbound.recv().await
    }

    pub async fn send(&mut self, message: &ObserverMessage) -> Result<()> {
        write_frame(&mut self.writer, message).await
    }
}

pub struct DaemonIpcHandler {
    events: mpsc::UnboundedSender<WatchEvent>,
    status: Arc<Mutex<DaemonStatus>>,
    hub: ObserverHub,
    shutdown_signal: Arc<AtomicBool>,
}

impl DaemonIpcHandler {
    #[must_use]
    pub fn new(
        events: mpsc::UnboundedSender<WatchEvent>,
        status: Arc<Mutex<DaemonStatus>>,
        hub: ObserverHub,
        shutdown_signal: Arc<AtomicBool>,
    ) -> Self {
        Self {
            events,
            status,
            hub,
            shutdown_signal,
        }
    }

    pub async fn status(&self) -> DaemonStatus {
        self.status.lock().await.clone()
    }

    fn forward(&self, event: WatchEvent) -> IpcResponse {
        match self.events.send(event) {
            Ok(()) => IpcResponse::Accepted,
            Err(_) => IpcResponse::Error("daemon is shutting down".to_string()),
        }
    }

    pub async fn handle(&self, mut stream: UnixStream, request: IpcRequest) -> Result<()> {
        let response = match request {
            IpcRequest::Status => IpcResponse::Status(self.status().await),
            IpcRequest::Shutdown => {
                self.shutdown_signal.store(true, Ordering::SeqCst);
                // Wake the event loop even when no tick source is armed
                let _ = self.events.send(WatchEvent::Shutdown);
                IpcResponse::Shutdown
            }
            IpcRequest::TabActivated { tab_id, url } => {
                self.forward(WatchEvent::TabActivated { tab_id, url })
            }
            IpcRequest::NavigationComplete { tab_id, url } => {
                self.forward(WatchEvent::NavigationComplete { tab_id, url })
            }
            IpcRequest::TabClosed { tab_id } => self.forward(WatchEvent::TabClosed { tab_id }),
            IpcRequest::Continue => {
                self.forward(WatchEvent::Observer(ObserverMessage::ContinueRequest))
            }
            IpcRequest::UpdateWatchlist(watchlist) => {
                self.forward(WatchEvent::WatchlistUpdated(watchlist))
            }
            IpcRequest::UpdateThreshold(seconds) => {
                self.forward(WatchEvent::ThresholdUpdated(seconds))
            }
            IpcRequest::UpdateSessionGoal(goal) => {
                self.forward(WatchEvent::SessionGoalUpdated(goal))
            }
            IpcRequest::Attach { tab_id } => return self.run_observer_session(stream, tab_id).await,
        };

        write_frame(&mut stream, &response).await
    }

    fn on_observer_message(
        &self,
        tab_id: TabId,
        message: ObserverMessage,
        pending: &mut Option<PendingReminder>,
    ) {
        match message {
            ObserverMessage::ReminderAck => match pending.take() {
                Some(reminder) => reminder.acknowledge(),
                None => log::debug!("Ack from tab {tab_id} with no reminder pending"),
            },
            ObserverMessage::ReadyNotice { .. } => {
                let _ = self
                    .events
                    .send(WatchEvent::Observer(ObserverMessage::ReadyNotice { tab_id }));
            }
            ObserverMessage::ContinueRequest => {
                let _ = self
                    .events
                    .send(WatchEvent::Observer(ObserverMessage::ContinueRequest));
            }
            ObserverMessage::ReminderRequest { .. } => {
                log::warn!("Observer for tab {tab_id} sent a reminder request");
            }
        }
    }

    /// Relay reminders to an attached observer until it disconnects
    async fn run_observer_session(&self, mut stream: UnixStream, tab_id: TabId) -> Result<()> {
        let mut session = self.hub.attach(tab_id).await;
        let session_id = session.session_id;
        log::info!("Observer session {session_id} attached to tab {tab_id}");

        let result = async move {
            write_frame(&mut stream, &IpcResponse::Attached { session_id }).await?;
            let (reader, mut writer) = stream.into_split();
            let mut inbound = spawn_frame_reader(reader);
            let mut pending: Option<PendingReminder> = None;

            loop {
                tokio::select! {
                    Some(reminder) = session.reminders.recv(), if pending.is_none() => {
                        write_frame(&mut writer, &reminder.request()).await?;
                        pending = Some(reminder);
                    }
                    () = reply_dropped(&mut pending) => {
                        log::debug!("Reminder for tab {tab_id} expired before its ack");
                        pending = None;
                    }
                    message = inbound.recv() => match message {
                        Some(message) => self.on_observer_message(tab_id, message, &mut pending),
                        None => break,
                    },
                }
            }
            Ok::<(), anyhow::Error>(())
        }
        .await;

        if self.hub.detach(tab_id, session_id).await {
            let _ = self.events.send(WatchEvent::ObserverDetached { tab_id });
            log::info!("Observer session {session_id} for tab {tab_id} detached");
        } else {
            log::debug!("Replaced observer session {session_id} for tab {tab_id} closed");
        }
        result
    }
}

/// Resolves once the deliverer of the pending reminder stopped waiting
async fn reply_dropped(pending: &mut Option<PendingReminder>) {
    match pending {
        Some(reminder) => reminder.closed().await,
        None => std::future::pending::<()>().await,
    }
}

/// Bind the daemon socket, replacing a stale one
///
/// # Errors
///
/// Returns an error if the old socket cannot be removed or the bind fails
pub fn bind(sock_path: &Path) -> io::Result<UnixListener> {
    if sock_path.exists() {
        fs::remove_file(sock_path)?;
    }
    UnixListener::bind(sock_path)
}

pub async fn serve(handler: Arc<DaemonIpcHandler>, listener: UnixListener) {
    loop {
        match listener.accept().await {
            Ok((mut stream, _)) => {
                let handler = handler.clone();
                tokio::spawn(async move {
                    match read_frame::<_, IpcRequest>(&mut stream).await {
                        Ok(request) => {
                            if let Err(e) = handler.handle(stream, request).await {
                                log::error!("IPC handle error: {e}");
                            }
                        }
                        Err(e) => log::error!("IPC read error: {e}"),
                    }
                });
            }
            Err(e) => {
                log::error!("IPC accept error: {e}");
            }
        }
    }
}

pub async fn listen(handler: Arc<DaemonIpcHandler>, sock_path: &Path) -> io::Result<()> {
    let listener = bind(sock_path)?;
    serve(handler, listener).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        channel::{DeliveryResult, ReminderChannel},
        watch::WatchSnapshot,
    };
    use chrono::Utc;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        client: IpcClient,
        events: mpsc::UnboundedReceiver<WatchEvent>,
        hub: ObserverHub,
        shutdown: Arc<AtomicBool>,
    }

    fn fixture() -> Fixture {
        fixture_with_ack_timeout(Duration::from_secs(2))
    }

    fn fixture_with_ack_timeout(ack_timeout: Duration) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let sock_path = dir.path().join("cognizant.sock");
        let (tx, events) = mpsc::unbounded_channel();
        let hub = ObserverHub::new(ack_timeout);
        let shutdown = Arc::new(AtomicBool::new(false));
        let status = Arc::new(Mutex::new(DaemonStatus {
            watch: WatchSnapshot::idle(),
            session_goal: SessionGoal::Relax,
            threshold_seconds: 42,
            watchlist: vec!["example.com".to_string()],
            started_at: Utc::now(),
        }));
        let handler = Arc::new(DaemonIpcHandler::new(
            tx,
            status,
            hub.clone(),
            shutdown.clone(),
        ));

        let listener = bind(&sock_path).unwrap();
        tokio::spawn(serve(handler, listener));

        Fixture {
            _dir: dir,
            client: IpcClient::new(&sock_path),
            events,
            hub,
            shutdown,
        }
    }

    #[tokio::test]
    async fn test_frame_rejects_oversized_length() {
        let mut bytes: &[u8] = &[0xff, 0xff, 0xff, 0xff];
        assert!(read_frame::<_, IpcRequest>(&mut bytes).await.is_err());
    }

    #[tokio::test]
    async fn test_frame_truncated_payload_is_error() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &IpcRequest::Status).await.unwrap();
        buf.truncate(buf.len() - 1);
        let mut bytes: &[u8] = &buf;
        assert!(read_frame::<_, IpcRequest>(&mut bytes).await.is_err());
    }

    #[tokio::test]
    async fn test_status_request() {
        let f = fixture();
        match f.client.send_command(IpcRequest::Status).await.unwrap() {
            IpcResponse::Status(status) => {
                assert_eq!(status.threshold_seconds, 42);
                assert_eq!(status.session_goal, SessionGoal::Relax);
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tab_events_are_forwarded() {
        let mut f = fixture();
        let response = f
            .client
            .send_command(IpcRequest::NavigationComplete {
                tab_id: 3,
                url: "https://example.com/".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(response, IpcResponse::Accepted));

        match f.events.recv().await.unwrap() {
            WatchEvent::NavigationComplete { tab_id, url } => {
                assert_eq!(tab_id, 3);
                assert_eq!(url, "https://example.com/");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_shutdown_sets_signal_and_wakes_loop() {
        let mut f = fixture();
        let response = f.client.send_command(IpcRequest::Shutdown).await.unwrap();
        assert!(matches!(response, IpcResponse::Shutdown));
        assert!(f.shutdown.load(Ordering::SeqCst));
        assert!(matches!(f.events.recv().await, Some(WatchEvent::Shutdown)));
    }

    #[tokio::test]
    async fn test_observer_session_round_trip() {
        let mut f = fixture();
        let mut observer = f.client.attach(7).await.unwrap();
        observer
            .send(&ObserverMessage::ReadyNotice { tab_id: 7 })
            .await
            .unwrap();
        assert!(matches!(
            f.events.recv().await,
            Some(WatchEvent::Observer(ObserverMessage::ReadyNotice { tab_id: 7 }))
        ));

        let hub = f.hub.clone();
        let delivery =
            tokio::spawn(async move { hub.deliver(7, "Time for a break".to_string()).await });

        match observer.next_message().await {
            Some(ObserverMessage::ReminderRequest { text }) => {
                assert_eq!(text, "Time for a break");
            }
            other => panic!("unexpected message {other:?}"),
        }
        observer.send(&ObserverMessage::ReminderAck).await.unwrap();
        assert_eq!(delivery.await.unwrap(), DeliveryResult::Acknowledged);

        observer
            .send(&ObserverMessage::ContinueRequest)
            .await
            .unwrap();
        assert!(matches!(
            f.events.recv().await,
            Some(WatchEvent::Observer(ObserverMessage::ContinueRequest))
        ));

        drop(observer);
        assert!(matches!(
            f.events.recv().await,
            Some(WatchEvent::ObserverDetached { tab_id: 7 })
        ));
        assert!(!f.hub.is_attached(7).await);
    }

    #[tokio::test]
    async fn test_ready_notice_uses_session_tab() {
        let mut f = fixture();
        let mut observer = f.client.attach(4).await.unwrap();
        observer
            .send(&ObserverMessage::ReadyNotice { tab_id: 99 })
            .await
            .unwrap();
        assert!(matches!(
            f.events.recv().await,
            Some(WatchEvent::Observer(ObserverMessage::ReadyNotice { tab_id: 4 }))
        ));
    }

    #[tokio::test]
    async fn test_replaced_session_closing_keeps_readiness() {
        let mut f = fixture();
        let older = f.client.attach(7).await.unwrap();
        let mut newer = f.client.attach(7).await.unwrap();
        assert_ne!(older.session_id, newer.session_id);

        newer
            .send(&ObserverMessage::ReadyNotice { tab_id: 7 })
            .await
            .unwrap();
        assert!(matches!(
            f.events.recv().await,
            Some(WatchEvent::Observer(ObserverMessage::ReadyNotice { tab_id: 7 }))
        ));

        drop(older);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(f.events.try_recv().is_err());
        assert!(f.hub.is_attached(7).await);

        drop(newer);
        assert!(matches!(
            f.events.recv().await,
            Some(WatchEvent::ObserverDetached { tab_id: 7 })
        ));
    }

    #[tokio::test]
    async fn test_missed_ack_does_not_block_next_reminder() {
        let f = fixture_with_ack_timeout(Duration::from_millis(100));
        let mut observer = f.client.attach(5).await.unwrap();

        let hub = f.hub.clone();
        let first = tokio::spawn(async move { hub.deliver(5, "first".to_string()).await });
        assert_eq!(
            observer.next_message().await,
            Some(ObserverMessage::ReminderRequest {
                text: "first".to_string()
            })
        );
        assert_eq!(first.await.unwrap(), DeliveryResult::NotReady);

        let hub = f.hub.clone();
        let second = tokio::spawn(async move { hub.deliver(5, "second".to_string()).await });
        assert_eq!(
            observer.next_message().await,
            Some(ObserverMessage::ReminderRequest {
                text: "second".to_string()
            })
        );
        observer.send(&ObserverMessage::ReminderAck).await.unwrap();
        assert_eq!(second.await.unwrap(), DeliveryResult::Acknowledged);
    }
}
