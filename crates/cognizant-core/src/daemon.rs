use crate::{
    channel::{DeliveryResult, ObserverHub, ReminderChannel},
    config::DaemonConfig,
    domain_matcher::DomainMatcher,
    error::WatchError,
    ipc::{listen, DaemonIpcHandler},
    messages::{ObserverMessage, TabId, WatchEvent},
    readiness::ReadinessRegistry,
    reminder::reminder_text,
    tabs::TabRegistry,
    watch::{DwellWatch, ReminderDispatch, TickOutcome, WatchSnapshot},
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use cognizant_integrations::{LogCollaborator, LogServiceClient, UsageRecord};
use cognizant_storage::{Database, SessionGoal, UsageLog};
use serde::{Deserialize, Serialize};
use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::{
    sync::{mpsc, Mutex},
    time::{interval_at, Instant, Interval, MissedTickBehavior},
};

/// Status published for IPC clients after every event and tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    pub watch: WatchSnapshot,
    pub session_goal: SessionGoal,
    pub threshold_seconds: u32,
    pub watchlist: Vec<String>,
    pub started_at: DateTime<Utc>,
}

pub struct Daemon {
    database: Database,
    config: DaemonConfig,
    matcher: DomainMatcher,
    readiness: ReadinessRegistry,
    tabs: TabRegistry,
    watch: DwellWatch,
    session_goal: SessionGoal,
    threshold_seconds: u32,
    channel: Arc<dyn ReminderChannel>,
    log_service: Arc<dyn LogCollaborator>,
    events_tx: mpsc::UnboundedSender<WatchEvent>,
    events_rx: mpsc::UnboundedReceiver<WatchEvent>,
    ticker: Option<Interval>,
    armed_epoch: Option<u64>,
    status: Arc<Mutex<DaemonStatus>>,
    ipc_handler: Arc<DaemonIpcHandler>,
    shutdown_signal: Arc<AtomicBool>,
}

impl Daemon {
    /// Daemon wired to the real log service and an observer hub for IPC sessions
    ///
    /// # Errors
    ///
    /// Returns an error if settings cannot be read or the HTTP client cannot be built
    pub fn new(database: Database, config: DaemonConfig) -> Result<Self> {
        let hub = ObserverHub::new(config.ack_timeout());
        let log_service = LogServiceClient::new(Some(config.log_service_url.clone()))?;
        Self::with_collaborators(database, config, hub, Arc::new(log_service))
    }

    /// # Errors
    ///
    /// Returns an error if settings cannot be read from the database
    pub fn with_collaborators(
        database: Database,
        config: DaemonConfig,
        hub: ObserverHub,
        log_service: Arc<dyn LogCollaborator>,
    ) -> Result<Self> {
        let settings = database.get_settings()?;
        log::info!(
            "Loaded settings: threshold {}s, goal {}, {} watched sites",
            settings.reminder_threshold_seconds,
            settings.session_goal,
            settings.watchlist.len()
        );

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let shutdown_signal = Arc::new(AtomicBool::new(false));
        let matcher = DomainMatcher::new(settings.watchlist);
        let status = Arc::new(Mutex::new(DaemonStatus {
            watch: WatchSnapshot::idle(),
            session_goal: settings.session_goal,
            threshold_seconds: settings.reminder_threshold_seconds,
            watchlist: matcher.watchlist().to_vec(),
            started_at: Utc::now(),
        }));
        let ipc_handler = Arc::new(DaemonIpcHandler::new(
            events_tx.clone(),
            status.clone(),
            hub.clone(),
            shutdown_signal.clone(),
        ));

        Ok(Self {
            database,
            config,
            matcher,
            readiness: ReadinessRegistry::new(),
            tabs: TabRegistry::new(),
            watch: DwellWatch::new(),
            session_goal: settings.session_goal,
            threshold_seconds: settings.reminder_threshold_seconds.max(1),
            channel: Arc::new(hub),
            log_service,
            events_tx,
            events_rx,
            ticker: None,
            armed_epoch: None,
            status,
            ipc_handler,
            shutdown_signal,
        })
    }

    /// Sender for feeding events into the daemon
    #[must_use]
    pub fn events(&self) -> mpsc::UnboundedSender<WatchEvent> {
        self.events_tx.clone()
    }

    #[must_use]
    pub fn ipc_handler(&self) -> Arc<DaemonIpcHandler> {
        self.ipc_handler.clone()
    }

    #[must_use]
    pub const fn watch(&self) -> &DwellWatch {
        &self.watch
    }

    /// Whether a tick source is armed
    #[must_use]
    pub const fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    pub async fn run_with_signals(&mut self, sock_path: &Path) -> Result<()> {
        let ipc_handler = self.ipc_handler.clone();
        let sock_path = sock_path.to_path_buf();

        tokio::spawn(async move {
            if let Err(e) = listen(ipc_handler, &sock_path).await {
                log::error!("IPC listener failed: {e}");
            }
        });

        log::info!("Daemon started with signal handling and IPC");

        loop {
            tokio::select! {
                () = next_tick(&mut self.ticker) => {
                    self.on_tick(Utc::now()).await;
                }
                Some(event) = self.events_rx.recv() => {
                    self.handle_event(event, Utc::now()).await;
                }
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Received Ctrl-C, shutting down...");
                    self.shutdown_signal.store(true, Ordering::SeqCst);
                }
            }

            if self.shutdown_signal.load(Ordering::SeqCst) {
                break;
            }
        }

        if self.watch.cancel() {
            log::info!("Dropped active watch on shutdown");
        }
        log::info!("Daemon shut down gracefully.");
        Ok(())
    }

    /// Wait for the next queued event
    pub async fn next_event(&mut self) -> Option<WatchEvent> {
        self.events_rx.recv().await
    }

    pub async fn handle_event(&mut self, event: WatchEvent, now: DateTime<Utc>) {
        match event {
            WatchEvent::TabActivated { tab_id, url } => {
                if let Some(url) = url {
                    self.tabs.update(tab_id, url);
                }
                self.activate_tab(tab_id, now);
            }
            WatchEvent::NavigationComplete { tab_id, url } => {
                self.tabs.update(tab_id, url);
                self.activate_tab(tab_id, now);
            }
            WatchEvent::TabClosed { tab_id } => {
                self.tabs.remove(tab_id);
                self.readiness.revoke(tab_id);
                if self.watch.target().is_some_and(|t| t.tab_id == tab_id) {
                    log::info!("Watched tab {tab_id} closed");
                    self.watch.cancel();
                }
            }
            WatchEvent::Observer(message) => self.handle_observer_message(message, now),
            WatchEvent::ObserverDetached { tab_id } => self.readiness.revoke(tab_id),
            WatchEvent::DeliveryResolved { epoch, result } => {
                self.handle_delivery_result(epoch, result, now);
            }
            WatchEvent::WatchlistUpdated(watchlist) => self.matcher.replace(watchlist),
            WatchEvent::ThresholdUpdated(seconds) => {
                self.threshold_seconds = seconds.max(1);
                log::info!("Updated threshold: {} seconds", self.threshold_seconds);
                if self.watch.update_threshold(self.threshold_seconds, now) {
                    log::info!("Restarted watch with the new threshold");
                }
            }
            WatchEvent::SessionGoalUpdated(goal) => {
                self.session_goal = goal;
                log::info!("Updated session goal: {goal}");
            }
            WatchEvent::Shutdown => self.shutdown_signal.store(true, Ordering::SeqCst),
        }

        self.sync_ticker();
        self.publish_status(now).await;
    }

    pub async fn on_tick(&mut self, now: DateTime<Utc>) {
        let watched_tab = self.watch.target().map(|t| t.tab_id);

        match self.watch.tick(now, &self.tabs, &self.readiness) {
            TickOutcome::Deliver(dispatch) => self.dispatch_reminder(dispatch),
            TickOutcome::AwaitingObserver { .. } => {
                if let Some(tab_id) = watched_tab {
                    log::debug!("{}", WatchError::ObserverNotReady { tab_id });
                }
            }
            TickOutcome::Inactive
            | TickOutcome::Counting { .. }
            | TickOutcome::InFlight
            | TickOutcome::TabGone { .. } => {}
        }

        self.sync_ticker();
        self.publish_status(now).await;
    }

    fn activate_tab(&mut self, tab_id: TabId, now: DateTime<Utc>) {
        if let Some(url) = self.tabs.url(tab_id).map(str::to_string) {
            self.watch
                .activate(tab_id, &url, &self.matcher, self.threshold_seconds, now);
        } else {
            log::warn!("Tab {tab_id} activated with no known URL");
            self.watch.cancel();
        }
    }

    fn handle_observer_message(&mut self, message: ObserverMessage, now: DateTime<Utc>) {
        match message {
            ObserverMessage::ReadyNotice { tab_id } => self.readiness.mark_ready(tab_id),
            ObserverMessage::ContinueRequest => {
                self.watch.continue_watch(now);
            }
            ObserverMessage::ReminderAck | ObserverMessage::ReminderRequest { .. } => {
                log::warn!("Unexpected observer message outside a reminder: {message:?}");
            }
        }
    }

    fn handle_delivery_result(&mut self, epoch: u64, result: DeliveryResult, now: DateTime<Utc>) {
        let tab_id = self.watch.target().map(|t| t.tab_id);
        match (result, tab_id) {
            (DeliveryResult::NotReady, Some(tab_id)) => {
                log::warn!("{}, retrying on next tick", WatchError::ObserverNotReady { tab_id });
            }
            (DeliveryResult::Unreachable, Some(tab_id)) => {
                log::warn!("{}", WatchError::DeliveryUnreachable { tab_id });
            }
            _ => {}
        }

        if let Some(record) = self.watch.resolve_delivery(epoch, result, now) {
            self.emit_usage_record(record);
        }
    }

    fn dispatch_reminder(&self, dispatch: ReminderDispatch) {
        let text = reminder_text(&dispatch.domain, self.session_goal);
        let channel = self.channel.clone();
        let events = self.events_tx.clone();

        log::info!(
            "Sending reminder to tab {} after {}s on {}",
            dispatch.tab_id,
            dispatch.elapsed_seconds,
            dispatch.domain
        );

        tokio::spawn(async move {
            let result = channel.deliver(dispatch.tab_id, text).await;
            // The receiver only goes away when the daemon is shutting down
            let _ = events.send(WatchEvent::DeliveryResolved {
                epoch: dispatch.epoch,
                result,
            });
        });
    }

    fn emit_usage_record(&self, record: UsageRecord) {
        let local = UsageLog::new(
            record.domain.clone(),
            record.timestamp,
            record.duration_seconds,
        );
        if let Err(e) = self.database.insert_usage_log(&local) {
            log::warn!("Failed to store usage log locally: {e}");
        }

        let log_service = self.log_service.clone();
        tokio::spawn(async move {
            if let Err(e) = log_service.post_usage_record(&record).await {
                let err = WatchError::LogPostFailure {
                    domain: record.domain.clone(),
                    reason: format!("{e:#}"),
                };
                log::error!("{err}");
            }
        });
    }

    /// Keep exactly one tick source alive while a watch is active. A new
    /// epoch drops the old interval before the new one is armed.
    fn sync_ticker(&mut self) {
        if !self.watch.is_active() {
            self.ticker = None;
            self.armed_epoch = None;
            return;
        }

        let epoch = self.watch.epoch();
        if self.armed_epoch == Some(epoch) {
            return;
        }

        self.ticker = None;
        let period = self.config.tick_interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);
        self.armed_epoch = Some(epoch);
    }

    async fn publish_status(&self, now: DateTime<Utc>) {
        let mut status = self.status.lock().await;
        status.watch = self.watch.snapshot(now);
        status.session_goal = self.session_goal;
        status.threshold_seconds = self.threshold_seconds;
        status.watchlist = self.matcher.watchlist().to_vec();
    }
}

/// Resolves on the next tick, or never when no tick source is armed
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
