use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::messages::{ObserverMessage, TabId};

/// Outcome of one reminder delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryResult {
    /// The observer displayed the reminder and replied
    Acknowledged,
    /// No observer answered in time
    NotReady,
    /// The observer went away while the request was in flight
    Unreachable,
}

/// Delivers reminder text to the observer running in a tab
#[async_trait]
pub trait ReminderChannel: Send + Sync {
    async fn deliver(&self, tab_id: TabId, text: String) -> DeliveryResult;
}

/// A reminder handed to an observer session, waiting for its acknowledgment
#[derive(Debug)]
pub struct PendingReminder {
    text: String,
    reply: oneshot::Sender<()>,
}

impl PendingReminder {
    /// The message to forward to the observer
    #[must_use]
    pub fn request(&self) -> ObserverMessage {
        ObserverMessage::ReminderRequest {
            text: self.text.clone(),
        }
    }

    /// Resolves when the deliverer gave up waiting for the ack
    pub async fn closed(&mut self) {
        self.reply.closed().await;
    }

    /// Complete the delivery. Dropping the reminder instead reports it unreachable.
    pub fn acknowledge(self) {
        // The deliverer may have timed out already
        let _ = self.reply.send(());
    }
}

/// Receiving end of one attached observer
#[derive(Debug)]
pub struct ObserverSession {
    pub tab_id: TabId,
    pub session_id: u64,
    pub reminders: mpsc::Receiver<PendingReminder>,
}

/// In-process reminder channel: one session per tab, newest attach wins
#[derive(Clone)]
pub struct ObserverHub {
    sessions: Arc<Mutex<HashMap<TabId, (u64, mpsc::Sender<PendingReminder>)>>>,
    next_session_id: Arc<AtomicU64>,
    ack_timeout: Duration,
}

impl ObserverHub {
    #[must_use]
    pub fn new(ack_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            next_session_id: Arc::new(AtomicU64::new(1)),
            ack_timeout,
        }
    }

    pub async fn attach(&self, tab_id: TabId) -> ObserverSession {
        let session_id = self.next_session_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(8);
        if self
            .sessions
            .lock()
            .await
            .insert(tab_id, (session_id, tx))
            .is_some()
        {
            log::debug!("Observer for tab {tab_id} replaced by session {session_id}");
        }
        ObserverSession {
            tab_id,
            session_id,
            reminders: rx,
        }
    }

    /// Remove a session. Returns false when a newer session already took the tab.
    pub async fn detach(&self, tab_id: TabId, session_id: u64) -> bool {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(&tab_id) {
            Some((current, _)) if *current == session_id => {
                sessions.remove(&tab_id);
                true
            }
            _ => false,
        }
    }

    #[cfg(test)]
    pub async fn is_attached(&self, tab_id: TabId) -> bool {
        self.sessions.lock().await.contains_key(&tab_id)
    }
}

#[async_trait]
impl ReminderChannel for ObserverHub {
    async fn deliver(&self, tab_id: TabId, text: String) -> DeliveryResult {
        let sender = self
            .sessions
            .lock()
            .await
            .get(&tab_id)
            .map(|(_, tx)| tx.clone());

        let Some(sender) = sender else {
            return DeliveryResult::NotReady;
        };

        let (reply, acked) = oneshot::channel();
        let exchange = async move {
            if sender.send(PendingReminder { text, reply }).await.is_err() {
                return DeliveryResult::Unreachable;
            }
            match acked.await {
                Ok(()) => DeliveryResult::Acknowledged,
                Err(_) => DeliveryResult::Unreachable,
            }
        };

        // A busy observer queue counts against the same deadline as the ack
        tokio::time::timeout(self.ack_timeout, exchange)
            .await
            .unwrap_or(DeliveryResult::NotReady)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deliver_without_session_is_not_ready() {
        let hub = ObserverHub::new(Duration::from_millis(50));
        assert_eq!(
            hub.deliver(1, "hi".to_string()).await,
            DeliveryResult::NotReady
        );
    }

    #[tokio::test]
    async fn test_deliver_acknowledged() {
        let hub = ObserverHub::new(Duration::from_secs(1));
        let mut session = hub.attach(1).await;

        let observer = tokio::spawn(async move {
            let pending = session.reminders.recv().await.unwrap();
            let request = pending.request();
            pending.acknowledge();
            request
        });

        assert_eq!(
            hub.deliver(1, "take a break".to_string()).await,
            DeliveryResult::Acknowledged
        );
        assert_eq!(
            observer.await.unwrap(),
            ObserverMessage::ReminderRequest {
                text: "take a break".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_deliver_to_dropped_session_is_unreachable() {
        let hub = ObserverHub::new(Duration::from_secs(1));
        let session = hub.attach(1).await;
        drop(session);
        assert_eq!(
            hub.deliver(1, "hi".to_string()).await,
            DeliveryResult::Unreachable
        );
    }

    #[tokio::test]
    async fn test_request_dropped_mid_flight_is_unreachable() {
        let hub = ObserverHub::new(Duration::from_secs(1));
        let mut session = hub.attach(1).await;
        tokio::spawn(async move {
            let pending = session.reminders.recv().await.unwrap();
            drop(pending);
        });
        assert_eq!(
            hub.deliver(1, "hi".to_string()).await,
            DeliveryResult::Unreachable
        );
    }

    #[tokio::test]
    async fn test_silent_observer_times_out_as_not_ready() {
        let hub = ObserverHub::new(Duration::from_millis(20));
        let mut session = hub.attach(1).await;
        let holder = tokio::spawn(async move {
            let pending = session.reminders.recv().await.unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
            pending.acknowledge();
        });
        assert_eq!(
            hub.deliver(1, "hi".to_string()).await,
            DeliveryResult::NotReady
        );
        holder.await.unwrap();
    }

    #[tokio::test]
    async fn test_pending_reminder_sees_timeout() {
        let hub = ObserverHub::new(Duration::from_millis(20));
        let mut session = hub.attach(1).await;
        let delivery = tokio::spawn({
            let hub = hub.clone();
            async move { hub.deliver(1, "hi".to_string()).await }
        });

        let mut pending = session.reminders.recv().await.unwrap();
        pending.closed().await;
        assert_eq!(delivery.await.unwrap(), DeliveryResult::NotReady);
    }

    #[tokio::test]
    async fn test_stale_detach_keeps_newer_session() {
        let hub = ObserverHub::new(Duration::from_secs(1));
        let first = hub.attach(1).await;
        let second = hub.attach(1).await;

        assert!(!hub.detach(1, first.session_id).await);
        assert!(hub.is_attached(1).await);
        assert!(hub.detach(1, second.session_id).await);
        assert!(!hub.is_attached(1).await);
    }
}
