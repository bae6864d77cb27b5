//! Messages exchanged between the browser, in-page observers and the daemon.

use cognizant_storage::SessionGoal;
use serde::{Deserialize, Serialize};

use crate::channel::DeliveryResult;

/// Browser tab handle
pub type TabId = u32;

/// Messages on an observer session. The daemon only ever sends
/// `ReminderRequest`; observers send the other three.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObserverMessage {
    /// Sent once when the observer initializes in a tab
    ReadyNotice { tab_id: TabId },
    /// Ask the observer to show a reminder
    ReminderRequest { text: String },
    /// Reply to a `ReminderRequest` once the reminder is displayed
    ReminderAck,
    /// The user chose to keep browsing; restart the clock
    ContinueRequest,
}

/// Inbound events for the daemon actor
#[derive(Debug, Clone)]
pub enum WatchEvent {
    TabActivated { tab_id: TabId, url: Option<String> },
    NavigationComplete { tab_id: TabId, url: String },
    TabClosed { tab_id: TabId },
    Observer(ObserverMessage),
    ObserverDetached { tab_id: TabId },
    DeliveryResolved { epoch: u64, result: DeliveryResult },
    WatchlistUpdated(Vec<String>),
    ThresholdUpdated(u32),
    SessionGoalUpdated(SessionGoal),
    Shutdown,
}
