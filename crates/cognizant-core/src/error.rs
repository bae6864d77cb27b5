use thiserror::Error;

use crate::messages::TabId;

/// Failure kinds of the dwell watch. None of them is fatal: each one is
/// logged and the watch recovers on the next tick or tab event.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("malformed url {url:?}: {reason}")]
    MalformedUrl { url: String, reason: String },

    #[error("observer for tab {tab_id} is not ready")]
    ObserverNotReady { tab_id: TabId },

    #[error("reminder for tab {tab_id} could not be delivered")]
    DeliveryUnreachable { tab_id: TabId },

    #[error("failed to post usage log for {domain}: {reason}")]
    LogPostFailure { domain: String, reason: String },
}
