//! Dwell watch: the single active-tab timer with threshold reminder.
//!
//! Exactly one watch exists. Every (re)start bumps the epoch, which stands in
//! for "cancel the previous tick source": delivery outcomes that arrive for an
//! older epoch are dropped.

use chrono::{DateTime, Utc};
use cognizant_integrations::UsageRecord;
use serde::{Deserialize, Serialize};

use crate::channel::DeliveryResult;
use crate::domain_matcher::{extract_domain, DomainMatcher};
use crate::messages::TabId;
use crate::readiness::ReadinessRegistry;
use crate::tabs::TabRegistry;

/// What is being watched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchTarget {
    pub tab_id: TabId,
    pub domain: String,
    pub threshold_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Tracking {
        target: WatchTarget,
        started_at: DateTime<Utc>,
    },
    /// A reminder is in flight; ticks keep coming but do not re-deliver
    ReminderPending {
        target: WatchTarget,
        started_at: DateTime<Utc>,
        elapsed_at_crossing: u32,
    },
}

/// Request to send a reminder, produced when the threshold is crossed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderDispatch {
    pub epoch: u64,
    pub tab_id: TabId,
    pub domain: String,
    pub elapsed_seconds: u32,
}

/// Result of one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No watch; the tick source should not be running
    Inactive,
    Counting { elapsed_seconds: u32 },
    /// Threshold crossed but no observer yet; re-checked next tick
    AwaitingObserver { elapsed_seconds: u32 },
    Deliver(ReminderDispatch),
    InFlight,
    /// The watched tab is gone; the watch stopped without a record
    TabGone { tab_id: TabId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatchPhase {
    Idle,
    Tracking,
    ReminderPending,
}

/// Point-in-time view for status reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchSnapshot {
    pub phase: WatchPhase,
    pub target: Option<WatchTarget>,
    pub elapsed_seconds: u32,
}

impl WatchSnapshot {
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            phase: WatchPhase::Idle,
            target: None,
            elapsed_seconds: 0,
        }
    }
}

/// Whole seconds between `started_at` and `now`, rounded to nearest
#[must_use]
pub fn elapsed_seconds(started_at: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let millis = now
        .signed_duration_since(started_at)
        .num_milliseconds()
        .max(0);
    u32::try_from((millis + 500) / 1000).unwrap_or(u32::MAX)
}

#[derive(Debug)]
pub struct DwellWatch {
    state: WatchState,
    epoch: u64,
    /// Target of the last acknowledged reminder, so "continue" can resume it
    last_acknowledged: Option<WatchTarget>,
}

impl Default for DwellWatch {
    fn default() -> Self {
        Self::new()
    }
}

impl DwellWatch {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: WatchState::Idle,
            epoch: 0,
            last_acknowledged: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &WatchState {
        &self.state
    }

    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Whether a tick source should be alive
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self.state, WatchState::Idle)
    }

    #[must_use]
    pub fn target(&self) -> Option<&WatchTarget> {
        match &self.state {
            WatchState::Idle => None,
            WatchState::Tracking { target, .. } | WatchState::ReminderPending { target, .. } => {
                Some(target)
            }
        }
    }

    #[must_use]
    pub fn snapshot(&self, now: DateTime<Utc>) -> WatchSnapshot {
        match &self.state {
            WatchState::Idle => WatchSnapshot::idle(),
            WatchState::Tracking { target, started_at } => WatchSnapshot {
                phase: WatchPhase::Tracking,
                target: Some(target.clone()),
                elapsed_seconds: elapsed_seconds(*started_at, now),
            },
            WatchState::ReminderPending {
                target,
                elapsed_at_crossing,
                ..
            } => WatchSnapshot {
                phase: WatchPhase::ReminderPending,
                target: Some(target.clone()),
                elapsed_seconds: *elapsed_at_crossing,
            },
        }
    }

    fn start(&mut self, target: WatchTarget, now: DateTime<Utc>) {
        self.epoch += 1;
        self.state = WatchState::Tracking {
            target,
            started_at: now,
        };
    }

    /// A tab became active or finished navigating. Whatever was running is
    /// cancelled; the tab is then watched only if its host is on the list.
    pub fn activate(
        &mut self,
        tab_id: TabId,
        url: &str,
        matcher: &DomainMatcher,
        threshold_seconds: u32,
        now: DateTime<Utc>,
    ) -> bool {
        self.cancel();
        self.last_acknowledged = None;

        let domain = extract_domain(url);
        if !matcher.matches_domain(&domain) {
            log::debug!("Tab {tab_id} ({domain:?}) is not watched");
            return false;
        }

        log::info!("Watching tab {tab_id} on {domain} (threshold {threshold_seconds}s)");
        self.start(
            WatchTarget {
                tab_id,
                domain,
                threshold_seconds: threshold_seconds.max(1),
            },
            now,
        );
        true
    }

    /// Stop the current watch without emitting anything
    pub fn cancel(&mut self) -> bool {
        let was_active = self.is_active();
        self.epoch += 1;
        self.state = WatchState::Idle;
        was_active
    }

    pub fn tick(
        &mut self,
        now: DateTime<Utc>,
        tabs: &TabRegistry,
        readiness: &ReadinessRegistry,
    ) -> TickOutcome {
        let (target, started_at) = match &self.state {
            WatchState::Idle => return TickOutcome::Inactive,
            WatchState::ReminderPending { .. } => return TickOutcome::InFlight,
            WatchState::Tracking { target, started_at } => (target, *started_at),
        };

        if !tabs.contains(target.tab_id) {
            let tab_id = target.tab_id;
            log::info!("Tab {tab_id} is gone, stopping watch");
            self.cancel();
            return TickOutcome::TabGone { tab_id };
        }

        let elapsed = elapsed_seconds(started_at, now);
        log::debug!("Time spent on {}: {elapsed} seconds", target.domain);

        if elapsed < target.threshold_seconds {
            return TickOutcome::Counting {
                elapsed_seconds: elapsed,
            };
        }

        if !readiness.is_ready(target.tab_id) {
            return TickOutcome::AwaitingObserver {
                elapsed_seconds: elapsed,
            };
        }

        let target = target.clone();
        let dispatch = ReminderDispatch {
            epoch: self.epoch,
            tab_id: target.tab_id,
            domain: target.domain.clone(),
            elapsed_seconds: elapsed,
        };
        self.state = WatchState::ReminderPending {
            target,
            started_at,
            elapsed_at_crossing: elapsed,
        };
        TickOutcome::Deliver(dispatch)
    }

    /// Apply the outcome of a delivery started at `epoch`.
    ///
    /// Returns the usage record to emit when the reminder was acknowledged.
    pub fn resolve_delivery(
        &mut self,
        epoch: u64,
        result: DeliveryResult,
        now: DateTime<Utc>,
    ) -> Option<UsageRecord> {
        if epoch != self.epoch {
            log::debug!("Ignoring delivery result for stale watch {epoch}");
            return None;
        }

        let (target, started_at, elapsed_at_crossing) =
            match std::mem::replace(&mut self.state, WatchState::Idle) {
                WatchState::ReminderPending {
                    target,
                    started_at,
                    elapsed_at_crossing,
                } => (target, started_at, elapsed_at_crossing),
                other => {
                    self.state = other;
                    return None;
                }
            };

        if result == DeliveryResult::Acknowledged {
            log::info!(
                "Reminder acknowledged on {} after {elapsed_at_crossing}s",
                target.domain
            );
            let record = UsageRecord::new(target.domain.clone(), now, elapsed_at_crossing);
            self.epoch += 1;
            self.last_acknowledged = Some(target);
            Some(record)
        } else {
            // Keep the start time; the next tick re-checks readiness
            self.state = WatchState::Tracking { target, started_at };
            None
        }
    }

    /// The user chose to keep browsing: restart the clock for the same tab
    /// and threshold. A second continue before the next crossing only resets
    /// the clock again.
    pub fn continue_watch(&mut self, now: DateTime<Utc>) -> bool {
        let target = match std::mem::replace(&mut self.state, WatchState::Idle) {
            WatchState::Tracking { target, .. } | WatchState::ReminderPending { target, .. } => {
                target
            }
            WatchState::Idle => match self.last_acknowledged.take() {
                Some(target) => target,
                None => {
                    log::debug!("Continue requested with nothing to resume");
                    return false;
                }
            },
        };

        log::info!("Restarting timer on {} after user chose to continue", target.domain);
        self.start(target, now);
        true
    }

    /// New threshold: restart the current watch (same tab) from zero
    pub fn update_threshold(&mut self, threshold_seconds: u32, now: DateTime<Utc>) -> bool {
        let Some(mut target) = self.target().cloned() else {
            return false;
        };
        target.threshold_seconds = threshold_seconds.max(1);
        self.start(target, now);
        true
    }
}
