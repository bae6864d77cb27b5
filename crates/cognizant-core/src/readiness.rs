use std::collections::HashSet;

use crate::messages::TabId;

/// Tabs whose observer has announced itself and can take a reminder
#[derive(Debug, Default)]
pub struct ReadinessRegistry {
    ready: HashSet<TabId>,
}

impl ReadinessRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_ready(&mut self, tab_id: TabId) {
        if self.ready.insert(tab_id) {
            log::info!("Observer is ready for tab: {tab_id}");
        }
    }

    #[must_use]
    pub fn is_ready(&self, tab_id: TabId) -> bool {
        self.ready.contains(&tab_id)
    }

    /// Forget a tab whose observer went away (tab closed, session dropped)
    pub fn revoke(&mut self, tab_id: TabId) {
        if self.ready.remove(&tab_id) {
            log::debug!("Observer readiness revoked for tab: {tab_id}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_tab_is_not_ready() {
        let registry = ReadinessRegistry::new();
        assert!(!registry.is_ready(7));
    }

    #[test]
    fn test_mark_ready_is_idempotent() {
        let mut registry = ReadinessRegistry::new();
        registry.mark_ready(7);
        registry.mark_ready(7);
        assert!(registry.is_ready(7));
        assert!(!registry.is_ready(8));
    }

    #[test]
    fn test_revoke() {
        let mut registry = ReadinessRegistry::new();
        registry.mark_ready(7);
        registry.revoke(7);
        assert!(!registry.is_ready(7));
        // Revoking an unknown tab is a no-op
        registry.revoke(99);
    }
}
