use std::collections::HashMap;

use crate::messages::TabId;

/// Last known URL of every open tab, fed by browser tab events
#[derive(Debug, Default)]
pub struct TabRegistry {
    urls: HashMap<TabId, String>,
}

impl TabRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, tab_id: TabId, url: String) {
        self.urls.insert(tab_id, url);
    }

    #[must_use]
    pub fn url(&self, tab_id: TabId) -> Option<&str> {
        self.urls.get(&tab_id).map(String::as_str)
    }

    /// Whether the tab can still be retrieved
    #[must_use]
    pub fn contains(&self, tab_id: TabId) -> bool {
        self.urls.contains_key(&tab_id)
    }

    pub fn remove(&mut self, tab_id: TabId) -> Option<String> {
        self.urls.remove(&tab_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_and_remove() {
        let mut tabs = TabRegistry::new();
        tabs.update(1, "https://example.com/".to_string());
        tabs.update(1, "https://example.com/next".to_string());
        assert_eq!(tabs.url(1), Some("https://example.com/next"));
        assert!(tabs.contains(1));

        assert_eq!(tabs.remove(1).as_deref(), Some("https://example.com/next"));
        assert!(!tabs.contains(1));
        assert_eq!(tabs.url(1), None);
    }
}
