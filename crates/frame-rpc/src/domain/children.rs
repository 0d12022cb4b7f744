//! Registry of child windows this context hosts.
//!
//! A child is recorded the first time a trusted request arrives from an unknown
//! window and forgotten once its window is seen closed.

use crate::domain::types::WindowId;
use std::collections::BTreeMap;
use tracing::debug;

/// One known child window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRecord {
    pub window: WindowId,
    /// Origin the child last spoke from; used as the target origin hint.
    pub origin: String,
    pub requests_received: u64,
}

/// Known children, ordered by window id so broadcasts are deterministic.
#[derive(Debug, Default)]
pub struct ChildRegistry {
    children: BTreeMap<WindowId, ChildRecord>,
}

impl ChildRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a trusted message from `window`. Returns true if the window was
    /// previously unknown.
    pub fn observe(&mut self, window: WindowId, origin: &str) -> bool {
        match self.children.get_mut(&window) {
            Some(record) => {
                record.requests_received += 1;
                if record.origin != origin {
                    debug!(window = %window, origin = %origin, "Child origin changed");
                    record.origin = origin.to_string();
                }
                false
            }
            None => {
                debug!(window = %window, origin = %origin, "Registered child window");
                self.children.insert(
                    window,
                    ChildRecord {
                        window,
                        origin: origin.to_string(),
                        requests_received: 1,
                    },
                );
                true
            }
        }
    }

    pub fn get(&self, window: WindowId) -> Option<&ChildRecord> {
        self.children.get(&window)
    }

    pub fn contains(&self, window: WindowId) -> bool {
        self.children.contains_key(&window)
    }

    /// Forget a closed window.
    pub fn prune(&mut self, window: WindowId) -> Option<ChildRecord> {
        let removed = self.children.remove(&window);
        if removed.is_some() {
            debug!(window = %window, "Pruned closed child window");
        }
        removed
    }

    /// Snapshot of `(window, origin)` pairs for a broadcast.
    pub fn targets(&self) -> Vec<(WindowId, String)> {
        self.children
            .values()
            .map(|record| (record.window, record.origin.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn clear(&mut self) {
        self.children.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_registers_once() {
        let mut registry = ChildRegistry::new();
        assert!(registry.observe(WindowId(2), "https://tasks.office.com"));
        assert!(!registry.observe(WindowId(2), "https://tasks.office.com"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(WindowId(2)).unwrap().requests_received, 2);
    }

    #[test]
    fn test_prune_and_targets() {
        let mut registry = ChildRegistry::new();
        registry.observe(WindowId(3), "https://b.example.com");
        registry.observe(WindowId(1), "https://a.example.com");

        assert_eq!(
            registry.targets(),
            vec![
                (WindowId(1), "https://a.example.com".to_string()),
                (WindowId(3), "https://b.example.com".to_string()),
            ]
        );

        assert!(registry.prune(WindowId(1)).is_some());
        assert!(registry.prune(WindowId(1)).is_none());
        assert!(!registry.contains(WindowId(1)));
        assert_eq!(registry.len(), 1);
    }
}
