//! In-flight registry: which subjects are currently being enriched

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// One unit of enrichment work in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingItem {
    pub subject_id: String,
    pub enqueued_at: DateTime<Utc>,
}

/// Shared set of in-flight subjects.
///
/// Observers either poll [`PendingRegistry::snapshot`] or subscribe to the
/// in-flight count.
#[derive(Debug, Clone)]
pub struct PendingRegistry {
    items: Arc<DashMap<String, PendingItem>>,
    count: Arc<watch::Sender<usize>>,
}

impl PendingRegistry {
    pub fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self {
            items: Arc::new(DashMap::new()),
            count: Arc::new(count),
        }
    }

    pub(crate) fn mark(&self, subject_id: &str, enqueued_at: DateTime<Utc>) {
        self.items.insert(
            subject_id.to_string(),
            PendingItem {
                subject_id: subject_id.to_string(),
                enqueued_at,
            },
        );
        self.publish();
    }

    pub(crate) fn clear(&self, subject_id: &str) {
        self.items.remove(subject_id);
        self.publish();
    }

    fn publish(&self) {
        self.count.send_replace(self.items.len());
    }

    pub fn contains(&self, subject_id: &str) -> bool {
        self.items.contains_key(subject_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// In-flight items, oldest first.
    pub fn snapshot(&self) -> Vec<PendingItem> {
        let mut items: Vec<PendingItem> = self.items.iter().map(|r| r.value().clone()).collect();
        items.sort_by(|a, b| a.enqueued_at.cmp(&b.enqueued_at));
        items
    }

    /// Receive the in-flight count whenever it changes.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.count.subscribe()
    }
}

impl Default for PendingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_and_clear_track_membership() {
        let registry = PendingRegistry::new();
        registry.mark("a", Utc::now());
        assert!(registry.contains("a"));
        assert_eq!(registry.len(), 1);

        registry.clear("a");
        assert!(registry.is_empty());
    }

    #[test]
    fn subscribers_see_latest_count() {
        let registry = PendingRegistry::new();
        let rx = registry.subscribe();
        registry.mark("a", Utc::now());
        assert_eq!(*rx.borrow(), 1);
        registry.clear("a");
        assert_eq!(*rx.borrow(), 0);
    }

    #[test]
    fn snapshot_is_oldest_first() {
        let registry = PendingRegistry::new();
        let earlier = Utc::now() - chrono::Duration::seconds(5);
        registry.mark("late", Utc::now());
        registry.mark("early", earlier);
        let ids: Vec<_> = registry.snapshot().into_iter().map(|p| p.subject_id).collect();
        assert_eq!(ids, vec!["early".to_string(), "late".to_string()]);
    }
}
