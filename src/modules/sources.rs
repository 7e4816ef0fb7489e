// Collaborator seams: where trees come from, who executes tab commands, and
// how tab events reach the core.

use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::broadcast;

use crate::error::Result;
use crate::modules::tree::TabTree;
use crate::state::{TabEvent, TabId};

const EVENT_CAPACITY: usize = 256;

/// Produces keyword-filtered trees. An empty keyword means unfiltered.
#[async_trait]
pub trait TreeSource: Send + Sync {
    /// Open windows and their tabs.
    async fn live_tree(&self, keyword: &str) -> Result<TabTree>;
    async fn bookmark_tree(&self, keyword: &str) -> Result<TabTree>;
}

#[async_trait]
pub trait SuggestionSource: Send + Sync {
    async fn suggestion_tree(&self, keyword: &str) -> Result<TabTree>;
}

/// Executes commands against the browser and publishes its tab events.
#[async_trait]
pub trait TabManager: Send + Sync {
    async fn remove(&self, ids: &[TabId]) -> Result<()>;
    async fn activate(&self, id: TabId) -> Result<()>;
    async fn open_new_tab(&self, url: &str) -> Result<()>;

    /// Starts delivering tab events; delivery stops when the handle drops.
    fn subscribe(&self) -> Subscription;
}

/// Fan-out of tab events to any number of subscribers.
#[derive(Clone)]
pub struct TabEventBus {
    sender: broadcast::Sender<TabEvent>,
}

impl Default for TabEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl TabEventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Returns how many subscribers saw the event.
    pub fn emit(&self, event: TabEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Handle returned by [`TabManager::subscribe`]. Dropping it unsubscribes.
pub struct Subscription {
    receiver: broadcast::Receiver<TabEvent>,
}

impl Subscription {
    /// Waits for the next event; `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<TabEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("[Events] Subscriber lagged, {} events dropped", missed);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next already-queued event, without waiting.
    pub fn try_recv(&mut self) -> Option<TabEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    warn!("[Events] Subscriber lagged, {} events dropped", missed);
                }
                Err(_) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!("[Events] Subscription released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TabChange;

    #[tokio::test]
    async fn test_bus_delivers_in_order() {
        let bus = TabEventBus::new();
        let mut sub = bus.subscribe();
        bus.emit(TabEvent::Removed { tab_id: 1 });
        bus.emit(TabEvent::Updated {
            tab_id: 2,
            change: TabChange {
                title: Some("t".to_string()),
                ..TabChange::default()
            },
        });
        assert_eq!(sub.recv().await, Some(TabEvent::Removed { tab_id: 1 }));
        assert!(matches!(sub.try_recv(), Some(TabEvent::Updated { tab_id: 2, .. })));
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let bus = TabEventBus::new();
        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.emit(TabEvent::Removed { tab_id: 3 }), 0);
    }
}
