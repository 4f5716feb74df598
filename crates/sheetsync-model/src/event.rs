//! Notification channel towards the evaluation host
//!
//! The host subscribes once and re-evaluates formulas whenever data it was
//! waiting for has arrived.

use tokio::sync::broadcast;

/// Something the evaluation host should react to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpreadsheetEvent {
    /// A batch of record labels settled (fetched or failed)
    LabelsFetched,
    /// A data source finished (re)loading
    DataSourceUpdated {
        /// Registry id of the data source
        id: String,
    },
    /// A data source failed to load
    DataSourceFailed {
        /// Registry id of the data source
        id: String,
        /// Error message
        message: String,
    },
}

/// Broadcast bus for [`SpreadsheetEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SpreadsheetEvent>,
}

impl EventBus {
    /// Create bus buffering up to `capacity` events per subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to future events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SpreadsheetEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; having no subscriber is fine
    pub fn publish(&self, event: SpreadsheetEvent) {
        tracing::trace!(?event, "publishing spreadsheet event");
        let _ = self.sender.send(event);
    }

    /// Number of live subscribers
    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_events() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();
        bus.publish(SpreadsheetEvent::LabelsFetched);
        assert_eq!(rx.recv().await.unwrap(), SpreadsheetEvent::LabelsFetched);
    }

    #[test]
    fn publish_without_subscriber_is_silent() {
        let bus = EventBus::default();
        bus.publish(SpreadsheetEvent::LabelsFetched);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
