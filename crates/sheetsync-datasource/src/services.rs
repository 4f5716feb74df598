//! Collaborators shared by every data source of a session

use sheetsync_metadata::MetadataRepository;
use sheetsync_model::{EventBus, SessionConfig, SpreadsheetEvent};
use sheetsync_orm::OrmService;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Remote store, metadata cache, notification bus and configuration
#[derive(Debug, Clone)]
pub struct Services {
    /// Remote store
    pub orm: Arc<dyn OrmService>,
    /// Session metadata cache
    pub metadata: MetadataRepository,
    /// Notification bus
    pub events: EventBus,
    /// Session configuration
    pub config: Arc<SessionConfig>,
}

impl Services {
    /// Wire a session around `orm`
    #[must_use]
    pub fn new(orm: Arc<dyn OrmService>, config: SessionConfig) -> Self {
        let events = EventBus::new(config.event_channel_capacity);
        let metadata = MetadataRepository::from_config(Arc::clone(&orm), events.clone(), &config);
        Self {
            orm,
            metadata,
            events,
            config: Arc::new(config),
        }
    }

    /// Subscribe to session notifications
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SpreadsheetEvent> {
        self.events.subscribe()
    }
}
