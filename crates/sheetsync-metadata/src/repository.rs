//! Metadata repository
//!
//! Caches field schemas, model labels and record labels for one spreadsheet
//! session.
//!
//! Field schemas and model labels are fetched on first request through a moka
//! cache, which also collapses concurrent first requests for the same model
//! into one remote call. Record labels are served synchronously: a miss
//! returns `Ok(None)`, queues the id and schedules a flush on the current
//! runtime. The flush issues one batched lookup per model and publishes
//! [`SpreadsheetEvent::LabelsFetched`] once every batch has settled.

use crate::error::MetadataError;
use crate::labels::{LabelCache, LabelEntry, Lookup};
use futures::future::join_all;
use indexmap::IndexSet;
use moka::future::Cache;
use parking_lot::Mutex;
use sheetsync_model::{EventBus, FieldSchema, ModelName, RecordId, SessionConfig, SpreadsheetEvent};
use sheetsync_orm::{OrmError, OrmService};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Session-wide metadata cache
///
/// Cheap to clone; clones share the same caches.
#[derive(Debug, Clone)]
pub struct MetadataRepository {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    orm: Arc<dyn OrmService>,
    events: EventBus,
    field_schemas: Cache<ModelName, Arc<FieldSchema>>,
    model_labels: Cache<ModelName, String>,
    labels: Mutex<LabelCache>,
}

impl MetadataRepository {
    /// Create repository with default capacity (10,000 models)
    #[inline]
    #[must_use]
    pub fn new(orm: Arc<dyn OrmService>, events: EventBus) -> Self {
        Self::with_capacity(orm, events, 10_000)
    }

    /// Create repository sized from the session configuration
    #[inline]
    #[must_use]
    pub fn from_config(orm: Arc<dyn OrmService>, events: EventBus, config: &SessionConfig) -> Self {
        Self::with_capacity(orm, events, config.metadata_cache_capacity)
    }

    /// Create repository keeping metadata of at most `max_models` models
    #[must_use]
    pub fn with_capacity(orm: Arc<dyn OrmService>, events: EventBus, max_models: u64) -> Self {
        Self {
            inner: Arc::new(Inner {
                orm,
                events,
                field_schemas: Cache::new(max_models),
                model_labels: Cache::new(max_models),
                labels: Mutex::new(LabelCache::default()),
            }),
        }
    }

    /// Remote store this repository reads from
    #[inline]
    #[must_use]
    pub fn orm(&self) -> &Arc<dyn OrmService> {
        &self.inner.orm
    }

    /// Notification bus labels are announced on
    #[inline]
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Subscribe to notifications
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SpreadsheetEvent> {
        self.inner.events.subscribe()
    }

    /// Field schema of `model`
    ///
    /// # Errors
    /// Returns [`MetadataError::Remote`] if the describe call fails; the
    /// failure is not cached and the next call retries.
    pub async fn get_field_schema(&self, model: &ModelName) -> Result<Arc<FieldSchema>, MetadataError> {
        let orm = Arc::clone(&self.inner.orm);
        let key = model.clone();
        self.inner
            .field_schemas
            .try_get_with(model.clone(), async move {
                tracing::debug!(model = %key, "fetching field schema");
                orm.describe_fields(&key).await.map(Arc::new)
            })
            .await
            .map_err(unshare)
    }

    /// Human readable name of `model`, empty if the store has none
    ///
    /// # Errors
    /// Returns [`MetadataError::Remote`] if the remote call fails
    pub async fn get_model_label(&self, model: &ModelName) -> Result<String, MetadataError> {
        let orm = Arc::clone(&self.inner.orm);
        let key = model.clone();
        self.inner
            .model_labels
            .try_get_with(model.clone(), async move {
                tracing::debug!(model = %key, "fetching model label");
                orm.model_display_name(&key)
                    .await
                    .map(Option::unwrap_or_default)
            })
            .await
            .map_err(unshare)
    }

    /// Label of record `id` of `model`, without waiting
    ///
    /// `Ok(None)` means the label is not known yet: the request is queued and
    /// a [`SpreadsheetEvent::LabelsFetched`] will follow once it settles.
    ///
    /// # Errors
    /// Returns the memoized [`MetadataError`] of a label that failed to load
    pub fn get_record_label(&self, model: &ModelName, id: RecordId) -> Result<Option<String>, MetadataError> {
        let lookup = self.inner.labels.lock().lookup(model, id);
        match lookup {
            Lookup::Known(LabelEntry::Ready(label)) => Ok(Some(label)),
            Lookup::Known(LabelEntry::Failed(err)) => Err(err),
            Lookup::Known(LabelEntry::Pending) => Ok(None),
            Lookup::Queued { schedule_flush } => {
                tracing::debug!(model = %model, id = %id, "record label miss");
                if schedule_flush {
                    self.schedule_flush();
                }
                Ok(None)
            }
        }
    }

    /// Current state of a record label, without queueing anything
    #[must_use]
    pub fn label_entry(&self, model: &ModelName, id: RecordId) -> Option<LabelEntry> {
        self.inner.labels.lock().peek(model, id).cloned()
    }

    /// Whether record labels are waiting for a flush
    #[must_use]
    pub fn has_pending_labels(&self) -> bool {
        self.inner.labels.lock().has_pending()
    }

    /// Whether record labels are waiting for a flush or still being fetched
    #[must_use]
    pub fn has_unsettled_labels(&self) -> bool {
        self.inner.labels.lock().has_unsettled()
    }

    fn schedule_flush(&self) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!("scheduling record label flush");
                let repository = self.clone();
                handle.spawn(async move { repository.flush().await });
            }
            Err(_) => {
                tracing::warn!("no async runtime to flush record labels, waiting for explicit flush");
                self.inner.labels.lock().unschedule();
            }
        }
    }

    /// Fetch every queued record label
    ///
    /// One batched lookup per model over the deduplicated ids. A failed batch
    /// is retried id by id so one unreadable record does not poison the
    /// others. Publishes [`SpreadsheetEvent::LabelsFetched`] once when done;
    /// does nothing if nothing is queued.
    pub async fn flush(&self) {
        let pending = self.inner.labels.lock().take_pending();
        if pending.is_empty() {
            return;
        }
        join_all(
            pending
                .into_iter()
                .map(|(model, ids)| self.fetch_batch(model, ids)),
        )
        .await;
        self.inner.events.publish(SpreadsheetEvent::LabelsFetched);
    }

    async fn fetch_batch(&self, model: ModelName, ids: IndexSet<RecordId>) {
        let ids: Vec<RecordId> = ids.into_iter().collect();
        tracing::debug!(model = %model, ids = ids.len(), "fetching record labels");

        match self.inner.orm.resolve_display_names(&model, &ids).await {
            Ok(names) => self.settle(&model, &ids, names),
            Err(err) if ids.len() == 1 => {
                tracing::warn!(model = %model, id = %ids[0], error = %err, "record label fetch failed");
                self.fail(&model, ids[0]);
            }
            Err(err) => {
                tracing::warn!(
                    model = %model,
                    ids = ids.len(),
                    error = %err,
                    "batched label fetch failed, retrying each id"
                );
                let orm = &self.inner.orm;
                let results = join_all(ids.iter().map(|id| {
                    let model = &model;
                    async move { (*id, orm.resolve_display_names(model, &[*id]).await) }
                }))
                .await;
                for (id, result) in results {
                    match result {
                        Ok(names) => self.settle(&model, &[id], names),
                        Err(err) => {
                            tracing::warn!(model = %model, id = %id, error = %err, "record label fetch failed");
                            self.fail(&model, id);
                        }
                    }
                }
            }
        }
    }

    fn settle(&self, model: &ModelName, requested: &[RecordId], names: Vec<(RecordId, String)>) {
        let mut labels = self.inner.labels.lock();
        let mut resolved: std::collections::HashMap<RecordId, String> = names.into_iter().collect();
        for id in requested {
            let entry = match resolved.remove(id) {
                Some(name) => LabelEntry::Ready(name),
                None => LabelEntry::Failed(MetadataError::label_unavailable(model, *id)),
            };
            labels.settle(model, *id, entry);
        }
    }

    fn fail(&self, model: &ModelName, id: RecordId) {
        self.inner.labels.lock().settle(
            model,
            id,
            LabelEntry::Failed(MetadataError::label_unavailable(model, id)),
        );
    }
}

fn unshare(err: Arc<OrmError>) -> MetadataError {
    MetadataError::Remote((*err).clone())
}
