//! Generic lazy data source
//!
//! A [`DataSource`] owns an immutable definition and materializes a
//! pull-based model on demand:
//!
//! ```text
//! Uninitialized ─▶ MetadataLoading ─▶ MetadataLoaded ─▶ DataLoading ─▶ DataLoaded
//!                                                            ▲             │
//!                                                            └─force_fetch─┘
//! ```
//!
//! A failed step leaves the state where it was before that step, so the
//! next [`DataSource::get`] retries it. Nothing is retried automatically.

use crate::error::DataSourceError;
use crate::services::Services;
use async_trait::async_trait;
use parking_lot::RwLock;
use sheetsync_model::{Context, Domain, ModelName, OrderBy, SearchParams, SpreadsheetEvent};
use std::fmt;

/// Loading stage of a data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadState {
    /// Nothing fetched
    Uninitialized,
    /// Field schema and model label being fetched
    MetadataLoading,
    /// Metadata known, model built, no data
    MetadataLoaded,
    /// Rows or groups being fetched
    DataLoading,
    /// Model ready to answer lookups
    DataLoaded,
}

/// Options of [`DataSource::get`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Re-fetch data even when already loaded
    pub force_fetch: bool,
}

impl GetOptions {
    /// Options forcing a data re-fetch
    #[inline]
    #[must_use]
    pub fn force() -> Self {
        Self { force_fetch: true }
    }
}

/// What a concrete data source adds to the generic state machine
#[async_trait]
pub trait DataSourceKind: Send + Sync + 'static {
    /// Immutable description the source is created from
    type Definition: Clone + fmt::Debug + Send + Sync;
    /// Result of the metadata step
    type Metadata: Send;
    /// Pull-based accessor handed to the evaluator
    type Model: Clone + fmt::Debug + Send + Sync;

    /// Kind name, for diagnostics
    const KIND: &'static str;

    /// Target model of `definition`
    fn model_name(definition: &Self::Definition) -> &ModelName;

    /// Base domain of `definition`
    fn base_domain(definition: &Self::Definition) -> &Domain;

    /// Context of `definition`
    fn context(definition: &Self::Definition) -> &Context;

    /// Ordering of `definition`
    fn order_by(_definition: &Self::Definition) -> Vec<OrderBy> {
        Vec::new()
    }

    /// Fetch whatever the model needs before it can be built
    async fn fetch_metadata(
        definition: &Self::Definition,
        services: &Services,
    ) -> Result<Self::Metadata, DataSourceError>;

    /// Build the model once metadata is known
    fn build_model(
        id: &str,
        definition: &Self::Definition,
        metadata: Self::Metadata,
        services: &Services,
    ) -> Self::Model;

    /// Fetch data into the model
    async fn load_model(model: &Self::Model, params: SearchParams) -> Result<(), DataSourceError>;
}

/// Lazy, cacheable, re-fetchable data holder
pub struct DataSource<K: DataSourceKind> {
    id: String,
    definition: K::Definition,
    services: Services,
    state: RwLock<LoadState>,
    additional_domain: RwLock<Domain>,
    model: RwLock<Option<K::Model>>,
    load_lock: tokio::sync::Mutex<()>,
}

impl<K: DataSourceKind> fmt::Debug for DataSource<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSource")
            .field("kind", &K::KIND)
            .field("id", &self.id)
            .field("definition", &self.definition)
            .field("state", &*self.state.read())
            .finish_non_exhaustive()
    }
}

impl<K: DataSourceKind> DataSource<K> {
    /// Create an unloaded data source
    #[must_use]
    pub fn new(id: impl Into<String>, definition: K::Definition, services: Services) -> Self {
        Self {
            id: id.into(),
            definition,
            services,
            state: RwLock::new(LoadState::Uninitialized),
            additional_domain: RwLock::new(Domain::default()),
            model: RwLock::new(None),
            load_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Registry id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Definition the source was created from
    #[inline]
    #[must_use]
    pub fn definition(&self) -> &K::Definition {
        &self.definition
    }

    /// Session collaborators
    #[inline]
    #[must_use]
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Target model
    #[inline]
    #[must_use]
    pub fn model_name(&self) -> &ModelName {
        K::model_name(&self.definition)
    }

    /// Current loading stage
    #[inline]
    #[must_use]
    pub fn state(&self) -> LoadState {
        *self.state.read()
    }

    /// Whether data is loaded
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == LoadState::DataLoaded
    }

    /// Loaded model, `None` unless data is loaded
    #[must_use]
    pub fn model(&self) -> Option<K::Model> {
        if self.is_ready() {
            self.model.read().clone()
        } else {
            None
        }
    }

    /// Effective filter: base domain AND the additional domain
    #[must_use]
    pub fn computed_domain(&self) -> Domain {
        let additional = self.additional_domain.read();
        Domain::and([K::base_domain(&self.definition), &*additional])
    }

    /// Replace the additional domain; does not reload
    pub fn add_domain(&self, domain: Domain) {
        tracing::debug!(id = %self.id, %domain, "replacing additional domain");
        *self.additional_domain.write() = domain;
    }

    /// Parameters the next fetch will use
    #[must_use]
    pub fn search_params(&self) -> SearchParams {
        SearchParams {
            domain: self.computed_domain(),
            context: K::context(&self.definition).clone(),
            order_by: K::order_by(&self.definition),
        }
    }

    /// Load metadata then data, and return the model
    ///
    /// Idempotent once loaded unless `options.force_fetch` is set; a forced
    /// fetch reloads data but not metadata. Concurrent callers share a
    /// single load.
    ///
    /// # Errors
    /// Returns the error of the failed step
    pub async fn get(&self, options: GetOptions) -> Result<K::Model, DataSourceError> {
        let _loading = self.load_lock.lock().await;
        if !options.force_fetch {
            if let Some(model) = self.model() {
                return Ok(model);
            }
        }

        let built = self.model.read().clone();
        let model = match built {
            Some(model) => model,
            None => self.load_metadata().await?,
        };

        self.set_state(LoadState::DataLoading);
        match K::load_model(&model, self.search_params()).await {
            Ok(()) => {
                self.set_state(LoadState::DataLoaded);
                tracing::info!(id = %self.id, kind = K::KIND, model = %self.model_name(), "data source loaded");
                self.services.events.publish(SpreadsheetEvent::DataSourceUpdated {
                    id: self.id.clone(),
                });
                Ok(model)
            }
            Err(err) => {
                self.set_state(LoadState::MetadataLoaded);
                tracing::warn!(id = %self.id, error = %err, "data source load failed");
                self.services.events.publish(SpreadsheetEvent::DataSourceFailed {
                    id: self.id.clone(),
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn load_metadata(&self) -> Result<K::Model, DataSourceError> {
        self.set_state(LoadState::MetadataLoading);
        match K::fetch_metadata(&self.definition, &self.services).await {
            Ok(metadata) => {
                let model = K::build_model(&self.id, &self.definition, metadata, &self.services);
                *self.model.write() = Some(model.clone());
                self.set_state(LoadState::MetadataLoaded);
                Ok(model)
            }
            Err(err) => {
                self.set_state(LoadState::Uninitialized);
                tracing::warn!(id = %self.id, error = %err, "data source metadata failed");
                self.services.events.publish(SpreadsheetEvent::DataSourceFailed {
                    id: self.id.clone(),
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn set_state(&self, state: LoadState) {
        tracing::trace!(id = %self.id, ?state, "data source state");
        *self.state.write() = state;
    }
}
