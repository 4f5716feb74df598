//! Data sources of one spreadsheet, keyed by id

use crate::error::DataSourceError;
use crate::list::{ListDataSource, SpreadsheetListModel};
use crate::pivot::{PivotDataSource, SpreadsheetPivotModel};
use crate::services::Services;
use crate::source::GetOptions;
use dashmap::DashMap;
use futures::future::join_all;
use sheetsync_model::{ListDefinition, PivotDefinition};
use std::sync::Arc;

/// A registered data source of either kind
#[derive(Debug, Clone)]
pub enum AnyDataSource {
    /// List insertion
    List(Arc<ListDataSource>),
    /// Pivot insertion
    Pivot(Arc<PivotDataSource>),
}

impl AnyDataSource {
    /// Registry id
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::List(ds) => ds.id(),
            Self::Pivot(ds) => ds.id(),
        }
    }

    /// Whether data is loaded
    #[must_use]
    pub fn is_ready(&self) -> bool {
        match self {
            Self::List(ds) => ds.is_ready(),
            Self::Pivot(ds) => ds.is_ready(),
        }
    }

    /// Load the data source, discarding the model
    ///
    /// # Errors
    /// Returns the error of the failed loading step
    pub async fn load(&self, options: GetOptions) -> Result<(), DataSourceError> {
        match self {
            Self::List(ds) => ds.get(options).await.map(drop),
            Self::Pivot(ds) => ds.get(options).await.map(drop),
        }
    }
}

/// Every data source of a session
///
/// Handles are cloned out of the map before any await, so loading never
/// holds a shard lock.
#[derive(Debug)]
pub struct DataSources {
    services: Services,
    sources: DashMap<String, AnyDataSource>,
}

impl DataSources {
    /// Create empty registry
    #[must_use]
    pub fn new(services: Services) -> Self {
        Self {
            services,
            sources: DashMap::new(),
        }
    }

    /// Session collaborators shared by every data source
    #[inline]
    #[must_use]
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Register a list; replaces any data source with the same id
    pub fn add_list(&self, id: impl Into<String>, definition: ListDefinition) -> Arc<ListDataSource> {
        let id = id.into();
        let ds = Arc::new(ListDataSource::new(id.clone(), definition, self.services.clone()));
        tracing::debug!(id = %id, "registering list data source");
        self.sources.insert(id, AnyDataSource::List(Arc::clone(&ds)));
        ds
    }

    /// Register a pivot; replaces any data source with the same id
    pub fn add_pivot(&self, id: impl Into<String>, definition: PivotDefinition) -> Arc<PivotDataSource> {
        let id = id.into();
        let ds = Arc::new(PivotDataSource::new(id.clone(), definition, self.services.clone()));
        tracing::debug!(id = %id, "registering pivot data source");
        self.sources.insert(id, AnyDataSource::Pivot(Arc::clone(&ds)));
        ds
    }

    /// Whether `id` is registered
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    /// Data source registered under `id`
    #[must_use]
    pub fn get(&self, id: &str) -> Option<AnyDataSource> {
        self.sources.get(id).map(|entry| entry.value().clone())
    }

    /// List registered under `id`
    ///
    /// # Errors
    /// Returns [`DataSourceError::UnknownDataSource`] or
    /// [`DataSourceError::WrongKind`]
    pub fn get_list(&self, id: &str) -> Result<Arc<ListDataSource>, DataSourceError> {
        match self.lookup(id)? {
            AnyDataSource::List(ds) => Ok(ds),
            AnyDataSource::Pivot(_) => Err(DataSourceError::WrongKind {
                id: id.to_string(),
                expected: "list",
            }),
        }
    }

    /// Pivot registered under `id`
    ///
    /// # Errors
    /// Returns [`DataSourceError::UnknownDataSource`] or
    /// [`DataSourceError::WrongKind`]
    pub fn get_pivot(&self, id: &str) -> Result<Arc<PivotDataSource>, DataSourceError> {
        match self.lookup(id)? {
            AnyDataSource::Pivot(ds) => Ok(ds),
            AnyDataSource::List(_) => Err(DataSourceError::WrongKind {
                id: id.to_string(),
                expected: "pivot",
            }),
        }
    }

    /// Loaded model of list `id`, for synchronous lookups
    ///
    /// # Errors
    /// Returns [`DataSourceError::NotLoaded`] until the list is loaded
    pub fn list_model(&self, id: &str) -> Result<SpreadsheetListModel, DataSourceError> {
        self.get_list(id)?
            .model()
            .ok_or_else(|| DataSourceError::NotLoaded(id.to_string()))
    }

    /// Loaded model of pivot `id`, for synchronous lookups
    ///
    /// # Errors
    /// Returns [`DataSourceError::NotLoaded`] until the pivot is loaded
    pub fn pivot_model(&self, id: &str) -> Result<SpreadsheetPivotModel, DataSourceError> {
        self.get_pivot(id)?
            .model()
            .ok_or_else(|| DataSourceError::NotLoaded(id.to_string()))
    }

    /// Unregister `id`, returning whether it was registered
    pub fn remove(&self, id: &str) -> bool {
        self.sources.remove(id).is_some()
    }

    /// Load data source `id`
    ///
    /// # Errors
    /// Returns [`DataSourceError::UnknownDataSource`] or the loading error
    pub async fn load(&self, id: &str, force_fetch: bool) -> Result<(), DataSourceError> {
        let ds = self.lookup(id)?;
        ds.load(GetOptions { force_fetch }).await
    }

    /// Whether data source `id` is registered and loaded
    #[must_use]
    pub fn is_ready(&self, id: &str) -> bool {
        self.sources.get(id).is_some_and(|entry| entry.is_ready())
    }

    /// Load every data source concurrently
    ///
    /// One failure does not abort the others; returns the failed ids with
    /// their error.
    pub async fn load_all(&self) -> Vec<(String, DataSourceError)> {
        let sources: Vec<AnyDataSource> = self.sources.iter().map(|entry| entry.value().clone()).collect();
        let results = join_all(sources.iter().map(|ds| async move {
            (ds.id().to_string(), ds.load(GetOptions::default()).await)
        }))
        .await;
        results
            .into_iter()
            .filter_map(|(id, result)| result.err().map(|err| (id, err)))
            .collect()
    }

    /// Registered ids, sorted
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sources.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Number of registered data sources
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    fn lookup(&self, id: &str) -> Result<AnyDataSource, DataSourceError> {
        self.get(id)
            .ok_or_else(|| DataSourceError::UnknownDataSource(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetsync_model::{SessionConfig, SpreadsheetEvent};
    use sheetsync_orm::OrmMethod;
    use sheetsync_test_utils::{partner_list, partner_orm, partner_pivot, PARTNER};

    fn registry() -> (Arc<sheetsync_orm::InMemoryOrm>, DataSources) {
        let orm = partner_orm();
        let services = Services::new(orm.clone(), SessionConfig::default());
        (orm, DataSources::new(services))
    }

    #[tokio::test]
    async fn add_get_remove() {
        let (_orm, sources) = registry();
        sources.add_list("1", partner_list(["name"]));
        sources.add_pivot("2", partner_pivot());

        assert!(sources.contains("1"));
        assert_eq!(sources.ids(), vec!["1".to_string(), "2".to_string()]);
        assert!(sources.get_list("1").is_ok());
        assert_eq!(
            sources.get_list("2").unwrap_err(),
            DataSourceError::WrongKind { id: "2".to_string(), expected: "list" }
        );
        assert_eq!(
            sources.get_pivot("9").unwrap_err(),
            DataSourceError::UnknownDataSource("9".to_string())
        );
        assert_eq!(sources.list_model("1").unwrap_err(), DataSourceError::NotLoaded("1".to_string()));

        assert!(sources.remove("1"));
        assert!(!sources.remove("1"));
        assert_eq!(sources.len(), 1);
    }

    #[tokio::test]
    async fn load_publishes_update() {
        let (_orm, sources) = registry();
        let mut events = sources.services().subscribe();
        sources.add_list("1", partner_list(["name"]).with_limit(1));

        sources.load("1", false).await.unwrap();
        assert!(sources.is_ready("1"));
        assert_eq!(
            events.recv().await.unwrap(),
            SpreadsheetEvent::DataSourceUpdated { id: "1".to_string() }
        );
        assert_eq!(sources.list_model("1").unwrap().rows_count(), 1);
    }

    #[tokio::test]
    async fn load_all_reports_failures_without_aborting() {
        let (orm, sources) = registry();
        sources.add_list("1", partner_list(["name"]).with_limit(1));
        sources.add_pivot("2", partner_pivot());
        orm.fail_method(OrmMethod::ReadGroup, PARTNER);

        let failures = sources.load_all().await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "2");
        assert!(sources.is_ready("1"));
        assert!(!sources.is_ready("2"));
    }
}
