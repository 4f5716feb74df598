//! Error types for data sources

use sheetsync_metadata::MetadataError;
use sheetsync_model::ModelName;
use sheetsync_orm::OrmError;

/// Data source errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataSourceError {
    /// Field schema or model label could not be loaded
    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// Row or group fetch failed
    #[error("remote error: {0}")]
    Orm(#[from] OrmError),

    /// Field not declared by the model
    #[error("field '{field}' does not exist on model {model}")]
    UnknownField {
        /// Model of the data source
        model: ModelName,
        /// Requested field
        field: String,
    },

    /// No data source registered under this id
    #[error("no data source with id '{0}'")]
    UnknownDataSource(String),

    /// Registered data source has another kind
    #[error("data source '{id}' is not a {expected}")]
    WrongKind {
        /// Registry id
        id: String,
        /// Kind the caller asked for
        expected: &'static str,
    },

    /// Data source registered but its data is not loaded yet
    #[error("data source '{0}' is not loaded")]
    NotLoaded(String),

    /// Pivot lookup arguments do not fit the pivot definition
    #[error("invalid pivot arguments: {0}")]
    InvalidPivotArguments(String),
}

impl DataSourceError {
    /// Create unknown field error
    pub fn unknown_field(model: &ModelName, field: impl Into<String>) -> Self {
        Self::UnknownField {
            model: model.clone(),
            field: field.into(),
        }
    }
}
