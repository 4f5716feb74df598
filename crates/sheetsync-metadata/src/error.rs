//! Error types for the metadata repository

use sheetsync_model::{ModelName, RecordId};
use sheetsync_orm::OrmError;

/// Metadata could not be obtained
///
/// Cloneable so a memoized failure can be raised on every read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    /// The remote call failed
    #[error("remote error: {0}")]
    Remote(#[from] OrmError),

    /// A record label failed even when fetched on its own
    #[error("unable to fetch the label of {id} for model {model}")]
    LabelUnavailable {
        /// Model of the record
        model: ModelName,
        /// Record whose label is missing
        id: RecordId,
    },
}

impl MetadataError {
    /// Create label failure
    pub fn label_unavailable(model: &ModelName, id: RecordId) -> Self {
        Self::LabelUnavailable {
            model: model.clone(),
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_unavailable_display() {
        let err = MetadataError::label_unavailable(&ModelName::new("partner"), RecordId(2));
        assert_eq!(err.to_string(), "unable to fetch the label of 2 for model partner");
    }

    #[test]
    fn remote_conversion() {
        let err: MetadataError = OrmError::UnknownModel(ModelName::new("x")).into();
        assert!(matches!(err, MetadataError::Remote(_)));
    }
}
