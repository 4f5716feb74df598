//! Errors raised by the remote store

use sheetsync_model::{DomainError, ModelName};

/// A remote call failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrmError {
    /// Model does not exist on the remote side
    #[error("unknown model: {0}")]
    UnknownModel(ModelName),

    /// Field does not exist on the model
    #[error("unknown field '{field}' on model {model}")]
    UnknownField {
        /// Queried model
        model: ModelName,
        /// Missing field
        field: String,
    },

    /// The remote call was rejected
    #[error("{method} on {model} failed: {message}")]
    CallFailed {
        /// Remote method
        method: &'static str,
        /// Target model
        model: ModelName,
        /// Reason given by the store
        message: String,
    },

    /// Domain could not be evaluated
    #[error("invalid domain: {0}")]
    Domain(#[from] DomainError),
}

impl OrmError {
    /// Create call failure
    pub fn call_failed(
        method: &'static str,
        model: impl Into<ModelName>,
        message: impl Into<String>,
    ) -> Self {
        Self::CallFailed {
            method,
            model: model.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_failed_display() {
        let err = OrmError::call_failed("name_search", "partner", "boom");
        assert_eq!(err.to_string(), "name_search on partner failed: boom");
    }
}
