//! Error types for the shared model
//!
//! - Domain parsing and evaluation
//! - Session configuration loading

use std::path::PathBuf;

/// Errors while parsing or evaluating a [`crate::Domain`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Operator string not understood
    #[error("unknown domain operator: '{0}'")]
    UnknownOperator(String),

    /// A term is neither an operator nor a `(field, op, value)` triple
    #[error("malformed domain term: {0}")]
    MalformedTerm(String),

    /// The term sequence is not a valid prefix expression
    #[error("malformed domain: {0}")]
    Malformed(String),
}

/// Errors while loading a [`crate::SessionConfig`]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error during file read
    #[error("io error reading {path}: {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// Invalid TOML or unknown keys
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Value out of range
    #[error("invalid value for '{key}': {message}")]
    InvalidValue {
        /// Offending key
        key: &'static str,
        /// What is wrong with it
        message: String,
    },
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
