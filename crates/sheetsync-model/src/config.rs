//! Session configuration

use crate::cell::LOADING_TEXT;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables of one spreadsheet session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Max models kept in the field-schema and model-label caches
    pub metadata_cache_capacity: u64,
    /// Buffered events per subscriber
    pub event_channel_capacity: usize,
    /// Initial fetch window of a list model
    pub initial_list_limit: usize,
    /// Default number of rows of an inserted list
    pub list_insert_lines: u32,
    /// Text rendered for a cell waiting on data
    pub loading_text: String,
}

impl SessionConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With metadata cache capacity
    #[inline]
    #[must_use]
    pub fn with_metadata_cache_capacity(mut self, capacity: u64) -> Self {
        self.metadata_cache_capacity = capacity;
        self
    }

    /// With initial list limit
    #[inline]
    #[must_use]
    pub fn with_initial_list_limit(mut self, limit: usize) -> Self {
        self.initial_list_limit = limit;
        self
    }

    /// With event channel capacity
    #[inline]
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns error on invalid TOML, unknown keys or out-of-range values
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded session configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.event_channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "event_channel_capacity",
                message: "must be positive".to_string(),
            });
        }
        if self.metadata_cache_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "metadata_cache_capacity",
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            metadata_cache_capacity: 10_000,
            event_channel_capacity: 256,
            initial_list_limit: 0,
            list_insert_lines: 10,
            loading_text: LOADING_TEXT.to_string(),
        }
    }
}
