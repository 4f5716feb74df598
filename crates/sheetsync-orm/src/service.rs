//! The [`OrmService`] trait

use crate::error::OrmError;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sheetsync_model::{Context, Domain, FieldSchema, ModelName, OrderBy, Record, RecordId};
use std::fmt;

/// Remote methods, used to account for calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrmMethod {
    /// `describe_fields`
    DescribeFields,
    /// `model_display_name`
    ModelDisplayName,
    /// `resolve_display_names`
    ResolveDisplayNames,
    /// `search_read`
    SearchRead,
    /// `read_group`
    ReadGroup,
}

impl OrmMethod {
    /// Method name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DescribeFields => "describe_fields",
            Self::ModelDisplayName => "model_display_name",
            Self::ResolveDisplayNames => "resolve_display_names",
            Self::SearchRead => "search_read",
            Self::ReadGroup => "read_group",
        }
    }
}

impl fmt::Display for OrmMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordering and window of a `search_read`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Sort keys, outermost first
    pub order_by: Vec<OrderBy>,
    /// Max number of records, `None` for all
    pub limit: Option<usize>,
}

impl ReadOptions {
    /// Options with a limit
    #[must_use]
    pub fn with_limit(order_by: Vec<OrderBy>, limit: usize) -> Self {
        Self {
            order_by,
            limit: Some(limit),
        }
    }
}

/// One aggregated group returned by `read_group`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRow {
    /// Raw value of every group-by field of the call
    pub values: IndexMap<String, Value>,
    /// Number of records in the group
    pub count: u64,
    /// Sum of every measure over the group
    pub aggregates: IndexMap<String, f64>,
}

/// Remote relational store
#[async_trait]
pub trait OrmService: Send + Sync + fmt::Debug {
    /// Field definitions of `model`
    async fn describe_fields(&self, model: &ModelName) -> Result<FieldSchema, OrmError>;

    /// Human readable name of `model`, `None` if the store has no match
    async fn model_display_name(&self, model: &ModelName) -> Result<Option<String>, OrmError>;

    /// Display names of `ids`; ids the store does not know are left out
    async fn resolve_display_names(
        &self,
        model: &ModelName,
        ids: &[RecordId],
    ) -> Result<Vec<(RecordId, String)>, OrmError>;

    /// Records of `model` matching `domain`, projected on `fields` (plus `id`)
    async fn search_read(
        &self,
        model: &ModelName,
        domain: &Domain,
        fields: &[String],
        options: &ReadOptions,
        context: &Context,
    ) -> Result<Vec<Record>, OrmError>;

    /// Records of `model` matching `domain` aggregated per `group_by` values
    async fn read_group(
        &self,
        model: &ModelName,
        domain: &Domain,
        group_by: &[String],
        measures: &[String],
        context: &Context,
    ) -> Result<Vec<GroupRow>, OrmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names() {
        assert_eq!(OrmMethod::ResolveDisplayNames.to_string(), "resolve_display_names");
        assert_eq!(OrmMethod::ReadGroup.as_str(), "read_group");
    }

    #[test]
    fn read_options_with_limit() {
        let opts = ReadOptions::with_limit(vec![OrderBy::desc("id")], 4);
        assert_eq!(opts.limit, Some(4));
        assert!(!opts.order_by[0].asc);
    }
}
