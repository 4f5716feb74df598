//! Definitions of list and pivot insertions
//!
//! A definition is the immutable description a data source is created from:
//! target model, projected columns or measures, base domain, context and
//! ordering.

use crate::domain::Domain;
use crate::ids::ModelName;
use serde::{Deserialize, Serialize};

/// Evaluation context passed through to the remote store
pub type Context = serde_json::Map<String, serde_json::Value>;

/// Sort key of a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    /// Field to sort on
    pub name: String,
    /// Ascending order
    #[serde(default = "default_asc")]
    pub asc: bool,
}

fn default_asc() -> bool {
    true
}

impl OrderBy {
    /// Ascending sort on `name`
    #[must_use]
    pub fn asc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            asc: true,
        }
    }

    /// Descending sort on `name`
    #[must_use]
    pub fn desc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            asc: false,
        }
    }
}

/// Definition of an inserted list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListDefinition {
    /// Target model
    pub model: ModelName,
    /// Projected columns
    pub columns: Vec<String>,
    /// Base domain
    #[serde(default)]
    pub domain: Domain,
    /// Evaluation context
    #[serde(default)]
    pub context: Context,
    /// Ordering
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
    /// Initial fetch window, the session default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl ListDefinition {
    /// Create definition over `model` with `columns`
    #[must_use]
    pub fn new<I, S>(model: impl Into<ModelName>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            model: model.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            domain: Domain::default(),
            context: Context::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// With base domain
    #[inline]
    #[must_use]
    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }

    /// With ordering
    #[inline]
    #[must_use]
    pub fn with_order_by(mut self, order_by: Vec<OrderBy>) -> Self {
        self.order_by = order_by;
        self
    }

    /// With context
    #[inline]
    #[must_use]
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// With initial fetch window
    #[inline]
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Definition of an inserted pivot table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotDefinition {
    /// Target model
    pub model: ModelName,
    /// Aggregated fields
    pub measures: Vec<String>,
    /// Row group-bys, outermost first
    #[serde(default)]
    pub row_group_bys: Vec<String>,
    /// Column group-bys, outermost first
    #[serde(default)]
    pub col_group_bys: Vec<String>,
    /// Base domain
    #[serde(default)]
    pub domain: Domain,
    /// Evaluation context
    #[serde(default)]
    pub context: Context,
}

impl PivotDefinition {
    /// Create definition over `model` aggregating `measures`
    #[must_use]
    pub fn new<I, S>(model: impl Into<ModelName>, measures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            model: model.into(),
            measures: measures.into_iter().map(Into::into).collect(),
            row_group_bys: Vec::new(),
            col_group_bys: Vec::new(),
            domain: Domain::default(),
            context: Context::new(),
        }
    }

    /// With row group-bys
    #[must_use]
    pub fn with_rows<I, S>(mut self, group_bys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.row_group_bys = group_bys.into_iter().map(Into::into).collect();
        self
    }

    /// With column group-bys
    #[must_use]
    pub fn with_cols<I, S>(mut self, group_bys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.col_group_bys = group_bys.into_iter().map(Into::into).collect();
        self
    }

    /// With base domain
    #[inline]
    #[must_use]
    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }

    /// Whether `field` is one of the row or column group-bys
    #[must_use]
    pub fn groups_by(&self, field: &str) -> bool {
        self.row_group_bys
            .iter()
            .chain(&self.col_group_bys)
            .any(|g| g == field)
    }
}

/// Parameters of one fetch: effective domain, context and ordering
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Effective domain
    pub domain: Domain,
    /// Evaluation context
    pub context: Context,
    /// Ordering
    pub order_by: Vec<OrderBy>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_definition_from_json_defaults() {
        let def: ListDefinition = serde_json::from_value(json!({
            "model": "partner",
            "columns": ["name", "owner_id"],
            "order_by": [{ "name": "name" }]
        }))
        .unwrap();
        assert_eq!(def.model, ModelName::new("partner"));
        assert!(def.domain.is_empty());
        assert_eq!(def.order_by, vec![OrderBy::asc("name")]);
    }

    #[test]
    fn pivot_groups_by() {
        let def = PivotDefinition::new("partner", ["amount"])
            .with_rows(["owner_id"])
            .with_cols(["priority"]);
        assert!(def.groups_by("owner_id"));
        assert!(def.groups_by("priority"));
        assert!(!def.groups_by("amount"));
    }
}
