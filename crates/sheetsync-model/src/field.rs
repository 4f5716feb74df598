//! Field schemas of remote models
//!
//! A [`FieldSchema`] maps field names to [`FieldDef`]s, as returned by the
//! remote "describe fields" call.

use crate::ids::ModelName;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Type of a model field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Short text
    Char,
    /// Long text
    Text,
    /// Rich text
    Html,
    /// Integer number
    Integer,
    /// Floating point number
    Float,
    /// Currency amount
    Monetary,
    /// True/false
    Boolean,
    /// Calendar date
    Date,
    /// Date and time
    Datetime,
    /// One value out of a fixed option list
    Selection,
    /// Reference to a single related record
    Many2one,
    /// Inverse of a many2one
    One2many,
    /// Set of related records
    Many2many,
    /// Anything this layer does not format specially
    #[serde(other)]
    Other,
}

impl FieldType {
    /// Whether values of this type hold related record ids
    #[inline]
    #[must_use]
    pub fn is_relational(self) -> bool {
        matches!(self, Self::Many2one | Self::One2many | Self::Many2many)
    }

    /// Whether values of this type can be aggregated by a pivot
    #[inline]
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float | Self::Monetary)
    }
}

/// Description of a single field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field type
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Human readable label
    pub string: String,

    /// Options of a selection field, as `(value, label)` pairs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Vec<(String, String)>>,

    /// Target model of a relational field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<ModelName>,
}

impl FieldDef {
    /// Create a plain field
    #[must_use]
    pub fn new(field_type: FieldType, string: impl Into<String>) -> Self {
        Self {
            field_type,
            string: string.into(),
            selection: None,
            relation: None,
        }
    }

    /// Create a relational field pointing to `relation`
    #[must_use]
    pub fn relational(
        field_type: FieldType,
        string: impl Into<String>,
        relation: impl Into<ModelName>,
    ) -> Self {
        Self {
            relation: Some(relation.into()),
            ..Self::new(field_type, string)
        }
    }

    /// Create a selection field
    #[must_use]
    pub fn selection<I, V, L>(string: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = (V, L)>,
        V: Into<String>,
        L: Into<String>,
    {
        Self {
            selection: Some(
                options
                    .into_iter()
                    .map(|(value, label)| (value.into(), label.into()))
                    .collect(),
            ),
            ..Self::new(FieldType::Selection, string)
        }
    }

    /// Label of the selection option matching `value`
    #[must_use]
    pub fn selection_label(&self, value: &str) -> Option<&str> {
        self.selection
            .as_ref()?
            .iter()
            .find(|(key, _)| key == value)
            .map(|(_, label)| label.as_str())
    }
}

/// Field definitions of one model, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSchema(IndexMap<String, FieldDef>);

impl FieldSchema {
    /// Create empty schema
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.0.insert(name.into(), def);
        self
    }

    /// Insert or replace a field
    pub fn insert(&mut self, name: impl Into<String>, def: FieldDef) {
        self.0.insert(name.into(), def);
    }

    /// Look up a field
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.0.get(name)
    }

    /// Whether the schema declares `name`
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterate over `(name, definition)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldDef)> {
        self.0.iter()
    }

    /// Number of fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the schema is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, FieldDef)> for FieldSchema {
    fn from_iter<I: IntoIterator<Item = (String, FieldDef)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_remote_description() {
        let json = serde_json::json!({
            "priority": {
                "type": "selection",
                "string": "Priority",
                "selection": [["1", "Low"], ["2", "Medium"]]
            },
            "owner_id": { "type": "many2one", "string": "Owner", "relation": "res.users" },
            "image": { "type": "binary", "string": "Image" }
        });
        let schema: FieldSchema = serde_json::from_value(json).unwrap();

        let priority = schema.get("priority").unwrap();
        assert_eq!(priority.field_type, FieldType::Selection);
        assert_eq!(priority.selection_label("2"), Some("Medium"));
        assert_eq!(priority.selection_label("3"), None);

        let owner = schema.get("owner_id").unwrap();
        assert_eq!(owner.relation, Some(ModelName::new("res.users")));
        assert_eq!(schema.get("image").unwrap().field_type, FieldType::Other);
    }

    #[test]
    fn keeps_declaration_order() {
        let schema = FieldSchema::new()
            .with_field("b", FieldDef::new(FieldType::Char, "B"))
            .with_field("a", FieldDef::new(FieldType::Char, "A"));
        let names: Vec<_> = schema.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
