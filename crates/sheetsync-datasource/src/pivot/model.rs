//! Pull-based accessor of an aggregated pivot table
//!
//! Loading issues one `read_group` per combination of a row group-by prefix
//! and a column group-by prefix, the empty prefixes giving the totals. Every
//! group is then addressed by its `(group-by, value)` pairs, in any order.

use crate::error::DataSourceError;
use crate::services::Services;
use futures::future::try_join_all;
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use serde_json::Value;
use sheetsync_model::record::many2one_id;
use sheetsync_model::{CellValue, FieldSchema, FieldType, PivotDefinition, RecordId, SearchParams};
use std::collections::HashMap;
use std::sync::Arc;

/// Pseudo-measure counting the records of a group
pub const COUNT_MEASURE: &str = "__count";

/// Pseudo group-by naming the measure in header arguments
const MEASURE_HEADER: &str = "measure";

/// Flat `(group-by field, value)` pairs of a pivot formula
pub type PivotArgs = [(String, String)];

/// Sorted `(field, normalized value)` pairs
type GroupKey = Vec<(String, String)>;

/// Aggregated groups of one pivot, answered synchronously
#[derive(Debug, Clone)]
pub struct SpreadsheetPivotModel {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    id: String,
    definition: PivotDefinition,
    schema: Arc<FieldSchema>,
    model_label: String,
    services: Services,
    state: RwLock<PivotState>,
}

#[derive(Debug, Default)]
struct PivotState {
    loaded: bool,
    groups: HashMap<GroupKey, IndexMap<String, f64>>,
    values: IndexMap<String, IndexSet<String>>,
}

impl SpreadsheetPivotModel {
    /// Create an unloaded pivot model
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        definition: PivotDefinition,
        schema: Arc<FieldSchema>,
        model_label: String,
        services: Services,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: id.into(),
                definition,
                schema,
                model_label,
                services,
                state: RwLock::new(PivotState::default()),
            }),
        }
    }

    /// Data source id this model belongs to
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Definition the model aggregates
    #[inline]
    #[must_use]
    pub fn definition(&self) -> &PivotDefinition {
        &self.inner.definition
    }

    /// Human readable name of the target model
    #[inline]
    #[must_use]
    pub fn model_label(&self) -> &str {
        &self.inner.model_label
    }

    /// Whether groups are loaded
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.inner.state.read().loaded
    }

    /// Fetch every group of the table
    ///
    /// # Errors
    /// Returns [`DataSourceError::Orm`] if any `read_group` fails; previously
    /// loaded groups are kept.
    pub async fn load(&self, params: SearchParams) -> Result<(), DataSourceError> {
        let definition = &self.inner.definition;
        let mut group_bys = Vec::new();
        for rows in 0..=definition.row_group_bys.len() {
            for cols in 0..=definition.col_group_bys.len() {
                let group_by: Vec<String> = definition.row_group_bys[..rows]
                    .iter()
                    .chain(&definition.col_group_bys[..cols])
                    .cloned()
                    .collect();
                group_bys.push(group_by);
            }
        }

        tracing::debug!(id = %self.inner.id, model = %definition.model, calls = group_bys.len(), "loading pivot groups");
        let orm = &self.inner.services.orm;
        let results = try_join_all(group_bys.iter().map(|group_by| {
            orm.read_group(
                &definition.model,
                &params.domain,
                group_by,
                &definition.measures,
                &params.context,
            )
        }))
        .await?;

        let mut state = PivotState {
            loaded: true,
            ..PivotState::default()
        };
        for row in results.into_iter().flatten() {
            let mut key: GroupKey = row
                .values
                .iter()
                .map(|(field, value)| (field.clone(), normalize(value)))
                .collect();
            for (field, value) in &key {
                state
                    .values
                    .entry(field.clone())
                    .or_default()
                    .insert(value.clone());
            }
            key.sort();
            let mut aggregates = row.aggregates;
            aggregates.insert(COUNT_MEASURE.to_string(), row.count as f64);
            state.groups.insert(key, aggregates);
        }
        *self.inner.state.write() = state;
        Ok(())
    }

    /// Value of `measure` for the group addressed by `args`
    ///
    /// Empty `args` address the grand total. A group absent from the data is
    /// [`CellValue::Empty`]; an unloaded pivot is [`CellValue::Loading`].
    ///
    /// # Errors
    /// Returns [`DataSourceError::InvalidPivotArguments`] for a measure or a
    /// group-by the definition does not declare
    pub fn get_pivot_cell_value(&self, measure: &str, args: &PivotArgs) -> Result<CellValue, DataSourceError> {
        let definition = &self.inner.definition;
        if measure != COUNT_MEASURE && !definition.measures.iter().any(|m| m == measure) {
            return Err(DataSourceError::InvalidPivotArguments(format!(
                "'{measure}' is not a measure of the pivot"
            )));
        }
        let mut key = Vec::with_capacity(args.len());
        for (field, value) in args {
            self.check_group_by(field)?;
            key.push((field.clone(), value.clone()));
        }
        key.sort();

        let state = self.inner.state.read();
        if !state.loaded {
            return Ok(CellValue::Loading);
        }
        Ok(state
            .groups
            .get(&key)
            .and_then(|aggregates| aggregates.get(measure))
            .map_or(CellValue::Empty, |value| CellValue::Number(*value)))
    }

    /// Header label of the last `(group-by, value)` pair of `args`
    ///
    /// Many-to-one values are labelled through the metadata repository, so a
    /// label not fetched yet is [`CellValue::Loading`] until
    /// `LabelsFetched` is published.
    ///
    /// # Errors
    /// Returns [`DataSourceError::InvalidPivotArguments`] for an unknown
    /// group-by or measure, and the memoized failure of a record label
    pub fn get_pivot_header_value(&self, args: &PivotArgs) -> Result<CellValue, DataSourceError> {
        let Some((field, value)) = args.last() else {
            return Ok(CellValue::text("Total"));
        };

        if field == MEASURE_HEADER {
            if value == COUNT_MEASURE {
                return Ok(CellValue::text("Count"));
            }
            return self
                .inner
                .schema
                .get(value)
                .filter(|_| self.inner.definition.measures.contains(value))
                .map(|def| CellValue::text(def.string.clone()))
                .ok_or_else(|| {
                    DataSourceError::InvalidPivotArguments(format!("'{value}' is not a measure of the pivot"))
                });
        }

        self.check_group_by(field)?;
        if value == "false" {
            return Ok(CellValue::text("None"));
        }
        let Some(def) = self.inner.schema.get(field) else {
            return Ok(CellValue::text(value.clone()));
        };

        match def.field_type {
            FieldType::Many2one => {
                let (Some(relation), Ok(id)) = (&def.relation, value.parse::<i64>()) else {
                    return Ok(CellValue::text(value.clone()));
                };
                let label = self
                    .inner
                    .services
                    .metadata
                    .get_record_label(relation, RecordId(id))?;
                Ok(label.map_or(CellValue::Loading, CellValue::Text))
            }
            FieldType::Selection => Ok(CellValue::text(
                def.selection_label(value).unwrap_or(value.as_str()).to_string(),
            )),
            FieldType::Boolean => Ok(CellValue::text(if value == "true" { "TRUE" } else { "FALSE" })),
            _ => Ok(CellValue::text(value.clone())),
        }
    }

    /// Distinct values of group-by `field` in the loaded data, as used in
    /// formula arguments
    #[must_use]
    pub fn group_values(&self, field: &str) -> Vec<String> {
        self.inner
            .state
            .read()
            .values
            .get(field)
            .map(|values| values.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn check_group_by(&self, field: &str) -> Result<(), DataSourceError> {
        if self.inner.definition.groups_by(field) {
            Ok(())
        } else {
            Err(DataSourceError::InvalidPivotArguments(format!(
                "'{field}' is not a group-by of the pivot"
            )))
        }
    }
}

/// Formula argument form of a raw group value
fn normalize(value: &Value) -> String {
    if let Some(id) = many2one_id(value) {
        return id.to_string();
    }
    match value {
        Value::Null | Value::Bool(false) => "false".to_string(),
        Value::Bool(true) => "true".to_string(),
        Value::String(s) if s.is_empty() => "false".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use sheetsync_model::{ModelName, SessionConfig, SpreadsheetEvent};
    use sheetsync_orm::OrmMethod;
    use sheetsync_test_utils::{partner_model, partner_orm, partner_pivot, PARTNER};

    fn pivot() -> (Arc<sheetsync_orm::InMemoryOrm>, SpreadsheetPivotModel) {
        let orm = partner_orm();
        let services = Services::new(orm.clone(), SessionConfig::default());
        let model = SpreadsheetPivotModel::new(
            "1",
            partner_pivot(),
            Arc::new(partner_model().fields),
            "Partner".to_string(),
            services,
        );
        (orm, model)
    }

    fn args(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(field, value)| (field.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn normalizes_group_values() {
        assert_eq!(normalize(&json!([3, "De Bruyne"])), "3");
        assert_eq!(normalize(&json!(false)), "false");
        assert_eq!(normalize(&json!("2")), "2");
        assert_eq!(normalize(&json!(4.0)), "4");
        assert_eq!(normalize(&json!(true)), "true");
    }

    #[tokio::test]
    async fn one_read_group_per_prefix_pair() {
        let (orm, model) = pivot();
        assert_eq!(model.get_pivot_cell_value("amount", &[]).unwrap(), CellValue::Loading);

        model.load(SearchParams::default()).await.unwrap();
        assert_eq!(orm.call_count(OrmMethod::ReadGroup, &ModelName::new(PARTNER)), 4);
        assert!(model.is_loaded());
    }

    #[tokio::test]
    async fn cell_values_by_group() {
        let (_orm, model) = pivot();
        model.load(SearchParams::default()).await.unwrap();

        assert_eq!(model.get_pivot_cell_value("amount", &[]).unwrap(), CellValue::Number(39.0));
        assert_eq!(
            model.get_pivot_cell_value("amount", &args(&[("owner_id", "3")])).unwrap(),
            CellValue::Number(30.0)
        );
        assert_eq!(
            model
                .get_pivot_cell_value("amount", &args(&[("priority", "2"), ("owner_id", "7")]))
                .unwrap(),
            CellValue::Number(3.0)
        );
        assert_eq!(
            model.get_pivot_cell_value("amount", &args(&[("owner_id", "false")])).unwrap(),
            CellValue::Number(5.0)
        );
        assert_eq!(
            model.get_pivot_cell_value(COUNT_MEASURE, &args(&[("priority", "2")])).unwrap(),
            CellValue::Number(2.0)
        );
        assert_eq!(
            model.get_pivot_cell_value("amount", &args(&[("owner_id", "99")])).unwrap(),
            CellValue::Empty
        );
        assert_eq!(model.group_values("owner_id"), vec!["3", "false", "7"]);
    }

    #[tokio::test]
    async fn invalid_arguments_are_errors() {
        let (_orm, model) = pivot();
        model.load(SearchParams::default()).await.unwrap();
        assert!(matches!(
            model.get_pivot_cell_value("name", &[]),
            Err(DataSourceError::InvalidPivotArguments(_))
        ));
        assert!(matches!(
            model.get_pivot_cell_value("amount", &args(&[("tag_ids", "1")])),
            Err(DataSourceError::InvalidPivotArguments(_))
        ));
    }

    #[tokio::test]
    async fn header_values() {
        let (_orm, model) = pivot();
        let mut events = model.inner.services.subscribe();

        assert_eq!(model.get_pivot_header_value(&[]).unwrap(), CellValue::text("Total"));
        assert_eq!(
            model.get_pivot_header_value(&args(&[("measure", "amount")])).unwrap(),
            CellValue::text("Amount")
        );
        assert_eq!(
            model.get_pivot_header_value(&args(&[("owner_id", "3"), ("priority", "1")])).unwrap(),
            CellValue::text("Low")
        );
        assert_eq!(
            model.get_pivot_header_value(&args(&[("priority", "false")])).unwrap(),
            CellValue::text("None")
        );
        assert_eq!(
            model.get_pivot_header_value(&args(&[("owner_id", "7")])).unwrap(),
            CellValue::Loading
        );
        assert_eq!(events.recv().await.unwrap(), SpreadsheetEvent::LabelsFetched);
        assert_eq!(
            model.get_pivot_header_value(&args(&[("owner_id", "7")])).unwrap(),
            CellValue::text("Kevin")
        );
    }
}
