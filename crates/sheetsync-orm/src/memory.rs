//! Fixture-backed [`OrmService`]
//!
//! Every call is recorded before it is served, and yields to the scheduler
//! once, so concurrent callers really interleave like they would over the
//! network.

use crate::error::OrmError;
use crate::service::{GroupRow, OrmMethod, OrmService, ReadOptions};
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sheetsync_model::record::{many2one_display, many2one_id};
use sheetsync_model::{Context, Domain, FieldDef, FieldSchema, ModelName, OrderBy, Record, RecordId};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Content of the in-memory store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    /// Models by technical name
    #[serde(default)]
    pub models: IndexMap<ModelName, ModelFixture>,
}

impl Fixture {
    /// Create empty fixture
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style model insert
    #[must_use]
    pub fn with_model(mut self, name: impl Into<ModelName>, model: ModelFixture) -> Self {
        self.models.insert(name.into(), model);
        self
    }

    /// Parse from JSON text
    ///
    /// # Errors
    /// Returns error if the JSON does not describe a fixture
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// One model of a [`Fixture`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelFixture {
    /// Display name of the model
    #[serde(default)]
    pub label: Option<String>,
    /// Field definitions
    #[serde(default)]
    pub fields: FieldSchema,
    /// Stored records, each with an `id`
    #[serde(default)]
    pub records: Vec<Record>,
}

impl ModelFixture {
    /// Create model with a display name
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    /// Builder-style field insert
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.insert(name, def);
        self
    }

    /// Builder-style record insert; non-object values are ignored
    #[must_use]
    pub fn with_record(mut self, record: Value) -> Self {
        if let Value::Object(record) = record {
            self.records.push(record);
        }
        self
    }

    fn find(&self, id: RecordId) -> Option<&Record> {
        self.records
            .iter()
            .find(|r| r.get("id").and_then(Value::as_i64) == Some(id.0))
    }
}

/// A call received by [`InMemoryOrm`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Method called
    pub method: OrmMethod,
    /// Target model
    pub model: ModelName,
    /// Ids passed to `resolve_display_names`
    pub ids: Vec<RecordId>,
    /// Limit passed to `search_read`
    pub limit: Option<usize>,
}

#[derive(Debug, Default)]
struct FailurePlan {
    batches: HashSet<ModelName>,
    ids: HashMap<ModelName, HashSet<RecordId>>,
    methods: HashSet<(OrmMethod, ModelName)>,
}

/// In-memory remote store
#[derive(Debug, Default)]
pub struct InMemoryOrm {
    fixture: RwLock<Fixture>,
    calls: Mutex<Vec<RecordedCall>>,
    failures: Mutex<FailurePlan>,
}

impl InMemoryOrm {
    /// Create store over `fixture`
    #[must_use]
    pub fn new(fixture: Fixture) -> Self {
        Self {
            fixture: RwLock::new(fixture),
            ..Self::default()
        }
    }

    /// Add a record to `model`
    pub fn insert_record(&self, model: &ModelName, record: Record) {
        let mut fixture = self.fixture.write();
        fixture
            .models
            .entry(model.clone())
            .or_default()
            .records
            .push(record);
    }

    /// Fail every `resolve_display_names` on `model` asking for more than one id
    pub fn fail_batch_for(&self, model: impl Into<ModelName>) {
        self.failures.lock().batches.insert(model.into());
    }

    /// Fail every `resolve_display_names` on `model` that includes one of `ids`
    pub fn fail_ids(&self, model: impl Into<ModelName>, ids: impl IntoIterator<Item = RecordId>) {
        self.failures
            .lock()
            .ids
            .entry(model.into())
            .or_default()
            .extend(ids);
    }

    /// Fail every call of `method` on `model`
    pub fn fail_method(&self, method: OrmMethod, model: impl Into<ModelName>) {
        self.failures.lock().methods.insert((method, model.into()));
    }

    /// Serve every call again
    pub fn clear_failures(&self) {
        *self.failures.lock() = FailurePlan::default();
    }

    /// All calls received so far
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of calls of `method` on `model`
    #[must_use]
    pub fn call_count(&self, method: OrmMethod, model: &ModelName) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method == method && &c.model == model)
            .count()
    }

    /// Id lists passed to `resolve_display_names` on `model`, in call order
    #[must_use]
    pub fn display_name_requests(&self, model: &ModelName) -> Vec<Vec<RecordId>> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method == OrmMethod::ResolveDisplayNames && &c.model == model)
            .map(|c| c.ids.clone())
            .collect()
    }

    async fn enter(
        &self,
        method: OrmMethod,
        model: &ModelName,
        ids: &[RecordId],
        limit: Option<usize>,
    ) -> Result<(), OrmError> {
        tracing::trace!(method = method.as_str(), %model, ids = ids.len(), ?limit, "orm call");
        self.calls.lock().push(RecordedCall {
            method,
            model: model.clone(),
            ids: ids.to_vec(),
            limit,
        });
        tokio::task::yield_now().await;

        let failures = self.failures.lock();
        if failures.methods.contains(&(method, model.clone())) {
            return Err(OrmError::call_failed(method.as_str(), model.clone(), "rejected"));
        }
        if method == OrmMethod::ResolveDisplayNames {
            if ids.len() > 1 && failures.batches.contains(model) {
                return Err(OrmError::call_failed(
                    method.as_str(),
                    model.clone(),
                    "batch rejected",
                ));
            }
            if let Some(bad) = failures.ids.get(model) {
                if let Some(id) = ids.iter().find(|id| bad.contains(id)) {
                    return Err(OrmError::call_failed(
                        method.as_str(),
                        model.clone(),
                        format!("record {id} is not readable"),
                    ));
                }
            }
        }
        Ok(())
    }

    fn with_model<T>(
        &self,
        model: &ModelName,
        f: impl FnOnce(&ModelFixture) -> Result<T, OrmError>,
    ) -> Result<T, OrmError> {
        let fixture = self.fixture.read();
        let data = fixture
            .models
            .get(model)
            .ok_or_else(|| OrmError::UnknownModel(model.clone()))?;
        f(data)
    }
}

fn check_field(model: &ModelName, data: &ModelFixture, field: &str) -> Result<(), OrmError> {
    if field == "id" || field == "display_name" || data.fields.contains(field) {
        Ok(())
    } else {
        Err(OrmError::UnknownField {
            model: model.clone(),
            field: field.to_string(),
        })
    }
}

fn display_name(record: &Record) -> Option<String> {
    record
        .get("display_name")
        .or_else(|| record.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn matching<'a>(data: &'a ModelFixture, domain: &Domain) -> Result<Vec<&'a Record>, OrmError> {
    let mut out = Vec::new();
    for record in &data.records {
        if domain.matches(record)? {
            out.push(record);
        }
    }
    Ok(out)
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    let rank = |v: &Value| match v {
        Value::Null | Value::Bool(false) => 0,
        _ => 1,
    };
    if let (Some(x), Some(y)) = (many2one_display(a), many2one_display(b)) {
        return x.cmp(y);
    }
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    if let (Some(x), Some(y)) = (a.as_str(), b.as_str()) {
        return x.cmp(y);
    }
    rank(a).cmp(&rank(b))
}

fn sort_records(records: &mut [&Record], order_by: &[OrderBy]) {
    records.sort_by(|a, b| {
        for key in order_by {
            let left = a.get(&key.name).unwrap_or(&Value::Bool(false));
            let right = b.get(&key.name).unwrap_or(&Value::Bool(false));
            let ord = compare_values(left, right);
            let ord = if key.asc { ord } else { ord.reverse() };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

#[async_trait]
impl OrmService for InMemoryOrm {
    async fn describe_fields(&self, model: &ModelName) -> Result<FieldSchema, OrmError> {
        self.enter(OrmMethod::DescribeFields, model, &[], None).await?;
        self.with_model(model, |data| Ok(data.fields.clone()))
    }

    async fn model_display_name(&self, model: &ModelName) -> Result<Option<String>, OrmError> {
        self.enter(OrmMethod::ModelDisplayName, model, &[], None).await?;
        Ok(self
            .fixture
            .read()
            .models
            .get(model)
            .and_then(|data| data.label.clone()))
    }

    async fn resolve_display_names(
        &self,
        model: &ModelName,
        ids: &[RecordId],
    ) -> Result<Vec<(RecordId, String)>, OrmError> {
        self.enter(OrmMethod::ResolveDisplayNames, model, ids, None).await?;
        self.with_model(model, |data| {
            Ok(ids
                .iter()
                .filter_map(|id| {
                    let name = data.find(*id).and_then(display_name)?;
                    Some((*id, name))
                })
                .collect())
        })
    }

    async fn search_read(
        &self,
        model: &ModelName,
        domain: &Domain,
        fields: &[String],
        options: &ReadOptions,
        _context: &Context,
    ) -> Result<Vec<Record>, OrmError> {
        self.enter(OrmMethod::SearchRead, model, &[], options.limit).await?;
        self.with_model(model, |data| {
            for field in fields {
                check_field(model, data, field)?;
            }
            let mut records = matching(data, domain)?;
            sort_records(&mut records, &options.order_by);
            let limit = options.limit.unwrap_or(records.len());
            Ok(records
                .into_iter()
                .take(limit)
                .map(|record| {
                    let mut row = Record::new();
                    row.insert(
                        "id".to_string(),
                        record.get("id").cloned().unwrap_or(Value::Bool(false)),
                    );
                    for field in fields {
                        let value = match field.as_str() {
                            "display_name" => display_name(record).map_or(Value::Bool(false), Value::from),
                            name => record.get(name).cloned().unwrap_or(Value::Bool(false)),
                        };
                        row.insert(field.clone(), value);
                    }
                    row
                })
                .collect())
        })
    }

    async fn read_group(
        &self,
        model: &ModelName,
        domain: &Domain,
        group_by: &[String],
        measures: &[String],
        _context: &Context,
    ) -> Result<Vec<GroupRow>, OrmError> {
        self.enter(OrmMethod::ReadGroup, model, &[], None).await?;
        self.with_model(model, |data| {
            for field in group_by.iter().chain(measures.iter().filter(|m| *m != "__count")) {
                check_field(model, data, field)?;
            }
            let mut groups: IndexMap<String, GroupRow> = IndexMap::new();
            for record in matching(data, domain)? {
                let values: IndexMap<String, Value> = group_by
                    .iter()
                    .map(|field| {
                        let value = record.get(field).cloned().unwrap_or(Value::Bool(false));
                        (field.clone(), value)
                    })
                    .collect();
                let key = Value::Array(
                    values
                        .values()
                        .map(|v| many2one_id(v).map_or_else(|| v.clone(), |id| Value::from(id.0)))
                        .collect(),
                )
                .to_string();
                let row = groups.entry(key).or_insert_with(|| GroupRow {
                    values,
                    count: 0,
                    aggregates: measures.iter().map(|m| (m.clone(), 0.0)).collect(),
                });
                row.count += 1;
                for measure in measures {
                    let amount = if measure == "__count" {
                        1.0
                    } else {
                        record.get(measure).and_then(Value::as_f64).unwrap_or(0.0)
                    };
                    if let Some(total) = row.aggregates.get_mut(measure) {
                        *total += amount;
                    }
                }
            }
            Ok(groups.into_values().collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use sheetsync_model::{FieldType, Operator};

    fn orm() -> InMemoryOrm {
        let partner = ModelFixture::new("Partner")
            .with_field("name", FieldDef::new(FieldType::Char, "Name"))
            .with_field("amount", FieldDef::new(FieldType::Float, "Amount"))
            .with_field(
                "owner_id",
                FieldDef::relational(FieldType::Many2one, "Owner", "user"),
            )
            .with_record(json!({"id": 1, "name": "Alpha", "amount": 10, "owner_id": [7, "Kevin"]}))
            .with_record(json!({"id": 2, "name": "Bravo", "amount": 5, "owner_id": false}))
            .with_record(json!({"id": 3, "name": "Charlie", "amount": 1, "owner_id": [7, "Kevin"]}));
        InMemoryOrm::new(Fixture::new().with_model("partner", partner))
    }

    #[tokio::test]
    async fn search_read_filters_sorts_and_limits() {
        let orm = orm();
        let model = ModelName::new("partner");
        let rows = orm
            .search_read(
                &model,
                &Domain::leaf("amount", Operator::Gt, 2),
                &["name".to_string()],
                &ReadOptions::with_limit(vec![OrderBy::desc("name")], 1),
                &Context::new(),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], json!("Bravo"));
        assert_eq!(rows[0]["id"], json!(2));
        assert_eq!(orm.calls()[0].limit, Some(1));
    }

    #[tokio::test]
    async fn search_read_rejects_unknown_field() {
        let orm = orm();
        let err = orm
            .search_read(
                &ModelName::new("partner"),
                &Domain::default(),
                &["nope".to_string()],
                &ReadOptions::default(),
                &Context::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OrmError::UnknownField { .. }));
    }

    #[tokio::test]
    async fn resolve_display_names_skips_unknown_ids() {
        let orm = orm();
        let model = ModelName::new("partner");
        let names = orm
            .resolve_display_names(&model, &[RecordId(3), RecordId(99)])
            .await
            .unwrap();
        assert_eq!(names, vec![(RecordId(3), "Charlie".to_string())]);
        assert_eq!(orm.display_name_requests(&model), vec![vec![RecordId(3), RecordId(99)]]);
    }

    #[tokio::test]
    async fn injected_failures() {
        let orm = orm();
        let model = ModelName::new("partner");
        orm.fail_batch_for("partner");
        orm.fail_ids("partner", [RecordId(2)]);

        assert!(orm.resolve_display_names(&model, &[RecordId(1), RecordId(3)]).await.is_err());
        assert!(orm.resolve_display_names(&model, &[RecordId(1)]).await.is_ok());
        assert!(orm.resolve_display_names(&model, &[RecordId(2)]).await.is_err());

        orm.fail_method(OrmMethod::DescribeFields, "partner");
        assert!(orm.describe_fields(&model).await.is_err());
        orm.clear_failures();
        assert!(orm.describe_fields(&model).await.is_ok());
        assert_eq!(orm.call_count(OrmMethod::DescribeFields, &model), 2);
    }

    #[tokio::test]
    async fn read_group_aggregates_per_group() {
        let orm = orm();
        let groups = orm
            .read_group(
                &ModelName::new("partner"),
                &Domain::default(),
                &["owner_id".to_string()],
                &["amount".to_string(), "__count".to_string()],
                &Context::new(),
            )
            .await
            .unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].values["owner_id"], json!([7, "Kevin"]));
        assert_eq!(groups[0].count, 2);
        assert_eq!(groups[0].aggregates["amount"], 11.0);
        assert_eq!(groups[0].aggregates["__count"], 2.0);
        assert_eq!(groups[1].values["owner_id"], json!(false));
    }

    #[tokio::test]
    async fn unknown_model_label_is_none() {
        let orm = orm();
        assert_eq!(orm.model_display_name(&ModelName::new("ghost")).await.unwrap(), None);
        assert_eq!(
            orm.model_display_name(&ModelName::new("partner")).await.unwrap(),
            Some("Partner".to_string())
        );
    }
}
