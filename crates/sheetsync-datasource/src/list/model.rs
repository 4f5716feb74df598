//! Pull-based row accessor of a list data source

use crate::error::DataSourceError;
use crate::services::Services;
use indexmap::IndexSet;
use parking_lot::Mutex;
use serde_json::Value;
use sheetsync_model::record::{many2one_display, x2many_ids};
use sheetsync_model::{
    CellValue, FieldDef, FieldSchema, FieldType, ModelName, Record, RecordId, SearchParams,
    SpreadsheetEvent,
};
use sheetsync_orm::ReadOptions;
use std::collections::HashSet;
use std::sync::Arc;

/// Rows of one list, answered synchronously
///
/// Every accessor either answers from the fetched window or records what is
/// missing, schedules one reload on the current runtime and returns a
/// placeholder. Cheap to clone; clones share the same rows.
#[derive(Debug, Clone)]
pub struct SpreadsheetListModel {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    id: String,
    model: ModelName,
    schema: Arc<FieldSchema>,
    model_label: String,
    services: Services,
    state: Mutex<ListState>,
}

#[derive(Debug, Default)]
struct ListState {
    rows: Vec<Record>,
    /// Rows requested so far, never shrinks
    limit: usize,
    /// Window of the last completed load
    fetched_limit: usize,
    columns: IndexSet<String>,
    fetched_columns: HashSet<String>,
    params: SearchParams,
    reload_scheduled: bool,
    /// Bumped by every load; only the latest load stores its rows
    generation: u64,
}

impl SpreadsheetListModel {
    /// Create an empty model; nothing is fetched until [`Self::load`]
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        model: ModelName,
        schema: Arc<FieldSchema>,
        model_label: String,
        columns: impl IntoIterator<Item = String>,
        limit: usize,
        services: Services,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: id.into(),
                model,
                schema,
                model_label,
                services,
                state: Mutex::new(ListState {
                    limit,
                    columns: columns.into_iter().collect(),
                    ..ListState::default()
                }),
            }),
        }
    }

    /// Data source id this model belongs to
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Target model
    #[inline]
    #[must_use]
    pub fn model(&self) -> &ModelName {
        &self.inner.model
    }

    /// Field schema of the target model
    #[inline]
    #[must_use]
    pub fn schema(&self) -> &FieldSchema {
        &self.inner.schema
    }

    /// Human readable name of the target model
    #[inline]
    #[must_use]
    pub fn model_label(&self) -> &str {
        &self.inner.model_label
    }

    /// Number of rows requested so far
    #[must_use]
    pub fn limit(&self) -> usize {
        self.inner.state.lock().limit
    }

    /// Number of rows currently fetched
    #[must_use]
    pub fn rows_count(&self) -> usize {
        self.inner.state.lock().rows.len()
    }

    /// Tracked columns, in request order
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        self.inner.state.lock().columns.iter().cloned().collect()
    }

    /// Whether a reload is scheduled and not finished
    #[must_use]
    pub fn is_reload_scheduled(&self) -> bool {
        self.inner.state.lock().reload_scheduled
    }

    /// Fetch the current window with `params`
    ///
    /// A zero limit means no row was requested yet: the rows are cleared
    /// without any remote call. When loads overlap, the rows of the one
    /// started last win; an earlier load finishing later is discarded.
    ///
    /// # Errors
    /// Returns [`DataSourceError::Orm`] if the search fails; fetched rows are
    /// left untouched.
    pub async fn load(&self, params: SearchParams) -> Result<(), DataSourceError> {
        let (limit, columns, generation) = {
            let mut state = self.inner.state.lock();
            state.params = params.clone();
            state.generation += 1;
            (state.limit, state.columns.clone(), state.generation)
        };

        if limit == 0 {
            let mut state = self.inner.state.lock();
            state.rows.clear();
            state.fetched_limit = 0;
            state.fetched_columns = columns.into_iter().collect();
            return Ok(());
        }

        let fields: Vec<String> = columns.iter().cloned().collect();
        tracing::debug!(id = %self.inner.id, model = %self.inner.model, limit, columns = fields.len(), "loading list rows");
        let mut rows = self
            .inner
            .services
            .orm
            .search_read(
                &self.inner.model,
                &params.domain,
                &fields,
                &ReadOptions::with_limit(params.order_by.clone(), limit),
                &params.context,
            )
            .await?;
        rows.truncate(limit);

        let mut state = self.inner.state.lock();
        if state.generation != generation {
            tracing::debug!(id = %self.inner.id, generation, latest = state.generation, "discarding superseded list rows");
            return Ok(());
        }
        state.rows = rows;
        state.fetched_limit = limit;
        state.fetched_columns = columns.into_iter().collect();
        Ok(())
    }

    /// Re-fetch with the last parameters and announce the outcome
    ///
    /// Clears the scheduled flag once the load has settled.
    pub async fn reload(&self) {
        let params = self.inner.state.lock().params.clone();
        let result = self.load(params).await;
        self.inner.state.lock().reload_scheduled = false;

        let events = &self.inner.services.events;
        match result {
            Ok(()) => events.publish(SpreadsheetEvent::DataSourceUpdated {
                id: self.inner.id.clone(),
            }),
            Err(err) => {
                tracing::warn!(id = %self.inner.id, error = %err, "list reload failed");
                events.publish(SpreadsheetEvent::DataSourceFailed {
                    id: self.inner.id.clone(),
                    message: err.to_string(),
                });
            }
        }
    }

    /// Value of `field_name` on the row at `position`
    ///
    /// Returns [`CellValue::Loading`] for a row beyond the fetched window and
    /// [`CellValue::Pending`] for a column not fetched yet; both schedule a
    /// reload. A row missing from the result is [`CellValue::Empty`].
    ///
    /// # Errors
    /// Returns [`DataSourceError::UnknownField`] if the model has no such field
    pub fn get_cell_value(&self, position: usize, field_name: &str) -> Result<CellValue, DataSourceError> {
        let field = self
            .inner
            .schema
            .get(field_name)
            .ok_or_else(|| DataSourceError::unknown_field(&self.inner.model, field_name))?;

        let raw = {
            let mut state = self.inner.state.lock();
            if position >= state.limit {
                state.limit = position.saturating_add(1);
            }
            if position >= state.fetched_limit {
                let schedule = mark_reload(&mut state);
                drop(state);
                if schedule {
                    self.schedule_reload();
                }
                return Ok(CellValue::Loading);
            }
            if !state.fetched_columns.contains(field_name) {
                state.columns.insert(field_name.to_string());
                let schedule = mark_reload(&mut state);
                drop(state);
                if schedule {
                    self.schedule_reload();
                }
                return Ok(CellValue::Pending);
            }
            match state.rows.get(position) {
                Some(row) => row.get(field_name).cloned().unwrap_or(Value::Bool(false)),
                None => return Ok(CellValue::Empty),
            }
        };

        Ok(self.format(field, &raw))
    }

    /// Label of `field_name`, the field name itself if unknown
    #[must_use]
    pub fn get_header_value(&self, field_name: &str) -> String {
        self.inner
            .schema
            .get(field_name)
            .map_or_else(|| field_name.to_string(), |field| field.string.clone())
    }

    /// Record id of the row at `position`, if fetched
    #[must_use]
    pub fn get_id_from_position(&self, position: usize) -> Option<RecordId> {
        self.inner
            .state
            .lock()
            .rows
            .get(position)
            .and_then(|row| row.get("id"))
            .and_then(Value::as_i64)
            .map(RecordId)
    }

    fn format(&self, field: &FieldDef, raw: &Value) -> CellValue {
        match field.field_type {
            FieldType::Many2one => many2one_display(raw).map_or(CellValue::Empty, CellValue::text),
            FieldType::One2many | FieldType::Many2many => self.format_x2many(field, raw),
            FieldType::Selection => raw
                .as_str()
                .and_then(|value| field.selection_label(value))
                .map_or(CellValue::Empty, CellValue::text),
            FieldType::Boolean => {
                CellValue::text(if raw.as_bool().unwrap_or(false) { "TRUE" } else { "FALSE" })
            }
            _ => CellValue::from_raw(raw),
        }
    }

    fn format_x2many(&self, field: &FieldDef, raw: &Value) -> CellValue {
        let Some(relation) = &field.relation else {
            return CellValue::Empty;
        };
        let metadata = &self.inner.services.metadata;
        let labels: Vec<String> = x2many_ids(raw)
            .into_iter()
            .filter_map(|id| metadata.get_record_label(relation, id).ok().flatten())
            .collect();
        if labels.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(labels.join(", "))
        }
    }

    fn schedule_reload(&self) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!(id = %self.inner.id, "scheduling list reload");
                let model = self.clone();
                handle.spawn(async move { model.reload().await });
            }
            Err(_) => {
                tracing::warn!(id = %self.inner.id, "no async runtime to reload list, waiting for explicit reload");
                self.inner.state.lock().reload_scheduled = false;
            }
        }
    }
}

/// Raise the reload flag, true if it was down
fn mark_reload(state: &mut ListState) -> bool {
    !std::mem::replace(&mut state.reload_scheduled, true)
}
