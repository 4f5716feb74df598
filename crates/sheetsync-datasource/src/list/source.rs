use super::model::SpreadsheetListModel;
use crate::error::DataSourceError;
use crate::services::Services;
use crate::source::{DataSource, DataSourceKind};
use async_trait::async_trait;
use sheetsync_model::{Context, Domain, FieldSchema, ListDefinition, ModelName, OrderBy, SearchParams};
use std::sync::Arc;

/// Data source of an inserted list
pub type ListDataSource = DataSource<ListKind>;

/// List specialization of [`DataSource`]
#[derive(Debug, Clone, Copy)]
pub struct ListKind;

/// Field schema and label of the list's model
#[derive(Debug, Clone)]
pub struct ListMetadata {
    /// Field schema
    pub schema: Arc<FieldSchema>,
    /// Model label
    pub model_label: String,
}

#[async_trait]
impl DataSourceKind for ListKind {
    type Definition = ListDefinition;
    type Metadata = ListMetadata;
    type Model = SpreadsheetListModel;

    const KIND: &'static str = "list";

    fn model_name(definition: &ListDefinition) -> &ModelName {
        &definition.model
    }

    fn base_domain(definition: &ListDefinition) -> &Domain {
        &definition.domain
    }

    fn context(definition: &ListDefinition) -> &Context {
        &definition.context
    }

    fn order_by(definition: &ListDefinition) -> Vec<OrderBy> {
        definition.order_by.clone()
    }

    async fn fetch_metadata(
        definition: &ListDefinition,
        services: &Services,
    ) -> Result<ListMetadata, DataSourceError> {
        let (schema, model_label) = futures::try_join!(
            services.metadata.get_field_schema(&definition.model),
            services.metadata.get_model_label(&definition.model),
        )?;
        Ok(ListMetadata { schema, model_label })
    }

    fn build_model(
        id: &str,
        definition: &ListDefinition,
        metadata: ListMetadata,
        services: &Services,
    ) -> SpreadsheetListModel {
        let columns: Vec<String> = definition
            .columns
            .iter()
            .filter(|column| {
                let known = metadata.schema.contains(column);
                if !known {
                    tracing::warn!(id, model = %definition.model, column = %column, "dropping unknown list column");
                }
                known
            })
            .cloned()
            .collect();
        let limit = definition.limit.unwrap_or(services.config.initial_list_limit);
        SpreadsheetListModel::new(
            id,
            definition.model.clone(),
            metadata.schema,
            metadata.model_label,
            columns,
            limit,
            services.clone(),
        )
    }

    async fn load_model(model: &SpreadsheetListModel, params: SearchParams) -> Result<(), DataSourceError> {
        model.load(params).await
    }
}
