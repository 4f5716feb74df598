use super::model::{SpreadsheetPivotModel, COUNT_MEASURE};
use crate::error::DataSourceError;
use crate::services::Services;
use crate::source::{DataSource, DataSourceKind};
use async_trait::async_trait;
use sheetsync_model::{Context, Domain, FieldSchema, ModelName, PivotDefinition, SearchParams};
use std::sync::Arc;

/// Data source of an inserted pivot table
pub type PivotDataSource = DataSource<PivotKind>;

/// Pivot specialization of [`DataSource`]
#[derive(Debug, Clone, Copy)]
pub struct PivotKind;

/// Field schema and label of the pivot's model
#[derive(Debug, Clone)]
pub struct PivotMetadata {
    /// Field schema
    pub schema: Arc<FieldSchema>,
    /// Model label
    pub model_label: String,
}

#[async_trait]
impl DataSourceKind for PivotKind {
    type Definition = PivotDefinition;
    type Metadata = PivotMetadata;
    type Model = SpreadsheetPivotModel;

    const KIND: &'static str = "pivot";

    fn model_name(definition: &PivotDefinition) -> &ModelName {
        &definition.model
    }

    fn base_domain(definition: &PivotDefinition) -> &Domain {
        &definition.domain
    }

    fn context(definition: &PivotDefinition) -> &Context {
        &definition.context
    }

    async fn fetch_metadata(
        definition: &PivotDefinition,
        services: &Services,
    ) -> Result<PivotMetadata, DataSourceError> {
        let (schema, model_label) = futures::try_join!(
            services.metadata.get_field_schema(&definition.model),
            services.metadata.get_model_label(&definition.model),
        )?;

        let fields = definition
            .measures
            .iter()
            .filter(|measure| *measure != COUNT_MEASURE)
            .chain(&definition.row_group_bys)
            .chain(&definition.col_group_bys);
        for field in fields {
            if !schema.contains(field) {
                return Err(DataSourceError::unknown_field(&definition.model, field.clone()));
            }
        }
        Ok(PivotMetadata { schema, model_label })
    }

    fn build_model(
        id: &str,
        definition: &PivotDefinition,
        metadata: PivotMetadata,
        services: &Services,
    ) -> SpreadsheetPivotModel {
        SpreadsheetPivotModel::new(
            id,
            definition.clone(),
            metadata.schema,
            metadata.model_label,
            services.clone(),
        )
    }

    async fn load_model(model: &SpreadsheetPivotModel, params: SearchParams) -> Result<(), DataSourceError> {
        model.load(params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{GetOptions, LoadState};
    use sheetsync_model::{CellValue, Operator, SessionConfig};
    use sheetsync_test_utils::{partner_orm, partner_pivot};

    fn source(definition: PivotDefinition) -> PivotDataSource {
        let services = Services::new(partner_orm(), SessionConfig::default());
        PivotDataSource::new("7", definition, services)
    }

    #[tokio::test]
    async fn unknown_group_by_fails_metadata() {
        let ds = source(partner_pivot().with_cols(["ghost"]));
        let err = ds.get(GetOptions::default()).await.unwrap_err();
        assert_eq!(err, DataSourceError::unknown_field(&"partner".into(), "ghost"));
        assert_eq!(ds.state(), LoadState::Uninitialized);
    }

    #[tokio::test]
    async fn computed_domain_applies_to_groups() {
        let ds = source(partner_pivot());
        ds.add_domain(Domain::leaf("active", Operator::Eq, true));
        let model = ds.get(GetOptions::default()).await.unwrap();
        assert_eq!(model.get_pivot_cell_value("amount", &[]).unwrap(), CellValue::Number(31.0));
    }
}
