use async_trait::async_trait;
use proptest::prelude::*;
use sheetsync_datasource::{DataSources, GetOptions, ListDataSource, Services, SpreadsheetListModel};
use sheetsync_model::{
    CellValue, Context, Domain, FieldSchema, ModelName, Operator, Record, RecordId, SessionConfig,
    SpreadsheetEvent,
};
use sheetsync_orm::{GroupRow, InMemoryOrm, OrmError, OrmMethod, OrmService, ReadOptions};
use sheetsync_test_utils::{partner_list, partner_model, partner_orm, PARTNER};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn services() -> Services {
    Services::new(partner_orm(), SessionConfig::default())
}

#[tokio::test]
async fn test_window_grows_on_out_of_range_read() {
    let orm = partner_orm();
    let services = Services::new(orm.clone(), SessionConfig::default());
    let ds = ListDataSource::new("1", partner_list(["name"]).with_limit(2), services.clone());

    let model = ds.get(GetOptions::default()).await.unwrap();
    assert_eq!(model.rows_count(), 2);

    let mut events = services.subscribe();
    assert_eq!(model.get_cell_value(3, "name").unwrap(), CellValue::Loading);
    assert_eq!(model.limit(), 4);

    assert_eq!(
        events.recv().await.unwrap(),
        SpreadsheetEvent::DataSourceUpdated { id: "1".to_string() }
    );
    assert_eq!(model.get_cell_value(3, "name").unwrap(), CellValue::text("Delta"));
    assert_eq!(model.rows_count(), 4);
    assert_eq!(orm.call_count(OrmMethod::SearchRead, &ModelName::new(PARTNER)), 2);
}

#[tokio::test]
async fn test_formatting_through_registry() {
    let sources = DataSources::new(services());
    sources.add_list("1", partner_list(["name", "owner_id", "priority"]).with_limit(5));
    sources.load("1", false).await.unwrap();
    let model = sources.list_model("1").unwrap();

    assert_eq!(model.get_cell_value(0, "owner_id").unwrap().to_string(), "De Bruyne");
    assert_eq!(model.get_cell_value(1, "owner_id").unwrap().to_string(), "");
    assert_eq!(model.get_cell_value(0, "priority").unwrap().to_string(), "Medium");
    assert_eq!(model.get_cell_value(3, "priority").unwrap().to_string(), "");
    assert_eq!(model.get_header_value("priority"), "Priority");
}

#[tokio::test]
async fn test_initial_limit_from_config() {
    let services = Services::new(partner_orm(), SessionConfig::default().with_initial_list_limit(3));
    let ds = ListDataSource::new("1", partner_list(["name"]), services);
    let model = ds.get(GetOptions::default()).await.unwrap();
    assert_eq!(model.limit(), 3);
    assert_eq!(model.rows_count(), 3);
}

/// Store whose second `search_read` answers late
#[derive(Debug)]
struct SlowSecondSearch {
    inner: Arc<InMemoryOrm>,
    searches: AtomicUsize,
}

#[async_trait]
impl OrmService for SlowSecondSearch {
    async fn describe_fields(&self, model: &ModelName) -> Result<FieldSchema, OrmError> {
        self.inner.describe_fields(model).await
    }

    async fn model_display_name(&self, model: &ModelName) -> Result<Option<String>, OrmError> {
        self.inner.model_display_name(model).await
    }

    async fn resolve_display_names(
        &self,
        model: &ModelName,
        ids: &[RecordId],
    ) -> Result<Vec<(RecordId, String)>, OrmError> {
        self.inner.resolve_display_names(model, ids).await
    }

    async fn search_read(
        &self,
        model: &ModelName,
        domain: &Domain,
        fields: &[String],
        options: &ReadOptions,
        context: &Context,
    ) -> Result<Vec<Record>, OrmError> {
        let result = self.inner.search_read(model, domain, fields, options, context).await;
        if self.searches.fetch_add(1, Ordering::SeqCst) == 1 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        result
    }

    async fn read_group(
        &self,
        model: &ModelName,
        domain: &Domain,
        group_by: &[String],
        measures: &[String],
        context: &Context,
    ) -> Result<Vec<GroupRow>, OrmError> {
        self.inner.read_group(model, domain, group_by, measures, context).await
    }
}

#[tokio::test]
async fn test_late_reload_does_not_override_forced_fetch() {
    let orm = Arc::new(SlowSecondSearch {
        inner: partner_orm(),
        searches: AtomicUsize::new(0),
    });
    let services = Services::new(orm, SessionConfig::default());
    let ds = ListDataSource::new("1", partner_list(["name"]).with_limit(2), services);
    let model = ds.get(GetOptions::default()).await.unwrap();

    // starts a reload over the unfiltered domain, answered late
    assert_eq!(model.get_cell_value(2, "name").unwrap(), CellValue::Loading);
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    ds.add_domain(Domain::leaf("name", Operator::Eq, "Echo"));
    let model = ds.get(GetOptions::force()).await.unwrap();
    assert_eq!(model.get_cell_value(0, "name").unwrap(), CellValue::text("Echo"));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!model.is_reload_scheduled());
    assert_eq!(model.rows_count(), 1);
    assert_eq!(model.get_cell_value(0, "name").unwrap(), CellValue::text("Echo"));
}

fn detached_list() -> SpreadsheetListModel {
    SpreadsheetListModel::new(
        "1",
        ModelName::new(PARTNER),
        Arc::new(partner_model().fields),
        "Partner".to_string(),
        ["name".to_string()],
        0,
        services(),
    )
}

fn leaf() -> impl Strategy<Value = Domain> {
    (
        prop_oneof![Just("name"), Just("amount"), Just("active")],
        prop_oneof![Just(Operator::Eq), Just(Operator::Ne), Just(Operator::Gt)],
        0..100i64,
    )
        .prop_map(|(field, operator, value)| Domain::leaf(field, operator, value))
}

proptest! {
    #[test]
    fn prop_limit_never_decreases(positions in proptest::collection::vec(0..200usize, 1..40)) {
        let model = detached_list();
        let mut previous = model.limit();
        for position in positions {
            let _ = model.get_cell_value(position, "name").unwrap();
            let limit = model.limit();
            prop_assert!(limit >= previous);
            prop_assert!(limit > position);
            previous = limit;
        }
    }

    #[test]
    fn prop_add_domain_replaces(base in leaf(), added in proptest::collection::vec(leaf(), 1..6)) {
        let ds = ListDataSource::new("1", partner_list(["name"]).with_domain(base.clone()), services());
        for domain in &added {
            ds.add_domain(domain.clone());
        }
        let last = added.last().unwrap();
        prop_assert_eq!(ds.computed_domain(), Domain::and([&base, last]));
    }
}
