//! Subcommand implementations

use crate::sheet::settle;
use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use sheetsync_datasource::{DataSources, Services};
use sheetsync_model::{Domain, ListDefinition, OrderBy, PivotDefinition, SessionConfig};
use sheetsync_ot::{build_list_insert, build_pivot_insert, CellPosition, CollaborativeSession, Command, PivotTableLayout};
use sheetsync_orm::{Fixture, InMemoryOrm};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Id the inserted data source is registered under
const INSERT_ID: u32 = 1;

const SHEET_ID: &str = "sheet1";

/// Arguments of `sheetsync list`
#[derive(Debug, Clone)]
pub(crate) struct ListArgs {
    pub(crate) fixture: PathBuf,
    pub(crate) model: String,
    pub(crate) columns: Vec<String>,
    pub(crate) rows: Option<u32>,
    pub(crate) domain: Option<String>,
    pub(crate) order_by: Option<String>,
}

/// Arguments of `sheetsync pivot`
#[derive(Debug, Clone)]
pub(crate) struct PivotArgs {
    pub(crate) fixture: PathBuf,
    pub(crate) model: String,
    pub(crate) measures: Vec<String>,
    pub(crate) rows: Option<String>,
    pub(crate) cols: Option<String>,
    pub(crate) domain: Option<String>,
}

/// Load the session configuration, defaults without a file
pub(crate) fn load_config(path: Option<&Path>) -> Result<SessionConfig> {
    match path {
        Some(path) => SessionConfig::load(path).with_context(|| format!("loading config {}", path.display())),
        None => Ok(SessionConfig::default()),
    }
}

fn load_sources(fixture: &Path, config: SessionConfig) -> Result<DataSources> {
    let text = std::fs::read_to_string(fixture).with_context(|| format!("reading fixture {}", fixture.display()))?;
    let fixture = Fixture::from_json_str(&text).with_context(|| format!("parsing fixture {}", fixture.display()))?;
    let orm = Arc::new(InMemoryOrm::new(fixture));
    Ok(DataSources::new(Services::new(orm, config)))
}

fn parse_domain(text: Option<&str>) -> Result<Domain> {
    let Some(text) = text else {
        return Ok(Domain::default());
    };
    let value: Value = serde_json::from_str(text).context("domain is not JSON")?;
    Domain::try_from(value).context("invalid domain")
}

/// Insert a list and print its evaluated cells
pub(crate) async fn run_list(args: ListArgs, config: SessionConfig) -> Result<String> {
    let lines = args.rows.unwrap_or(config.list_insert_lines);
    let loading_text = config.loading_text.clone();
    let sources = load_sources(&args.fixture, config)?;

    let order_by = args
        .order_by
        .as_deref()
        .map(|field| match field.strip_prefix('-') {
            Some(field) => OrderBy::desc(field),
            None => OrderBy::asc(field),
        })
        .into_iter()
        .collect();
    let definition = ListDefinition::new(args.model.as_str(), args.columns)
        .with_domain(parse_domain(args.domain.as_deref())?)
        .with_order_by(order_by);

    let id = INSERT_ID.to_string();
    sources.add_list(id.as_str(), definition.clone());
    sources.load(&id, false).await.context("loading list")?;

    let Command::InsertOdooList { cells, .. } =
        build_list_insert(INSERT_ID, SHEET_ID, CellPosition::default(), definition, lines)
    else {
        bail!("list insert builder returned another command");
    };
    let grid = settle(&cells, &sources, &loading_text).await?;
    Ok(grid.render())
}

/// Insert a pivot and print its evaluated cells
pub(crate) async fn run_pivot(args: PivotArgs, config: SessionConfig) -> Result<String> {
    let loading_text = config.loading_text.clone();
    let sources = load_sources(&args.fixture, config)?;

    let definition = PivotDefinition::new(args.model.as_str(), args.measures)
        .with_rows(args.rows.iter().cloned())
        .with_cols(args.cols.iter().cloned())
        .with_domain(parse_domain(args.domain.as_deref())?);

    let id = INSERT_ID.to_string();
    sources.add_pivot(id.as_str(), definition.clone());
    sources.load(&id, false).await.context("loading pivot")?;
    let model = sources.pivot_model(&id)?;

    let row_values = args.rows.as_deref().map(|field| model.group_values(field)).unwrap_or_default();
    let col_values = args.cols.as_deref().map(|field| model.group_values(field)).unwrap_or_default();
    let layout = PivotTableLayout::single_level(args.rows.as_deref(), &row_values, args.cols.as_deref(), &col_values);

    let Command::InsertPivot { cells, .. } =
        build_pivot_insert(INSERT_ID, SHEET_ID, CellPosition::default(), definition, &layout)
    else {
        bail!("pivot insert builder returned another command");
    };
    let grid = settle(&cells, &sources, &loading_text).await?;
    Ok(grid.render())
}

/// Read a command argument: a path to a JSON file, or JSON itself
fn read_commands(arg: &str) -> Result<Vec<Command>> {
    let path = Path::new(arg);
    let text = if path.is_file() {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    } else {
        arg.to_string()
    };
    Command::many_from_json_str(&text).context("parsing commands")
}

/// Transform pending commands against applied ones and print the result
pub(crate) fn run_transform(pending: &str, applied: &str) -> Result<String> {
    let pending = read_commands(pending)?;
    let applied = read_commands(applied)?;

    let mut session = CollaborativeSession::default();
    for command in pending {
        session.dispatch_local(command).context("invalid pending command")?;
    }
    let mut dropped = Vec::new();
    for command in &applied {
        dropped.extend(session.receive_remote(command));
    }

    let inverses: Vec<Vec<Command>> = session
        .pending()
        .iter()
        .map(|command| session.inverses().inverses(command))
        .collect();
    let report = json!({
        "pending": session.pending(),
        "dropped": dropped,
        "inverses": inverses,
    });
    Ok(serde_json::to_string_pretty(&report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetsync_test_utils::partner_fixture;
    use std::io::Write;

    fn fixture_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::to_string(&partner_fixture()).unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn list_prints_requested_rows() {
        let file = fixture_file();
        let args = ListArgs {
            fixture: file.path().to_path_buf(),
            model: "partner".to_string(),
            columns: vec!["name".to_string(), "priority".to_string()],
            rows: Some(2),
            domain: Some(r#"[["amount", ">", 4]]"#.to_string()),
            order_by: Some("-amount".to_string()),
        };
        let output = run_list(args, SessionConfig::default()).await.unwrap();
        assert_eq!(output, "Name  | Priority\nDelta |\nAlpha | Medium\n");
    }

    #[tokio::test]
    async fn pivot_prints_totals() {
        let file = fixture_file();
        let args = PivotArgs {
            fixture: file.path().to_path_buf(),
            model: "partner".to_string(),
            measures: vec!["amount".to_string()],
            rows: Some("owner_id".to_string()),
            cols: None,
            domain: None,
        };
        let output = run_pivot(args, SessionConfig::default()).await.unwrap();
        assert!(output.contains("De Bruyne | 30"));
        assert!(output.contains("None      | 5"));
        assert!(output.contains("Total     | 39"));
    }

    #[test]
    fn transform_reports_dropped_edit() {
        let pending = r#"{ "type": "EDIT_GLOBAL_FILTER", "id": "f1", "filter": { "id": "f1" } }"#;
        let applied = r#"{ "type": "REMOVE_GLOBAL_FILTER", "id": "f1" }"#;
        let report: Value = serde_json::from_str(&run_transform(pending, applied).unwrap()).unwrap();
        assert_eq!(report["pending"], json!([]));
        assert_eq!(report["dropped"][0]["type"], "EDIT_GLOBAL_FILTER");
    }

    #[test]
    fn bad_domain_is_reported() {
        assert!(parse_domain(Some("[[1, 2]]")).is_err());
        assert!(parse_domain(Some("nope")).is_err());
        assert!(parse_domain(None).unwrap().is_empty());
    }
}
