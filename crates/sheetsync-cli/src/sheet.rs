//! Evaluation of inserted formulas against registered data sources
//!
//! Mimics the host spreadsheet: evaluate every cell synchronously, then wait
//! for a notification and evaluate again until no cell shows a placeholder.

use anyhow::{bail, Result};
use sheetsync_datasource::{DataSourceError, DataSources};
use sheetsync_model::{CellValue, SpreadsheetEvent};
use sheetsync_ot::{DataFormula, InsertedCell};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};

/// Evaluation passes before giving up on placeholders
pub(crate) const MAX_PASSES: usize = 16;

const UPDATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Rendered cells, keyed by `(row, col)`
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Grid {
    cells: BTreeMap<(u32, u32), String>,
}

impl Grid {
    /// Set the text of a cell
    pub(crate) fn set(&mut self, row: u32, col: u32, text: String) {
        self.cells.insert((row, col), text);
    }

    /// Text of a cell
    #[must_use]
    pub(crate) fn get(&self, row: u32, col: u32) -> Option<&str> {
        self.cells.get(&(row, col)).map(String::as_str)
    }

    /// Aligned text table covering every set cell
    #[must_use]
    pub(crate) fn render(&self) -> String {
        let (Some(min_row), Some(max_row)) = (
            self.cells.keys().map(|(row, _)| *row).min(),
            self.cells.keys().map(|(row, _)| *row).max(),
        ) else {
            return String::new();
        };
        let min_col = self.cells.keys().map(|(_, col)| *col).min().unwrap_or(0);
        let max_col = self.cells.keys().map(|(_, col)| *col).max().unwrap_or(0);

        let widths: Vec<usize> = (min_col..=max_col)
            .map(|col| {
                (min_row..=max_row)
                    .filter_map(|row| self.get(row, col))
                    .map(|text| text.chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        for row in min_row..=max_row {
            let line: Vec<String> = (min_col..=max_col)
                .zip(&widths)
                .map(|(col, width)| format!("{:<width$}", self.get(row, col).unwrap_or("")))
                .collect();
            let _ = writeln!(out, "{}", line.join(" | ").trim_end());
        }
        out
    }
}

/// Value of one data formula
///
/// # Errors
/// Returns the lookup error, which the host shows as a cell error
pub(crate) fn evaluate(formula: &DataFormula, sources: &DataSources) -> Result<CellValue, DataSourceError> {
    let id = formula.id().to_string();
    match formula {
        DataFormula::List { position, field, .. } => {
            let index = usize::try_from(position.saturating_sub(1)).unwrap_or(usize::MAX);
            sources.list_model(&id)?.get_cell_value(index, field)
        }
        DataFormula::ListHeader { field, .. } => Ok(CellValue::Text(sources.list_model(&id)?.get_header_value(field))),
        DataFormula::Pivot { measure, args, .. } => sources.pivot_model(&id)?.get_pivot_cell_value(measure, args),
        DataFormula::PivotHeader { args, .. } => sources.pivot_model(&id)?.get_pivot_header_value(args),
    }
}

/// One synchronous pass over `cells`; returns the grid and the number of
/// placeholders
fn evaluate_pass(cells: &[InsertedCell], sources: &DataSources, loading_text: &str) -> (Grid, usize) {
    let mut grid = Grid::default();
    let mut placeholders = 0;
    for cell in cells {
        let text = match evaluate(&cell.formula, sources) {
            Ok(value) => {
                if value.is_placeholder() {
                    placeholders += 1;
                }
                value.render(loading_text)
            }
            Err(err) => format!("#ERROR {err}"),
        };
        grid.set(cell.position.row, cell.position.col, text);
    }
    (grid, placeholders)
}

/// Evaluate `cells` until every value is available
///
/// # Errors
/// Fails if placeholders remain after [`MAX_PASSES`] passes or no update
/// arrives in time
pub(crate) async fn settle(cells: &[InsertedCell], sources: &DataSources, loading_text: &str) -> Result<Grid> {
    let services = sources.services();
    let mut events = services.subscribe();

    for pass in 1..=MAX_PASSES {
        let (grid, placeholders) = evaluate_pass(cells, sources, loading_text);
        let labels_queued = services.metadata.has_pending_labels();
        let labels_in_flight = !labels_queued && services.metadata.has_unsettled_labels();
        tracing::debug!(pass, placeholders, labels_queued, labels_in_flight, "evaluation pass");

        if placeholders == 0 && !labels_queued && !labels_in_flight {
            return Ok(grid);
        }
        if labels_queued {
            services.metadata.flush().await;
        }
        if placeholders > 0 || labels_in_flight {
            wait_for_update(&mut events).await?;
        }
    }
    bail!("cells still loading after {MAX_PASSES} evaluation passes")
}

async fn wait_for_update(events: &mut broadcast::Receiver<SpreadsheetEvent>) -> Result<()> {
    loop {
        match tokio::time::timeout(UPDATE_TIMEOUT, events.recv()).await {
            Ok(Ok(event)) => {
                tracing::debug!(?event, "re-evaluating");
                return Ok(());
            }
            Ok(Err(RecvError::Lagged(skipped))) => {
                tracing::debug!(skipped, "notifications skipped");
            }
            Ok(Err(RecvError::Closed)) => bail!("notification channel closed"),
            Err(_) => bail!("no data update within {}s", UPDATE_TIMEOUT.as_secs()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetsync_datasource::Services;
    use sheetsync_model::SessionConfig;
    use sheetsync_ot::{build_list_insert, CellPosition, Command};
    use sheetsync_test_utils::{partner_list, partner_orm};

    #[test]
    fn renders_aligned_table() {
        let mut grid = Grid::default();
        grid.set(0, 0, "Name".to_string());
        grid.set(0, 1, "Owner".to_string());
        grid.set(1, 0, "Alpha".to_string());
        assert_eq!(grid.render(), "Name  | Owner\nAlpha |\n");
        assert_eq!(Grid::default().render(), "");
    }

    #[tokio::test]
    async fn settles_list_insert() {
        let sources = DataSources::new(Services::new(partner_orm(), SessionConfig::default()));
        let definition = partner_list(["name", "owner_id", "tag_ids"]);
        sources.add_list("1", definition.clone());
        sources.load("1", false).await.unwrap();

        let Command::InsertOdooList { cells, .. } =
            build_list_insert(1, "s1", CellPosition::default(), definition, 3)
        else {
            panic!("expected a list insert");
        };
        let grid = settle(&cells, &sources, "Loading...").await.unwrap();

        assert_eq!(grid.get(0, 0), Some("Name"));
        assert_eq!(grid.get(1, 0), Some("Alpha"));
        assert_eq!(grid.get(1, 1), Some("De Bruyne"));
        assert_eq!(grid.get(1, 2), Some("Blue, Red"));
        assert_eq!(grid.get(3, 0), Some("Charlie"));
    }

    #[tokio::test]
    async fn waits_for_labels_fetched_elsewhere() {
        let sources = DataSources::new(Services::new(partner_orm(), SessionConfig::default()));
        let definition = partner_list(["tag_ids"]).with_limit(1);
        sources.add_list("1", definition.clone());
        sources.load("1", false).await.unwrap();

        let model = sources.list_model("1").unwrap();
        assert_eq!(model.get_cell_value(0, "tag_ids").unwrap(), CellValue::Empty);
        tokio::task::yield_now().await;
        let metadata = &sources.services().metadata;
        assert!(!metadata.has_pending_labels());
        assert!(metadata.has_unsettled_labels());

        let Command::InsertOdooList { cells, .. } =
            build_list_insert(1, "s1", CellPosition::default(), definition, 1)
        else {
            panic!("expected a list insert");
        };
        let grid = settle(&cells, &sources, "Loading...").await.unwrap();
        assert_eq!(grid.get(1, 0), Some("Blue, Red"));
    }

    #[tokio::test]
    async fn unknown_source_is_cell_error() {
        let sources = DataSources::new(Services::new(partner_orm(), SessionConfig::default()));
        let formula = DataFormula::ListHeader {
            id: 9,
            field: "name".to_string(),
        };
        assert_eq!(
            evaluate(&formula, &sources).unwrap_err(),
            DataSourceError::UnknownDataSource("9".to_string())
        );
    }
}
