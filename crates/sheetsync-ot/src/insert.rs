//! Builders of list and pivot insert commands

use crate::command::{CellPosition, Command, InsertedCell};
use crate::formula::{DataFormula, PivotArgList};
use sheetsync_model::{ListDefinition, PivotDefinition};

/// Header arguments of a pivot table: one entry per row and per column
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PivotTableLayout {
    /// Arguments of each row, outermost group-by first
    pub rows: Vec<PivotArgList>,
    /// Arguments of each column, outermost group-by first
    pub cols: Vec<PivotArgList>,
}

impl PivotTableLayout {
    /// Create layout
    #[must_use]
    pub fn new(rows: Vec<PivotArgList>, cols: Vec<PivotArgList>) -> Self {
        Self { rows, cols }
    }

    /// One-level layout over `row_values` of `row_field` and `col_values` of
    /// `col_field`, each followed by a total
    #[must_use]
    pub fn single_level(
        row_field: Option<&str>,
        row_values: &[String],
        col_field: Option<&str>,
        col_values: &[String],
    ) -> Self {
        Self {
            rows: level(row_field, row_values),
            cols: level(col_field, col_values),
        }
    }
}

fn level(field: Option<&str>, values: &[String]) -> Vec<PivotArgList> {
    let mut entries: Vec<PivotArgList> = match field {
        Some(field) => values
            .iter()
            .map(|value| vec![(field.to_string(), value.clone())])
            .collect(),
        None => Vec::new(),
    };
    entries.push(Vec::new());
    entries
}

/// Insert of list `id` at `anchor`: a header row then `lines` rows
#[must_use]
pub fn build_list_insert(
    id: u32,
    sheet_id: impl Into<String>,
    anchor: CellPosition,
    definition: ListDefinition,
    lines: u32,
) -> Command {
    let mut cells = Vec::new();
    for (col, field) in (0u32..).zip(&definition.columns) {
        cells.push(InsertedCell {
            position: anchor.offset(col, 0),
            formula: DataFormula::ListHeader {
                id,
                field: field.clone(),
            },
        });
        for line in 0..lines {
            cells.push(InsertedCell {
                position: anchor.offset(col, line + 1),
                formula: DataFormula::List {
                    id,
                    position: line + 1,
                    field: field.clone(),
                },
            });
        }
    }
    Command::InsertOdooList {
        id,
        sheet_id: sheet_id.into(),
        definition,
        cells,
    }
}

/// Insert of pivot `id` at `anchor`
///
/// Two header rows (column groups, then measures) above one row per layout
/// row; the first column holds the row headers.
#[must_use]
pub fn build_pivot_insert(
    id: u32,
    sheet_id: impl Into<String>,
    anchor: CellPosition,
    definition: PivotDefinition,
    layout: &PivotTableLayout,
) -> Command {
    let mut cells = Vec::new();
    let mut col = 1;
    for col_args in &layout.cols {
        for measure in &definition.measures {
            cells.push(InsertedCell {
                position: anchor.offset(col, 0),
                formula: DataFormula::PivotHeader {
                    id,
                    args: col_args.clone(),
                },
            });
            let mut measure_args = col_args.clone();
            measure_args.push(("measure".to_string(), measure.clone()));
            cells.push(InsertedCell {
                position: anchor.offset(col, 1),
                formula: DataFormula::PivotHeader { id, args: measure_args },
            });

            for (row, row_args) in (2u32..).zip(&layout.rows) {
                let mut args = row_args.clone();
                args.extend(col_args.iter().cloned());
                cells.push(InsertedCell {
                    position: anchor.offset(col, row),
                    formula: DataFormula::Pivot {
                        id,
                        measure: measure.clone(),
                        args,
                    },
                });
            }
            col += 1;
        }
    }
    for (row, row_args) in (2u32..).zip(&layout.rows) {
        cells.push(InsertedCell {
            position: anchor.offset(0, row),
            formula: DataFormula::PivotHeader {
                id,
                args: row_args.clone(),
            },
        });
    }
    Command::InsertPivot {
        id,
        sheet_id: sheet_id.into(),
        definition,
        cells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn list_insert_has_header_and_lines() {
        let command = build_list_insert(
            1,
            "s1",
            CellPosition::new(2, 3),
            ListDefinition::new("partner", ["name", "owner_id"]),
            2,
        );
        let Command::InsertOdooList { cells, .. } = &command else {
            panic!("expected a list insert");
        };
        assert_eq!(cells.len(), 6);
        assert_eq!(cells[0].position, CellPosition::new(2, 3));
        assert_eq!(cells[0].formula.to_string(), r#"=ODOO.LIST.HEADER(1,"name")"#);
        assert_eq!(cells[2].position, CellPosition::new(2, 5));
        assert_eq!(cells[2].formula.to_string(), r#"=ODOO.LIST(1,2,"name")"#);
        assert!(command.validate().is_ok());
    }

    #[test]
    fn pivot_insert_covers_every_cell() {
        let layout = PivotTableLayout::single_level(
            Some("owner_id"),
            &["3".to_string(), "7".to_string()],
            None,
            &[],
        );
        assert_eq!(layout.rows.len(), 3);
        assert_eq!(layout.cols, vec![Vec::new()]);

        let command = build_pivot_insert(
            4,
            "s1",
            CellPosition::default(),
            PivotDefinition::new("partner", ["amount"]).with_rows(["owner_id"]),
            &layout,
        );
        let Command::InsertPivot { cells, .. } = &command else {
            panic!("expected a pivot insert");
        };
        // 2 header cells, 3 values, 3 row headers
        assert_eq!(cells.len(), 8);
        assert!(cells
            .iter()
            .any(|cell| cell.formula.to_string() == r#"=ODOO.PIVOT(4,"amount","owner_id","7")"#));
        assert!(cells
            .iter()
            .any(|cell| cell.formula.to_string() == r#"=ODOO.PIVOT.HEADER(4,"measure","amount")"#));
        assert!(command.validate().is_ok());
    }
}
