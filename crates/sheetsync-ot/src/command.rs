//! Collaborative commands
//!
//! Commands are a closed union tagged on `type`, so rules match on variants
//! instead of probing untyped payloads. JSON form:
//!
//! ```json
//! { "type": "REMOVE_GLOBAL_FILTER", "id": "f1" }
//! ```

use crate::error::OtError;
use crate::formula::DataFormula;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sheetsync_model::{ListDefinition, PivotDefinition};
use std::fmt;

/// Kind of a global filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Free text
    #[default]
    Text,
    /// Date range
    Date,
    /// Related records
    Relation,
}

/// Filter applied to every data source of a spreadsheet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalFilter {
    /// Filter id
    pub id: String,
    /// Label shown in the filter panel
    #[serde(default)]
    pub label: String,
    /// Filter kind
    #[serde(rename = "type", default)]
    pub kind: FilterKind,
    /// Value applied until the user picks one
    #[serde(default)]
    pub default_value: Value,
    /// Field each data source filters on, keyed by data source id
    #[serde(default)]
    pub field_matching: IndexMap<String, String>,
}

impl GlobalFilter {
    /// Create a filter
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: FilterKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            ..Self::default()
        }
    }

    /// Empty filter standing in for one whose content is unknown
    #[must_use]
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// With the field data source `data_source_id` filters on
    #[must_use]
    pub fn with_field(mut self, data_source_id: impl Into<String>, field: impl Into<String>) -> Self {
        self.field_matching.insert(data_source_id.into(), field.into());
        self
    }
}

/// Zero-based cell coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellPosition {
    /// Column index
    pub col: u32,
    /// Row index
    pub row: u32,
}

impl CellPosition {
    /// Create position
    #[inline]
    #[must_use]
    pub fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }

    /// Position shifted by `cols` and `rows`
    #[inline]
    #[must_use]
    pub fn offset(self, cols: u32, rows: u32) -> Self {
        Self {
            col: self.col.saturating_add(cols),
            row: self.row.saturating_add(rows),
        }
    }
}

/// One cell written by an insertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertedCell {
    /// Cell coordinates
    #[serde(flatten)]
    pub position: CellPosition,
    /// Formula written in the cell
    pub formula: DataFormula,
}

/// A collaborative command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Create a global filter
    AddGlobalFilter {
        /// The new filter
        filter: GlobalFilter,
    },
    /// Replace the content of global filter `id`
    EditGlobalFilter {
        /// Edited filter
        id: String,
        /// New content, carrying the same id
        filter: GlobalFilter,
    },
    /// Delete global filter `id`
    RemoveGlobalFilter {
        /// Removed filter
        id: String,
    },
    /// Insert list `id` and its formulas
    InsertOdooList {
        /// List id referenced by the formulas
        id: u32,
        /// Target sheet
        sheet_id: String,
        /// What the list fetches
        definition: ListDefinition,
        /// Header and row formulas
        cells: Vec<InsertedCell>,
    },
    /// Insert pivot `id` and its formulas
    InsertPivot {
        /// Pivot id referenced by the formulas
        id: u32,
        /// Target sheet
        sheet_id: String,
        /// What the pivot aggregates
        definition: PivotDefinition,
        /// Header and value formulas
        cells: Vec<InsertedCell>,
    },
}

/// Discriminant of a [`Command`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    /// [`Command::AddGlobalFilter`]
    AddGlobalFilter,
    /// [`Command::EditGlobalFilter`]
    EditGlobalFilter,
    /// [`Command::RemoveGlobalFilter`]
    RemoveGlobalFilter,
    /// [`Command::InsertOdooList`]
    InsertOdooList,
    /// [`Command::InsertPivot`]
    InsertPivot,
}

impl CommandKind {
    /// Every kind
    pub const ALL: [Self; 5] = [
        Self::AddGlobalFilter,
        Self::EditGlobalFilter,
        Self::RemoveGlobalFilter,
        Self::InsertOdooList,
        Self::InsertPivot,
    ];

    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AddGlobalFilter => "ADD_GLOBAL_FILTER",
            Self::EditGlobalFilter => "EDIT_GLOBAL_FILTER",
            Self::RemoveGlobalFilter => "REMOVE_GLOBAL_FILTER",
            Self::InsertOdooList => "INSERT_ODOO_LIST",
            Self::InsertPivot => "INSERT_PIVOT",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Command {
    /// Discriminant
    #[must_use]
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::AddGlobalFilter { .. } => CommandKind::AddGlobalFilter,
            Self::EditGlobalFilter { .. } => CommandKind::EditGlobalFilter,
            Self::RemoveGlobalFilter { .. } => CommandKind::RemoveGlobalFilter,
            Self::InsertOdooList { .. } => CommandKind::InsertOdooList,
            Self::InsertPivot { .. } => CommandKind::InsertPivot,
        }
    }

    /// Id of the data source an insert creates
    #[must_use]
    pub fn insert_id(&self) -> Option<u32> {
        match self {
            Self::InsertOdooList { id, .. } | Self::InsertPivot { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// Move an insert to data source `new_id`, rewriting every formula that
    /// referenced the old id; other commands are left untouched
    #[must_use]
    pub fn renumbered(mut self, new_id: u32) -> Self {
        if let Self::InsertOdooList { id, cells, .. } | Self::InsertPivot { id, cells, .. } = &mut self {
            let old_id = *id;
            *id = new_id;
            for cell in cells.iter_mut().filter(|cell| cell.formula.id() == old_id) {
                cell.formula.set_id(new_id);
            }
        }
        self
    }

    /// Check internal consistency
    ///
    /// # Errors
    /// Returns [`OtError::FilterIdMismatch`] for an edit addressed to another
    /// filter, [`OtError::ForeignFormula`] for an insert carrying a formula of
    /// another data source
    pub fn validate(&self) -> Result<(), OtError> {
        match self {
            Self::EditGlobalFilter { id, filter } if *id != filter.id => Err(OtError::FilterIdMismatch {
                id: id.clone(),
                filter_id: filter.id.clone(),
            }),
            Self::InsertOdooList { id, cells, .. } | Self::InsertPivot { id, cells, .. } => {
                match cells.iter().find(|cell| cell.formula.id() != *id) {
                    Some(cell) => Err(OtError::ForeignFormula {
                        id: *id,
                        referenced: cell.formula.id(),
                    }),
                    None => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }

    /// Parse one command
    ///
    /// # Errors
    /// Returns [`OtError::Malformed`] if `text` is not a command
    pub fn from_json_str(text: &str) -> Result<Self, OtError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse one command or an array of commands
    ///
    /// # Errors
    /// Returns [`OtError::Malformed`] if `text` is neither
    pub fn many_from_json_str(text: &str) -> Result<Vec<Self>, OtError> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            Many(Vec<Command>),
            One(Box<Command>),
        }
        Ok(match serde_json::from_str(text)? {
            OneOrMany::Many(commands) => commands,
            OneOrMany::One(command) => vec![*command],
        })
    }
}
