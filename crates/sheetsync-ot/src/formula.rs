//! Formulas inserted in cells by list and pivot insertions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Flat `(group-by field, value)` pairs of a pivot formula
pub type PivotArgList = Vec<(String, String)>;

/// Data formula of one inserted cell
///
/// Every variant references its data source by numeric id, so renumbering an
/// insertion rewrites the id of every formula it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "function", rename_all = "snake_case")]
pub enum DataFormula {
    /// `=ODOO.LIST(id, position, "field")`, `position` counted from 1
    List {
        /// List id
        id: u32,
        /// Row, counted from 1
        position: u32,
        /// Field name
        field: String,
    },
    /// `=ODOO.LIST.HEADER(id, "field")`
    ListHeader {
        /// List id
        id: u32,
        /// Field name
        field: String,
    },
    /// `=ODOO.PIVOT(id, "measure", "group-by", "value", ...)`
    Pivot {
        /// Pivot id
        id: u32,
        /// Aggregated field
        measure: String,
        /// Group-by and value pairs
        #[serde(default)]
        args: PivotArgList,
    },
    /// `=ODOO.PIVOT.HEADER(id, "group-by", "value", ...)`
    PivotHeader {
        /// Pivot id
        id: u32,
        /// Group-by and value pairs, the last one labelled
        #[serde(default)]
        args: PivotArgList,
    },
}

impl DataFormula {
    /// Referenced data source id
    #[must_use]
    pub fn id(&self) -> u32 {
        match self {
            Self::List { id, .. }
            | Self::ListHeader { id, .. }
            | Self::Pivot { id, .. }
            | Self::PivotHeader { id, .. } => *id,
        }
    }

    /// Point the formula to data source `new_id`
    pub fn set_id(&mut self, new_id: u32) {
        match self {
            Self::List { id, .. }
            | Self::ListHeader { id, .. }
            | Self::Pivot { id, .. }
            | Self::PivotHeader { id, .. } => *id = new_id,
        }
    }
}

impl fmt::Display for DataFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List { id, position, field } => {
                write!(f, "=ODOO.LIST({id},{position},{})", Quoted(field))
            }
            Self::ListHeader { id, field } => write!(f, "=ODOO.LIST.HEADER({id},{})", Quoted(field)),
            Self::Pivot { id, measure, args } => {
                write!(f, "=ODOO.PIVOT({id},{}", Quoted(measure))?;
                write_args(f, args)?;
                f.write_str(")")
            }
            Self::PivotHeader { id, args } => {
                write!(f, "=ODOO.PIVOT.HEADER({id}")?;
                write_args(f, args)?;
                f.write_str(")")
            }
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[(String, String)]) -> fmt::Result {
    for (field, value) in args {
        write!(f, ",{},{}", Quoted(field), Quoted(value))?;
    }
    Ok(())
}

/// String literal of a formula argument
struct Quoted<'a>(&'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0.replace('"', "\\\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(field: &str, value: &str) -> (String, String) {
        (field.to_string(), value.to_string())
    }

    #[test]
    fn renders_list_formulas() {
        let cell = DataFormula::List {
            id: 1,
            position: 2,
            field: "name".to_string(),
        };
        assert_eq!(cell.to_string(), r#"=ODOO.LIST(1,2,"name")"#);
        let header = DataFormula::ListHeader {
            id: 1,
            field: "owner_id".to_string(),
        };
        assert_eq!(header.to_string(), r#"=ODOO.LIST.HEADER(1,"owner_id")"#);
    }

    #[test]
    fn renders_pivot_formulas() {
        let cell = DataFormula::Pivot {
            id: 3,
            measure: "amount".to_string(),
            args: vec![pair("owner_id", "7"), pair("priority", "2")],
        };
        assert_eq!(
            cell.to_string(),
            r#"=ODOO.PIVOT(3,"amount","owner_id","7","priority","2")"#
        );
        let total = DataFormula::PivotHeader { id: 3, args: vec![] };
        assert_eq!(total.to_string(), "=ODOO.PIVOT.HEADER(3)");
    }

    #[test]
    fn escapes_quotes() {
        let header = DataFormula::ListHeader {
            id: 1,
            field: "a\"b".to_string(),
        };
        assert_eq!(header.to_string(), r#"=ODOO.LIST.HEADER(1,"a\"b")"#);
    }

    #[test]
    fn set_id_rewrites_reference() {
        let mut cell = DataFormula::PivotHeader { id: 3, args: vec![] };
        cell.set_id(4);
        assert_eq!(cell.id(), 4);
    }
}
