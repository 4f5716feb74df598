//! List data sources

mod model;
mod source;

pub use model::SpreadsheetListModel;
pub use source::{ListDataSource, ListKind, ListMetadata};
