//! Pivot data sources

mod model;
mod source;

pub use model::{PivotArgs, SpreadsheetPivotModel, COUNT_MEASURE};
pub use source::{PivotDataSource, PivotKind, PivotMetadata};
