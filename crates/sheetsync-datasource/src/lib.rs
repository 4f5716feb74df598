//! Sheetsync Data Sources
//!
//! Lazy, re-fetchable data behind spreadsheet list and pivot insertions.
//!
//! # Architecture
//!
//! ```text
//! DataSources ──id──▶ DataSource<K> ──get()──▶ metadata ──▶ data ──▶ K::Model
//!                          │                                            │
//!                     add_domain                          get_cell_value / get_pivot_*
//!                                                                       │
//!                                           miss ──▶ reload next tick ──▶ DataSourceUpdated
//! ```
//!
//! Models answer synchronously. A lookup outside what is fetched returns a
//! placeholder, schedules one reload on the current tokio runtime and the
//! host re-evaluates once [`SpreadsheetEvent::DataSourceUpdated`] arrives.
//!
//! [`SpreadsheetEvent::DataSourceUpdated`]: sheetsync_model::SpreadsheetEvent::DataSourceUpdated

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod list;
pub mod pivot;
pub mod registry;
pub mod services;
pub mod source;

pub use error::DataSourceError;
pub use list::{ListDataSource, ListKind, SpreadsheetListModel};
pub use pivot::{PivotArgs, PivotDataSource, PivotKind, SpreadsheetPivotModel, COUNT_MEASURE};
pub use registry::{AnyDataSource, DataSources};
pub use services::Services;
pub use source::{DataSource, DataSourceKind, GetOptions, LoadState};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
