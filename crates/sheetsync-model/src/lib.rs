//! Sheetsync Model
//!
//! Value types shared by every layer of the spreadsheet data-source stack.
//!
//! # Core Concepts
//!
//! - [`FieldSchema`]: field definitions of a remote model
//! - [`Domain`]: prefix-notation record filter
//! - [`Record`]: one fetched row in the ORM's JSON shape
//! - [`CellValue`]: what a synchronous cell lookup hands to the evaluator
//! - [`ListDefinition`] / [`PivotDefinition`]: what a data source is built from
//! - [`EventBus`]: notifications the evaluation host subscribes to
//! - [`SessionConfig`]: per-session tunables

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cell;
pub mod config;
pub mod definition;
pub mod domain;
pub mod error;
pub mod event;
pub mod field;
pub mod ids;
pub mod record;

pub use cell::{CellValue, LOADING_TEXT};
pub use config::SessionConfig;
pub use definition::{Context, ListDefinition, OrderBy, PivotDefinition, SearchParams};
pub use domain::{Condition, Domain, DomainTerm, Operator};
pub use error::{ConfigError, DomainError};
pub use event::{EventBus, SpreadsheetEvent};
pub use field::{FieldDef, FieldSchema, FieldType};
pub use ids::{ModelName, RecordId};
pub use record::Record;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
