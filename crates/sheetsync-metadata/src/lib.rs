//! Sheetsync Metadata
//!
//! Session-wide cache of model metadata for spreadsheet data sources.
//!
//! # Architecture
//!
//! ```text
//! evaluator ──get_record_label──▶ LabelCache ──miss──▶ pending ids ──next tick──▶ flush
//!     ▲                                                                          │
//!     └──────────────── LabelsFetched ◀── EventBus ◀── one batch per model ◀─────┘
//!
//! data source ──get_field_schema / get_model_label──▶ moka cache ──▶ OrmService
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let repo = MetadataRepository::new(orm, EventBus::default());
//! let schema = repo.get_field_schema(&"partner".into()).await?;
//! match repo.get_record_label(&"user".into(), RecordId(7))? {
//!     Some(label) => println!("{label}"),
//!     None => { /* wait for SpreadsheetEvent::LabelsFetched */ }
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
mod labels;
pub mod repository;

pub use error::MetadataError;
pub use labels::LabelEntry;
pub use repository::MetadataRepository;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
