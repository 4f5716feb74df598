//! Sheetsync OT
//!
//! Operational transform and undo rules for the commands collaborators
//! exchange while editing a spreadsheet with list and pivot insertions.
//!
//! # Core Concepts
//!
//! - [`Command`]: closed union of collaborative commands
//! - [`OtRegistry`]: `(applied, pending)` kind pair to transformation rule
//! - [`InverseCommandRegistry`]: kind to undo rule
//! - [`CollaborativeSession`]: pending queue and undo stack of one client
//!
//! # Example
//!
//! ```rust
//! use sheetsync_ot::{CollaborativeSession, Command, FilterKind, GlobalFilter};
//!
//! let mut session = CollaborativeSession::default();
//! let filter = GlobalFilter::new("f1", "Owner", FilterKind::Relation);
//! session
//!     .dispatch_local(Command::EditGlobalFilter { id: "f1".into(), filter })
//!     .unwrap();
//!
//! let dropped = session.receive_remote(&Command::RemoveGlobalFilter { id: "f1".into() });
//! assert_eq!(dropped.len(), 1);
//! assert!(session.pending().is_empty());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod command;
pub mod error;
pub mod formula;
pub mod insert;
pub mod registry;
pub mod rules;
pub mod session;

pub use command::{CellPosition, Command, CommandKind, FilterKind, GlobalFilter, InsertedCell};
pub use error::OtError;
pub use formula::{DataFormula, PivotArgList};
pub use insert::{build_list_insert, build_pivot_insert, PivotTableLayout};
pub use registry::{InverseCommandRegistry, InverseFn, OtRegistry, TransformFn};
pub use rules::{default_registries, register_inverses, register_transformations};
pub use session::CollaborativeSession;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
