//! Sheetsync ORM boundary
//!
//! The data-source layer never talks to the network itself. It consumes an
//! [`OrmService`]: describe fields, resolve display names, search and read,
//! read groups.
//!
//! [`InMemoryOrm`] implements the boundary over JSON fixtures. It records
//! every call and can be told to fail, which is what tests and the CLI use.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod memory;
mod service;

pub use error::OrmError;
pub use memory::{Fixture, InMemoryOrm, ModelFixture, RecordedCall};
pub use service::{GroupRow, OrmMethod, OrmService, ReadOptions};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
