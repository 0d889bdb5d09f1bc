//! factweave core types
//!
//! This crate contains pure types and logic with no I/O: references to
//! content-addressed facts, pagination bookmarks, and the schema catalog
//! that maps symbolic fact types and roles onto stable numeric ids.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod error;
pub mod reference;

// Re-exports
pub use catalog::{FactTypeId, RoleId, SchemaCatalog, TypeCatalog};
pub use error::{CoreError, CoreResult};
pub use reference::{FactBookmark, FactReference};
