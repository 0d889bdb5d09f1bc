//! factweave specifications
//!
//! A specification describes a traversal of the fact graph: given starting
//! facts, the unknowns to match through predecessor and successor roles,
//! existential conditions on those unknowns, and what to project. This
//! crate holds the model, a parser and formatter for the descriptive text
//! syntax, well-formedness validation, and schema enumeration.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod display;
pub mod error;
pub mod model;
mod parser;
pub mod schema;
pub mod validate;

// Re-exports
pub use error::{SpecError, SpecResult};
pub use model::{
    Condition, ExistentialCondition, Label, Match, PathCondition, Projection, Role, Specification,
    SpecificationProjection,
};
pub use parser::parse_specification;
pub use schema::{infer_catalog, RoleDefinition};
pub use validate::validate;
