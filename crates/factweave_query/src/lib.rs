//! factweave query compiler
//!
//! Turns a specification and its start facts into query descriptions,
//! immutable join plans over the fact/edge tables, and renders each one as
//! a paginated SQL statement with positional parameters.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod description;
pub mod error;
pub mod sql;

pub use builder::DescriptionBuilder;
pub use description::{
    EdgeDescription, FactDescription, InputDescription, NotExistsConditionDescription,
    OutputDescription, QueryDescription, SqlParameter,
};
pub use error::{QueryError, QueryResult};
pub use sql::{sql_from_specification, ResultSetLabel, SpecificationSqlQuery};
