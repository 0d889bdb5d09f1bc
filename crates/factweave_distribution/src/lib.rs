//! factweave distribution rules
//!
//! Derives the walk of a specification and decides, statically, whether a
//! registered set of distribution rules allows that walk to be served to a
//! viewer. No fact store is consulted; only the shapes of the traversals are
//! compared.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod error;
pub mod rules;
pub mod walk;

pub use engine::{
    assess_walk, summarize_assessments, DistributionAssessment, DistributionEngine, UserVerifier,
};
pub use error::{DistributionError, DistributionResult, WalkError, WalkResult};
pub use rules::{DistributionRule, DistributionRules, UserConstraint};
pub use walk::{walk_from_specification, Direction, Walk, WalkCondition, WalkStep};
