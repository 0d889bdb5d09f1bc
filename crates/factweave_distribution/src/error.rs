//! Distribution errors.
//!
//! These are malformed specifications or rules. A denied request is not an
//! error; it is an ordinary [`crate::DistributionAssessment`].

use thiserror::Error;

/// Result type for walk derivation
pub type WalkResult<T> = Result<T, WalkError>;

/// Result type for rule registration and assessment
pub type DistributionResult<T> = Result<T, DistributionError>;

/// A specification that has no walk
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalkError {
    /// Walks start from exactly one given
    #[error("Specification must have exactly one given, found {count}")]
    GivenCount {
        /// Number of givens
        count: usize,
    },

    /// A match without exactly one path condition
    #[error("Match {label} must have exactly one path condition, found {count}")]
    PathConditionCount {
        /// Unknown introduced by the match
        label: String,
        /// Number of path conditions present
        count: usize,
    },

    /// A path condition refers to a label not in scope
    #[error("Label {name} is not defined")]
    UnknownLabel {
        /// Label name
        name: String,
    },

    /// An existential condition that does not continue from its unknown
    #[error("Could not find walk for label {label}")]
    DetachedCondition {
        /// Unknown the condition is attached to
        label: String,
    },

    /// An existential condition whose own continuation has conditions
    #[error("Existential conditions on {label} cannot themselves have conditions")]
    NestedCondition {
        /// Unknown the condition is attached to
        label: String,
    },

    /// Two continuations of one label start from different types
    #[error("Cannot merge walks of different types: {left} and {right}")]
    TypeConflict {
        /// Type of the first walk
        left: String,
        /// Type of the second walk
        right: String,
    },
}

/// Failure to register or evaluate distribution rules
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistributionError {
    /// The specification has no walk
    #[error(transparent)]
    Walk(#[from] WalkError),

    /// The user specification of a rule starts from a different type
    #[error("User specification starts from {user}, but the rule starts from {rule}")]
    UserGivenMismatch {
        /// Given type of the rule
        rule: String,
        /// Given type of the user specification
        user: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_error_converts() {
        let err: DistributionError = WalkError::GivenCount { count: 2 }.into();
        assert_eq!(
            err.to_string(),
            "Specification must have exactly one given, found 2"
        );
    }
}
