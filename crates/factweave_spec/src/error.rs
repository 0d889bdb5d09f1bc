//! Specification errors.

use thiserror::Error;

/// Result type for specification parsing and validation
pub type SpecResult<T> = Result<T, SpecError>;

/// Malformed specification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    /// Text could not be parsed
    #[error("Parse error at {line}:{column}: {message}")]
    Parse {
        /// 1-based line
        line: usize,
        /// 1-based column
        column: usize,
        /// What was expected
        message: String,
    },

    /// A match without exactly one path condition
    #[error("Match {label} must have exactly one path condition, found {count}")]
    PathConditionCount {
        /// Unknown introduced by the match
        label: String,
        /// Number of path conditions present
        count: usize,
    },

    /// Reference to a label that is not in scope
    #[error("Label {name} is not defined")]
    UnknownLabel {
        /// Label name
        name: String,
    },

    /// Label declared twice in the same scope
    #[error("Label {name} is already defined")]
    DuplicateLabel {
        /// Label name
        name: String,
    },

    /// The two sides of a path condition end on different fact types
    #[error("Path condition on {label} joins {left} to {right}")]
    PathTypeMismatch {
        /// Unknown introduced by the match
        label: String,
        /// Type reached by the left side
        left: String,
        /// Type reached by the right side
        right: String,
    },

    /// Neither side of a path condition names the unknown
    #[error("Path condition in match {label} does not refer to {label}")]
    DetachedPathCondition {
        /// Unknown introduced by the match
        label: String,
    },
}
